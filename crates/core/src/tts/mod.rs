mod elevenlabs;
mod http;
mod piper;
mod sarvam;

use crate::config::LanguageCode;
use crate::markup::Prosody;
use bytes::Bytes;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub use elevenlabs::ElevenLabsProvider;
pub use http::classify_status;
pub use piper::PiperProvider;
pub use sarvam::SarvamProvider;

/// The synthesis backends this layer knows how to order and health-track.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Premium multilingual cloud voices.
    ElevenLabs,
    /// Regional specialist for Indic languages.
    Sarvam,
    /// Local offline fallback.
    Piper,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::ElevenLabs,
        ProviderKind::Sarvam,
        ProviderKind::Piper,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::ElevenLabs => "elevenlabs",
            ProviderKind::Sarvam => "sarvam",
            ProviderKind::Piper => "piper",
        }
    }

    /// Position in [`ProviderKind::ALL`].
    pub(crate) fn index(self) -> usize {
        match self {
            ProviderKind::ElevenLabs => 0,
            ProviderKind::Sarvam => 1,
            ProviderKind::Piper => 2,
        }
    }

    pub fn parse(name: &str) -> Option<ProviderKind> {
        let name = name.trim();
        ProviderKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VoiceId(pub String);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One synthesis attempt against one provider.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderRequest {
    pub markup: String,
    pub voice: VoiceId,
    pub language: LanguageCode,
    pub prosody: Prosody,
    pub timeout: Duration,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("authentication rejected (HTTP {status})")]
    Auth { status: u16 },
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("audio payload too small ({len} bytes)")]
    EmptyResponse { len: usize },
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Stable label for log filtering.
    pub fn category(&self) -> &'static str {
        match self {
            ProviderError::Transport(_) => "transport",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Auth { .. } => "auth",
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::EmptyResponse { .. } => "empty_response",
            ProviderError::Status { .. } => "upstream_status",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }
}

pub trait TtsProvider: Send + Sync {
    fn try_synthesize(&self, request: ProviderRequest) -> BoxFuture<'_, Result<Bytes, ProviderError>>;
}
