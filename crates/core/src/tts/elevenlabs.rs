use crate::config::{ApiKey, DEFAULT_ELEVENLABS_BASE_URL};
use crate::emotion::Loudness;
use crate::markup::{to_break_text, Prosody};
use crate::tts::http::{check_status, transport_error};
use crate::tts::{ProviderError, ProviderRequest, TtsProvider};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Serialize;

const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";
const OUTPUT_FORMAT: &str = "mp3_44100_128";
const LOG_TARGET: &str = "tts::elevenlabs";

#[derive(Clone)]
pub struct ElevenLabsProvider {
    client: Client,
    api_key: ApiKey,
    base_url: String,
    model_id: String,
}

impl ElevenLabsProvider {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

#[derive(Serialize)]
struct ElevenLabsRequest<'a> {
    text: String,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize, Debug, PartialEq)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
    speed: f32,
}

impl TtsProvider for ElevenLabsProvider {
    fn try_synthesize(&self, request: ProviderRequest) -> BoxFuture<'_, Result<Bytes, ProviderError>> {
        async move {
            let url = format!(
                "{}/text-to-speech/{}?output_format={OUTPUT_FORMAT}",
                self.base_url,
                urlencoding::encode(&request.voice.0)
            );

            // Only break tags survive; prosody travels in voice_settings.
            let body = ElevenLabsRequest {
                text: to_break_text(&request.markup),
                model_id: &self.model_id,
                voice_settings: voice_settings(&request.prosody),
            };
            tracing::debug!(target: LOG_TARGET, voice = %request.voice, chars = body.text.len(), "requesting speech");

            let response = self
                .client
                .post(&url)
                .header("xi-api-key", self.api_key.expose())
                .header("Accept", "audio/mpeg")
                .timeout(request.timeout)
                .json(&body)
                .send()
                .await
                .map_err(|e| transport_error(e, request.timeout))?;

            let response = check_status(response).await?;
            response
                .bytes()
                .await
                .map_err(|e| transport_error(e, request.timeout))
        }
        .boxed()
    }
}

// The API has no pitch control, so only rate and loudness are mapped.
fn voice_settings(prosody: &Prosody) -> VoiceSettings {
    VoiceSettings {
        stability: map_loudness_to_stability(prosody.loudness),
        similarity_boost: 0.75,
        style: map_loudness_to_style(prosody.loudness),
        use_speaker_boost: true,
        speed: map_rate_to_speed(prosody.rate),
    }
}

fn map_rate_to_speed(rate: f32) -> f32 {
    rate.clamp(0.7, 1.2)
}

// Louder delivery -> lower stability (more expressive).
fn map_loudness_to_stability(loudness: Loudness) -> f32 {
    (0.5 - loudness.level() * 0.1).clamp(0.0, 1.0)
}

fn map_loudness_to_style(loudness: Loudness) -> f32 {
    ((loudness.level() + 2.0) / 8.0).clamp(0.0, 1.0)
}
