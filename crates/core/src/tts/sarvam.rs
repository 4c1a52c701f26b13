use crate::config::{ApiKey, LanguageCode, DEFAULT_SARVAM_BASE_URL};
use crate::markup::{to_plain_text, Prosody};
use crate::tts::http::{check_status, transport_error};
use crate::tts::{ProviderError, ProviderRequest, TtsProvider};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_MODEL: &str = "bulbul:v1";
const SAMPLE_RATE_HZ: u32 = 22050;
const LOG_TARGET: &str = "tts::sarvam";

/// Regional specialist for Indic languages. Takes plain text; prosody is sent
/// as numeric pitch/pace/loudness fields.
#[derive(Clone)]
pub struct SarvamProvider {
    client: Client,
    api_key: ApiKey,
    base_url: String,
    model: String,
}

impl SarvamProvider {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_SARVAM_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct SarvamRequest<'a> {
    inputs: Vec<String>,
    target_language_code: String,
    speaker: &'a str,
    pitch: f32,
    pace: f32,
    loudness: f32,
    speech_sample_rate: u32,
    enable_preprocessing: bool,
    model: &'a str,
}

#[derive(Deserialize)]
struct SarvamResponse {
    audios: Vec<String>,
}

impl TtsProvider for SarvamProvider {
    fn try_synthesize(&self, request: ProviderRequest) -> BoxFuture<'_, Result<Bytes, ProviderError>> {
        async move {
            let url = format!("{}/text-to-speech", self.base_url);
            let body = SarvamRequest {
                inputs: vec![to_plain_text(&request.markup)],
                target_language_code: regional_code(&request.language),
                speaker: &request.voice.0,
                pitch: map_pitch(&request.prosody),
                pace: map_pace(&request.prosody),
                loudness: map_loudness(&request.prosody),
                speech_sample_rate: SAMPLE_RATE_HZ,
                enable_preprocessing: true,
                model: &self.model,
            };

            let response = self
                .client
                .post(&url)
                .header("api-subscription-key", self.api_key.expose())
                .timeout(request.timeout)
                .json(&body)
                .send()
                .await
                .map_err(|e| transport_error(e, request.timeout))?;

            let response = check_status(response).await?;
            let parsed: SarvamResponse = response.json().await.map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(request.timeout)
                } else {
                    ProviderError::InvalidResponse(format!("failed to parse JSON: {e}"))
                }
            })?;

            let encoded = parsed
                .audios
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::InvalidResponse("no audio in response".into()))?;
            let audio = BASE64
                .decode(encoded.trim())
                .map_err(|e| ProviderError::InvalidResponse(format!("invalid base64 audio: {e}")))?;
            tracing::debug!(target: LOG_TARGET, speaker = %request.voice, bytes = audio.len(), "decoded audio");
            Ok(Bytes::from(audio))
        }
        .boxed()
    }
}

/// The API wants a regional tag; bare codes default to India.
fn regional_code(language: &LanguageCode) -> String {
    match language.region() {
        Some(region) => format!("{}-{region}", language.primary()),
        None => format!("{}-IN", language.primary()),
    }
}

fn map_pitch(prosody: &Prosody) -> f32 {
    (prosody.pitch_st / 8.0).clamp(-0.75, 0.75)
}

fn map_pace(prosody: &Prosody) -> f32 {
    prosody.rate.clamp(0.5, 2.0)
}

fn map_loudness(prosody: &Prosody) -> f32 {
    (1.0 + prosody.loudness.level() * 0.25).clamp(0.3, 3.0)
}
