//! Fallback orchestration across synthesis providers.
//!
//! One [`Orchestrator::synthesize`] call builds markup once, orders the
//! registered providers by priority (regional specialists first for their
//! languages), drops those that cannot serve the request or whose breaker is
//! open, and then walks the remaining candidates one at a time. Providers are
//! never raced against each other.

mod analytics;
mod request;

pub use analytics::{
    AnalyticsSink, ChannelAnalytics, NoopAnalytics, SynthesisEvent, TracingAnalytics,
};
pub use request::{SynthesisRequest, ValidationError, MAX_TEXT_CHARS};

use crate::cache::{AudioCache, CacheKey, MemoryAudioCache};
use crate::config::{CacheConfig, LanguageCode, ProviderTimeouts, SynthesisConfig};
use crate::health::HealthRegistry;
use crate::markup::{self, MarkupOutput, Prosody};
use crate::persona::{PersonaRegistry, VoicePersona};
use crate::tts::{
    ElevenLabsProvider, PiperProvider, ProviderError, ProviderKind, ProviderRequest,
    SarvamProvider, TtsProvider, VoiceId,
};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

const LOG_TARGET: &str = "tts::orchestrator";

/// Highest fidelity first, offline fallback last.
pub const DEFAULT_PRIORITY: [ProviderKind; 3] = [
    ProviderKind::ElevenLabs,
    ProviderKind::Sarvam,
    ProviderKind::Piper,
];

/// Primary language subtags for which a specialist is promoted ahead of the
/// generic leader.
pub const REGIONAL_PREFERENCES: &[(&str, ProviderKind)] = &[
    ("hi", ProviderKind::Sarvam),
    ("bn", ProviderKind::Sarvam),
    ("ta", ProviderKind::Sarvam),
    ("te", ProviderKind::Sarvam),
    ("kn", ProviderKind::Sarvam),
    ("ml", ProviderKind::Sarvam),
    ("mr", ProviderKind::Sarvam),
    ("gu", ProviderKind::Sarvam),
    ("pa", ProviderKind::Sarvam),
    ("od", ProviderKind::Sarvam),
];

/// Priority order for a language, before eligibility filtering. An explicit
/// `preferred` provider goes first, ahead of any regional specialist.
pub fn provider_order(language: &LanguageCode, preferred: Option<ProviderKind>) -> Vec<ProviderKind> {
    let mut order = DEFAULT_PRIORITY.to_vec();
    let specialist = REGIONAL_PREFERENCES
        .iter()
        .find(|(lang, _)| *lang == language.primary())
        .map(|(_, kind)| *kind);
    if let Some(kind) = specialist {
        promote(&mut order, kind);
    }
    if let Some(kind) = preferred {
        promote(&mut order, kind);
    }
    order
}

fn promote(order: &mut Vec<ProviderKind>, kind: ProviderKind) {
    if let Some(pos) = order.iter().position(|k| *k == kind) {
        let kind = order.remove(pos);
        order.insert(0, kind);
    }
}

/// Why a provider did not produce the audio for a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error("provider is not configured")]
    NotConfigured,
    #[error("no voice for this persona and language")]
    Unsupported,
    #[error("circuit open")]
    CircuitOpen,
    #[error(transparent)]
    Failed(#[from] ProviderError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SynthesisResult {
    Success {
        audio: Bytes,
        provider: ProviderKind,
        voice: VoiceId,
        markup: String,
        prosody: Prosody,
        from_cache: bool,
    },
    /// No candidate produced audio. The markup is still returned so a client
    /// can render it locally with the same prosody.
    Exhausted {
        markup: String,
        prosody: Prosody,
        failures: BTreeMap<ProviderKind, FailureReason>,
    },
}

impl SynthesisResult {
    pub fn markup(&self) -> &str {
        match self {
            SynthesisResult::Success { markup, .. } | SynthesisResult::Exhausted { markup, .. } => {
                markup
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SynthesisResult::Success { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub timeouts: ProviderTimeouts,
    pub cache: CacheConfig,
    /// Payloads shorter than this are treated as failed attempts.
    pub min_audio_bytes: usize,
}

impl From<&SynthesisConfig> for OrchestratorSettings {
    fn from(config: &SynthesisConfig) -> Self {
        Self {
            timeouts: config.timeouts,
            cache: config.cache,
            min_audio_bytes: config.min_audio_bytes,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&SynthesisConfig::default())
    }
}

pub struct OrchestratorBuilder {
    personas: Arc<PersonaRegistry>,
    providers: BTreeMap<ProviderKind, Arc<dyn TtsProvider>>,
    health: Option<Arc<HealthRegistry>>,
    cache: Option<Arc<dyn AudioCache>>,
    analytics: Arc<dyn AnalyticsSink>,
    settings: OrchestratorSettings,
}

impl OrchestratorBuilder {
    pub fn new(personas: Arc<PersonaRegistry>) -> Self {
        Self {
            personas,
            providers: BTreeMap::new(),
            health: None,
            cache: None,
            analytics: Arc::new(NoopAnalytics),
            settings: OrchestratorSettings::default(),
        }
    }

    /// Registers every provider whose credentials or binary are configured,
    /// and sizes the breaker and cache from `config`.
    pub fn from_config(config: &SynthesisConfig, personas: Arc<PersonaRegistry>) -> Self {
        let mut builder = Self::new(personas)
            .settings(OrchestratorSettings::from(config))
            .health(Arc::new(HealthRegistry::new(config.breaker)));

        if let Some(key) = &config.api_keys.elevenlabs {
            let provider =
                ElevenLabsProvider::new(key.clone()).with_base_url(&config.endpoints.elevenlabs);
            builder = builder.provider(ProviderKind::ElevenLabs, Arc::new(provider));
        }
        if let Some(key) = &config.api_keys.sarvam {
            let provider = SarvamProvider::new(key.clone()).with_base_url(&config.endpoints.sarvam);
            builder = builder.provider(ProviderKind::Sarvam, Arc::new(provider));
        }
        if let Some(piper) = &config.piper {
            let provider = PiperProvider::new(piper.binary.clone(), piper.model_dir.clone());
            builder = builder.provider(ProviderKind::Piper, Arc::new(provider));
        }
        builder
    }

    #[must_use]
    pub fn provider(mut self, kind: ProviderKind, provider: Arc<dyn TtsProvider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    #[must_use]
    pub fn health(mut self, health: Arc<HealthRegistry>) -> Self {
        self.health = Some(health);
        self
    }

    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn AudioCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Orchestrator {
        let settings = self.settings;
        Orchestrator {
            personas: self.personas,
            providers: self.providers,
            health: self.health.unwrap_or_default(),
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(MemoryAudioCache::new(settings.cache.max_entries))),
            analytics: self.analytics,
            settings,
        }
    }
}

/// Entry point of the synthesis layer. Cheap to clone; clones share health
/// state and cache.
#[derive(Clone)]
pub struct Orchestrator {
    personas: Arc<PersonaRegistry>,
    providers: BTreeMap<ProviderKind, Arc<dyn TtsProvider>>,
    health: Arc<HealthRegistry>,
    cache: Arc<dyn AudioCache>,
    analytics: Arc<dyn AnalyticsSink>,
    settings: OrchestratorSettings,
}

struct Candidate {
    kind: ProviderKind,
    provider: Arc<dyn TtsProvider>,
    voice: VoiceId,
}

impl Orchestrator {
    pub fn builder(personas: Arc<PersonaRegistry>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(personas)
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn providers(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.providers.keys().copied()
    }

    /// The markup and prosody `synthesize` would send for this request.
    pub fn markup_for(&self, request: &SynthesisRequest) -> MarkupOutput {
        let persona = self.personas.resolve(request.persona());
        markup::generate(request.text(), request.mood(), persona, request.language())
    }

    /// Tries each eligible provider in order and returns the first audio.
    ///
    /// Dropping the returned future stops further candidates from being tried.
    /// An attempt already in flight keeps running in the background and still
    /// records its outcome and fills the cache.
    pub async fn synthesize(&self, request: &SynthesisRequest) -> SynthesisResult {
        let started = Instant::now();
        let persona = self.personas.resolve(request.persona());
        let MarkupOutput { markup, prosody } =
            markup::generate(request.text(), request.mood(), persona, request.language());
        let ttl = self.settings.cache.ttl_for(request.content_class());

        let mut failures = BTreeMap::new();
        let candidates = self.candidates(request, persona, &mut failures);

        for Candidate {
            kind,
            provider,
            voice,
        } in candidates
        {
            let key = CacheKey::derive(&markup, kind, &voice);
            if let Some(audio) = self.cache.get(&key) {
                tracing::debug!(target: LOG_TARGET, provider = %kind, key = %key, "cache hit");
                self.emit(started, Some(kind), true, request);
                return SynthesisResult::Success {
                    audio,
                    provider: kind,
                    voice,
                    markup,
                    prosody,
                    from_cache: true,
                };
            }

            let provider_request = ProviderRequest {
                markup: markup.clone(),
                voice: voice.clone(),
                language: request.language().clone(),
                prosody,
                timeout: self.settings.timeouts.for_provider(kind),
            };
            match self.attempt(kind, provider, provider_request, key, ttl).await {
                Ok(audio) => {
                    self.emit(started, Some(kind), false, request);
                    return SynthesisResult::Success {
                        audio,
                        provider: kind,
                        voice,
                        markup,
                        prosody,
                        from_cache: false,
                    };
                }
                Err(err) => {
                    failures.insert(kind, FailureReason::Failed(err));
                }
            }
        }

        tracing::warn!(
            target: LOG_TARGET,
            language = %request.language(),
            tried = failures.values().filter(|r| matches!(r, FailureReason::Failed(_))).count(),
            "all providers exhausted"
        );
        self.emit(started, None, false, request);
        SynthesisResult::Exhausted {
            markup,
            prosody,
            failures,
        }
    }

    fn candidates(
        &self,
        request: &SynthesisRequest,
        persona: &VoicePersona,
        failures: &mut BTreeMap<ProviderKind, FailureReason>,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for kind in provider_order(request.language(), request.provider()) {
            let Some(provider) = self.providers.get(&kind) else {
                failures.insert(kind, FailureReason::NotConfigured);
                continue;
            };
            let Some(voice) = persona.resolve_voice(kind, request.language()) else {
                failures.insert(kind, FailureReason::Unsupported);
                continue;
            };
            if !self.health.is_healthy(kind) {
                tracing::debug!(target: LOG_TARGET, provider = %kind, "skipping provider with open circuit");
                failures.insert(kind, FailureReason::CircuitOpen);
                continue;
            }
            candidates.push(Candidate {
                kind,
                provider: Arc::clone(provider),
                voice: voice.clone(),
            });
        }
        candidates
    }

    /// Runs one provider call on its own task so that it outlives a cancelled
    /// caller. The task owns the health and cache updates for its outcome.
    async fn attempt(
        &self,
        kind: ProviderKind,
        provider: Arc<dyn TtsProvider>,
        request: ProviderRequest,
        key: CacheKey,
        ttl: Duration,
    ) -> Result<Bytes, ProviderError> {
        let health = Arc::clone(&self.health);
        let cache = Arc::clone(&self.cache);
        let min_audio_bytes = self.settings.min_audio_bytes;
        let timeout = request.timeout;

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let outcome = match tokio::time::timeout(timeout, provider.try_synthesize(request)).await {
                Ok(Ok(audio)) if audio.len() < min_audio_bytes => {
                    Err(ProviderError::EmptyResponse { len: audio.len() })
                }
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(timeout)),
            };

            match &outcome {
                Ok(audio) => {
                    health.record_success(kind);
                    cache.put(key, audio.clone(), ttl);
                    tracing::info!(
                        target: LOG_TARGET,
                        provider = %kind,
                        bytes = audio.len(),
                        latency_ms = started.elapsed().as_millis() as u64,
                        "synthesized"
                    );
                }
                Err(err) => {
                    log_failure(kind, err);
                    health.record_failure(kind);
                }
            }
            outcome
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.health.record_failure(kind);
                Err(ProviderError::Transport(format!("synthesis task failed: {e}")))
            }
        }
    }

    fn emit(
        &self,
        started: Instant,
        provider: Option<ProviderKind>,
        cache_hit: bool,
        request: &SynthesisRequest,
    ) {
        self.analytics.record(SynthesisEvent {
            provider,
            latency: started.elapsed(),
            cache_hit,
            characters: request.char_count(),
        });
    }
}

fn log_failure(kind: ProviderKind, err: &ProviderError) {
    let category = err.category();
    match err {
        ProviderError::Auth { .. } | ProviderError::RateLimited { .. } => {
            tracing::warn!(target: LOG_TARGET, provider = %kind, category, "provider attempt failed: {err}");
        }
        _ => {
            tracing::info!(target: LOG_TARGET, provider = %kind, category, "provider attempt failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ContentClass;
    use crate::config::BreakerConfig;
    use crate::emotion::Mood;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    enum Behavior {
        Audio(usize),
        Fail(ProviderError),
        Slow(Duration, usize),
    }

    struct MockProvider {
        calls: AtomicUsize,
        behavior: Behavior,
    }

    impl MockProvider {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                behavior,
            })
        }

        fn ok() -> Arc<Self> {
            Self::new(Behavior::Audio(512))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TtsProvider for MockProvider {
        fn try_synthesize(
            &self,
            _request: ProviderRequest,
        ) -> BoxFuture<'_, Result<Bytes, ProviderError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let behavior = self.behavior.clone();
            async move {
                match behavior {
                    Behavior::Audio(len) => Ok(Bytes::from(vec![7u8; len])),
                    Behavior::Fail(err) => Err(err),
                    Behavior::Slow(delay, len) => {
                        tokio::time::sleep(delay).await;
                        Ok(Bytes::from(vec![7u8; len]))
                    }
                }
            }
            .boxed()
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        health: Arc<HealthRegistry>,
        cache: Arc<MemoryAudioCache>,
        elevenlabs: Arc<MockProvider>,
        sarvam: Arc<MockProvider>,
        piper: Arc<MockProvider>,
    }

    fn harness(
        elevenlabs: Arc<MockProvider>,
        sarvam: Arc<MockProvider>,
        piper: Arc<MockProvider>,
    ) -> Harness {
        harness_with(elevenlabs, sarvam, piper, OrchestratorSettings::default())
    }

    fn harness_with(
        elevenlabs: Arc<MockProvider>,
        sarvam: Arc<MockProvider>,
        piper: Arc<MockProvider>,
        settings: OrchestratorSettings,
    ) -> Harness {
        let personas = Arc::new(PersonaRegistry::builtin().unwrap());
        let health = Arc::new(HealthRegistry::new(BreakerConfig::default()));
        let cache = Arc::new(MemoryAudioCache::new(64));
        let orchestrator = Orchestrator::builder(personas)
            .provider(ProviderKind::ElevenLabs, elevenlabs.clone())
            .provider(ProviderKind::Sarvam, sarvam.clone())
            .provider(ProviderKind::Piper, piper.clone())
            .health(health.clone())
            .cache(cache.clone())
            .settings(settings)
            .build();
        Harness {
            orchestrator,
            health,
            cache,
            elevenlabs,
            sarvam,
            piper,
        }
    }

    fn trip(health: &HealthRegistry, kind: ProviderKind) {
        for _ in 0..health.config().failure_threshold {
            health.record_failure(kind);
        }
        assert!(!health.is_healthy(kind));
    }

    fn request(text: &str, lang: &str) -> SynthesisRequest {
        SynthesisRequest::new(text, LanguageCode::new(lang).unwrap()).unwrap()
    }

    fn provider_of(result: &SynthesisResult) -> Option<ProviderKind> {
        match result {
            SynthesisResult::Success { provider, .. } => Some(*provider),
            SynthesisResult::Exhausted { .. } => None,
        }
    }

    #[test]
    fn order_promotes_regional_specialist_and_override() {
        use ProviderKind::*;
        let en = LanguageCode::new("en").unwrap();
        let hi = LanguageCode::new("hi-IN").unwrap();

        assert_eq!(provider_order(&en, None), vec![ElevenLabs, Sarvam, Piper]);
        assert_eq!(provider_order(&hi, None), vec![Sarvam, ElevenLabs, Piper]);
        assert_eq!(provider_order(&en, Some(Piper)), vec![Piper, ElevenLabs, Sarvam]);
        assert_eq!(provider_order(&hi, Some(Piper)), vec![Piper, Sarvam, ElevenLabs]);
    }

    #[tokio::test]
    async fn skips_unhealthy_providers_without_calling_them() {
        let h = harness(MockProvider::ok(), MockProvider::ok(), MockProvider::ok());
        trip(&h.health, ProviderKind::ElevenLabs);
        trip(&h.health, ProviderKind::Sarvam);

        let result = h.orchestrator.synthesize(&request("Hello there.", "en")).await;

        assert_eq!(provider_of(&result), Some(ProviderKind::Piper));
        assert_eq!(h.elevenlabs.calls(), 0);
        assert_eq!(h.sarvam.calls(), 0);
        assert_eq!(h.piper.calls(), 1);
        match result {
            SynthesisResult::Success { voice, from_cache, .. } => {
                assert_eq!(voice, VoiceId("en_US-lessac-medium".into()));
                assert!(!from_cache);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn falls_through_failures_in_order_and_records_them() {
        let h = harness(
            MockProvider::new(Behavior::Fail(ProviderError::Status {
                status: 500,
                body: "boom".into(),
            })),
            MockProvider::new(Behavior::Fail(ProviderError::Auth { status: 401 })),
            MockProvider::ok(),
        );

        let result = h.orchestrator.synthesize(&request("Hello there.", "en")).await;

        assert_eq!(provider_of(&result), Some(ProviderKind::Piper));
        assert_eq!((h.elevenlabs.calls(), h.sarvam.calls(), h.piper.calls()), (1, 1, 1));
        assert_eq!(h.health.snapshot(ProviderKind::ElevenLabs).consecutive_failures, 1);
        assert_eq!(h.health.snapshot(ProviderKind::Sarvam).consecutive_failures, 1);
        assert!(h.health.snapshot(ProviderKind::Piper).last_success.is_some());
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let h = harness(MockProvider::ok(), MockProvider::ok(), MockProvider::ok());
        let result = h.orchestrator.synthesize(&request("Hello there.", "en")).await;
        assert_eq!(provider_of(&result), Some(ProviderKind::ElevenLabs));
        assert_eq!((h.elevenlabs.calls(), h.sarvam.calls(), h.piper.calls()), (1, 0, 0));
    }

    #[tokio::test]
    async fn cache_hit_skips_providers_and_leaves_health_alone() {
        let h = harness(MockProvider::ok(), MockProvider::ok(), MockProvider::ok());
        let req = request("Grace and peace to you.", "en");
        let out = h.orchestrator.markup_for(&req);
        let voice = VoiceId("21m00Tcm4TlvDq8ikWAM".into());
        h.cache.put(
            CacheKey::derive(&out.markup, ProviderKind::ElevenLabs, &voice),
            Bytes::from_static(b"cached-audio"),
            Duration::from_secs(60),
        );
        h.health.record_failure(ProviderKind::ElevenLabs);
        let before = h.health.snapshot(ProviderKind::ElevenLabs);

        let result = h.orchestrator.synthesize(&req).await;

        match result {
            SynthesisResult::Success {
                audio,
                provider,
                from_cache,
                markup,
                ..
            } => {
                assert_eq!(audio, Bytes::from_static(b"cached-audio"));
                assert_eq!(provider, ProviderKind::ElevenLabs);
                assert!(from_cache);
                assert_eq!(markup, out.markup);
            }
            other => panic!("expected cache hit, got {other:?}"),
        }
        assert_eq!(h.elevenlabs.calls() + h.sarvam.calls() + h.piper.calls(), 0);
        assert_eq!(h.health.snapshot(ProviderKind::ElevenLabs), before);
    }

    #[tokio::test]
    async fn second_identical_request_is_served_from_cache() {
        let h = harness(MockProvider::ok(), MockProvider::ok(), MockProvider::ok());
        let req = request("Hello there.", "en");

        assert!(h.orchestrator.synthesize(&req).await.is_success());
        let second = h.orchestrator.synthesize(&req).await;

        assert!(matches!(second, SynthesisResult::Success { from_cache: true, .. }));
        assert_eq!(h.elevenlabs.calls(), 1);
    }

    #[tokio::test]
    async fn exhausted_when_every_provider_is_unhealthy() {
        let h = harness(MockProvider::ok(), MockProvider::ok(), MockProvider::ok());
        for kind in ProviderKind::ALL {
            trip(&h.health, kind);
        }

        let result = h.orchestrator.synthesize(&request("Hello there.", "en")).await;

        match &result {
            SynthesisResult::Exhausted { markup, failures, .. } => {
                assert!(markup.starts_with("<speak"));
                assert_eq!(failures.len(), 3);
                assert!(failures.values().all(|r| *r == FailureReason::CircuitOpen));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert!(!result.markup().is_empty());
        assert_eq!(h.elevenlabs.calls() + h.sarvam.calls() + h.piper.calls(), 0);
    }

    #[tokio::test]
    async fn exhausted_when_no_provider_supports_the_language() {
        let h = harness(MockProvider::ok(), MockProvider::ok(), MockProvider::ok());

        let result = h.orchestrator.synthesize(&request("Sawubona.", "zu")).await;

        match result {
            SynthesisResult::Exhausted { markup, failures, .. } => {
                assert!(markup.contains("xml:lang=\"zu\""));
                assert!(failures.values().all(|r| *r == FailureReason::Unsupported));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(h.elevenlabs.calls() + h.sarvam.calls() + h.piper.calls(), 0);
    }

    #[tokio::test]
    async fn exhausted_reports_the_last_error_per_provider() {
        let personas = Arc::new(PersonaRegistry::builtin().unwrap());
        let piper = MockProvider::new(Behavior::Fail(ProviderError::Transport("no such file".into())));
        let orchestrator = Orchestrator::builder(personas)
            .provider(ProviderKind::Piper, piper.clone())
            .build();

        let result = orchestrator.synthesize(&request("Hello there.", "en")).await;

        let SynthesisResult::Exhausted { failures, .. } = result else {
            panic!("expected exhaustion");
        };
        assert_eq!(failures[&ProviderKind::ElevenLabs], FailureReason::NotConfigured);
        assert_eq!(failures[&ProviderKind::Sarvam], FailureReason::NotConfigured);
        assert_eq!(
            failures[&ProviderKind::Piper],
            FailureReason::Failed(ProviderError::Transport("no such file".into()))
        );
        assert_eq!(piper.calls(), 1);
    }

    #[tokio::test]
    async fn regional_language_prefers_specialist() {
        let h = harness(MockProvider::ok(), MockProvider::ok(), MockProvider::ok());

        let result = h.orchestrator.synthesize(&request("नमस्ते, शांति।", "hi")).await;

        assert_eq!(provider_of(&result), Some(ProviderKind::Sarvam));
        assert_eq!(h.elevenlabs.calls(), 0);
    }

    #[tokio::test]
    async fn override_goes_first_but_others_still_back_it_up() {
        let h = harness(
            MockProvider::ok(),
            MockProvider::ok(),
            MockProvider::new(Behavior::Fail(ProviderError::Transport("down".into()))),
        );
        let req = request("Hello there.", "en").with_provider(ProviderKind::Piper);

        let result = h.orchestrator.synthesize(&req).await;

        assert_eq!(provider_of(&result), Some(ProviderKind::ElevenLabs));
        assert_eq!((h.piper.calls(), h.elevenlabs.calls(), h.sarvam.calls()), (1, 1, 0));
    }

    #[tokio::test]
    async fn undersized_payload_counts_as_failure() {
        let h = harness(
            MockProvider::new(Behavior::Audio(10)),
            MockProvider::ok(),
            MockProvider::ok(),
        );

        let result = h.orchestrator.synthesize(&request("Hello there.", "en")).await;

        assert_eq!(provider_of(&result), Some(ProviderKind::Sarvam));
        assert_eq!(h.health.snapshot(ProviderKind::ElevenLabs).consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out_and_falls_back() {
        let mut settings = OrchestratorSettings::default();
        settings.timeouts.elevenlabs = Duration::from_secs(1);
        let h = harness_with(
            MockProvider::new(Behavior::Slow(Duration::from_secs(60), 512)),
            MockProvider::ok(),
            MockProvider::ok(),
            settings,
        );
        h.health.record_failure(ProviderKind::ElevenLabs);
        h.health.record_failure(ProviderKind::ElevenLabs);

        let result = h.orchestrator.synthesize(&request("Hello there.", "en")).await;

        assert_eq!(provider_of(&result), Some(ProviderKind::Sarvam));
        assert!(!h.health.is_healthy(ProviderKind::ElevenLabs));
    }

    #[tokio::test]
    async fn repeated_failures_open_the_circuit_across_requests() {
        let h = harness(
            MockProvider::new(Behavior::Fail(ProviderError::RateLimited { retry_after: None })),
            MockProvider::ok(),
            MockProvider::ok(),
        );

        for i in 0..5 {
            let req = request(&format!("Message number {i}."), "en");
            assert_eq!(provider_of(&h.orchestrator.synthesize(&req).await), Some(ProviderKind::Sarvam));
        }

        assert_eq!(h.elevenlabs.calls(), 3);
        assert_eq!(h.sarvam.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_call_still_populates_the_cache() {
        let h = harness(
            MockProvider::new(Behavior::Slow(Duration::from_secs(5), 512)),
            MockProvider::ok(),
            MockProvider::ok(),
        );
        let req = request("Hello there.", "en");

        let cancelled =
            tokio::time::timeout(Duration::from_secs(1), h.orchestrator.synthesize(&req)).await;
        assert!(cancelled.is_err());
        assert!(h.cache.is_empty());

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(h.cache.len(), 1);
        assert_eq!(h.sarvam.calls(), 0);
        assert!(h.health.snapshot(ProviderKind::ElevenLabs).last_success.is_some());

        let result = h.orchestrator.synthesize(&req).await;
        assert!(matches!(result, SynthesisResult::Success { from_cache: true, .. }));
        assert_eq!(h.elevenlabs.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn content_class_selects_cache_ttl() {
        let h = harness(MockProvider::ok(), MockProvider::ok(), MockProvider::ok());
        let chat = request("Hello there.", "en");
        let verse = request("The Lord is my shepherd.", "en").with_content_class(ContentClass::Canonical);

        h.orchestrator.synthesize(&chat).await;
        h.orchestrator.synthesize(&verse).await;
        assert_eq!(h.elevenlabs.calls(), 2);

        tokio::time::advance(Duration::from_secs(2 * 60 * 60)).await;

        let chat_again = h.orchestrator.synthesize(&chat).await;
        let verse_again = h.orchestrator.synthesize(&verse).await;
        assert!(matches!(chat_again, SynthesisResult::Success { from_cache: false, .. }));
        assert!(matches!(verse_again, SynthesisResult::Success { from_cache: true, .. }));
        assert_eq!(h.elevenlabs.calls(), 3);
    }

    #[tokio::test]
    async fn analytics_receive_one_event_per_call() {
        let personas = Arc::new(PersonaRegistry::builtin().unwrap());
        let (sink, mut rx) = ChannelAnalytics::new(8);
        let orchestrator = Orchestrator::builder(personas)
            .provider(ProviderKind::ElevenLabs, MockProvider::ok())
            .analytics(Arc::new(sink))
            .build();
        let req = request("Hello there.", "en");

        orchestrator.synthesize(&req).await;
        orchestrator.synthesize(&req).await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.provider, Some(ProviderKind::ElevenLabs));
        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(second.characters, "Hello there.".len());
    }

    #[tokio::test]
    async fn unknown_persona_and_mood_degrade_to_defaults() {
        let h = harness(MockProvider::ok(), MockProvider::ok(), MockProvider::ok());
        let odd = request("Hello there.", "en")
            .with_persona("nobody")
            .with_mood_label("bewildered-ish");
        let plain = request("Hello there.", "en");

        assert_eq!(
            h.orchestrator.markup_for(&odd),
            h.orchestrator.markup_for(&plain)
        );
        assert_eq!(odd.mood(), Mood::Neutral);
    }

    #[test]
    fn from_config_registers_configured_providers() {
        let config = SynthesisConfig {
            api_keys: crate::config::ApiKeys {
                elevenlabs: None,
                sarvam: Some(crate::config::ApiKey::new("sk-test").unwrap()),
            },
            piper: Some(crate::config::PiperConfig {
                binary: "piper".into(),
                model_dir: "./voices".into(),
            }),
            ..SynthesisConfig::default()
        };
        let personas = Arc::new(PersonaRegistry::builtin().unwrap());

        let orchestrator = OrchestratorBuilder::from_config(&config, personas).build();

        assert_eq!(
            orchestrator.providers().collect::<Vec<_>>(),
            vec![ProviderKind::Sarvam, ProviderKind::Piper]
        );
    }
}
