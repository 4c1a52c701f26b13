#![deny(warnings)]

use anyhow::Context;
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tts_resilience_core::cache::ContentClass;
use tts_resilience_core::config::{
    ConfigOverrides, Env, LanguageCode, StdEnv, SynthesisConfig, DEFAULT_LANGUAGE,
    ENV_ELEVENLABS_API_KEY, ENV_PIPER_BINARY, ENV_SARVAM_API_KEY,
};
use tts_resilience_core::emotion::{detect_mood, Mood};
use tts_resilience_core::orchestrator::{
    OrchestratorBuilder, SynthesisRequest, SynthesisResult, TracingAnalytics,
};
use tts_resilience_core::persona::PersonaRegistry;
use tts_resilience_core::tts::ProviderKind;

const MOOD_AUTO: &str = "auto";

#[derive(Parser, Debug)]
#[command(name = "tts-resilience")]
#[command(about = "Synthesize one piece of text through the provider fallback chain")]
struct Args {
    #[arg(long)]
    text: String,

    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    lang: String,

    #[arg(long)]
    persona: Option<String>,

    /// Mood label, or `auto` to detect it from the text.
    #[arg(long, default_value = "neutral")]
    mood: String,

    /// Try this provider first.
    #[arg(long, value_parser = parse_provider)]
    provider: Option<ProviderKind>,

    /// Cache as canonical (long-lived) text instead of a conversational reply.
    #[arg(long)]
    canonical: bool,

    #[arg(long, default_value = "out.audio")]
    out: PathBuf,

    /// Print the generated markup and exit without contacting any provider.
    #[arg(long)]
    markup_only: bool,

    #[arg(long)]
    elevenlabs_api_key: Option<String>,

    #[arg(long)]
    sarvam_api_key: Option<String>,

    #[arg(long)]
    piper_binary: Option<String>,

    #[arg(long)]
    piper_model_dir: Option<String>,

    #[arg(long)]
    breaker_threshold: Option<u32>,

    #[arg(long)]
    breaker_cooldown_secs: Option<u64>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_provider(value: &str) -> Result<ProviderKind, String> {
    ProviderKind::parse(value).ok_or_else(|| {
        let known: Vec<_> = ProviderKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown provider {value:?}, expected one of {}", known.join(", "))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let config = build_config(&args, &env)?;
    let request = build_request(&args)?;

    tracing::info!(
        lang = %request.language(),
        mood = %request.mood(),
        elevenlabs = config.api_keys.elevenlabs.is_some(),
        sarvam = config.api_keys.sarvam.is_some(),
        piper = config.piper.is_some(),
        "config loaded"
    );
    if config.api_keys.elevenlabs.is_none() && config.api_keys.sarvam.is_none() && config.piper.is_none() {
        tracing::warn!(
            "no provider configured; set {ENV_ELEVENLABS_API_KEY}, {ENV_SARVAM_API_KEY} or {ENV_PIPER_BINARY}"
        );
    }

    let personas = Arc::new(PersonaRegistry::builtin().context("built-in persona table is invalid")?);
    let orchestrator = OrchestratorBuilder::from_config(&config, personas)
        .analytics(Arc::new(TracingAnalytics))
        .build();

    if args.markup_only {
        println!("{}", orchestrator.markup_for(&request).markup);
        return Ok(());
    }

    match orchestrator.synthesize(&request).await {
        SynthesisResult::Success {
            audio,
            provider,
            voice,
            from_cache,
            ..
        } => {
            tokio::fs::write(&args.out, &audio)
                .await
                .with_context(|| format!("failed to write {}", args.out.display()))?;
            tracing::info!(
                %provider,
                %voice,
                from_cache,
                bytes = audio.len(),
                out = %args.out.display(),
                "audio written"
            );
        }
        SynthesisResult::Exhausted {
            markup,
            prosody,
            failures,
        } => {
            let failures: BTreeMap<_, _> = failures
                .iter()
                .map(|(kind, reason)| (kind.as_str(), reason.to_string()))
                .collect();
            let report = serde_json::json!({
                "status": "exhausted",
                "markup": markup,
                "prosody": prosody,
                "failures": failures,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            anyhow::bail!("every provider was exhausted");
        }
    }

    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_config(args: &Args, env: &impl Env) -> anyhow::Result<SynthesisConfig> {
    let overrides = ConfigOverrides {
        elevenlabs_api_key: args.elevenlabs_api_key.clone(),
        sarvam_api_key: args.sarvam_api_key.clone(),
        piper_binary: args.piper_binary.clone(),
        piper_model_dir: args.piper_model_dir.clone(),
        breaker_threshold: args.breaker_threshold,
        breaker_cooldown_secs: args.breaker_cooldown_secs,
    };
    SynthesisConfig::resolve(overrides, env).context("invalid configuration")
}

fn build_request(args: &Args) -> anyhow::Result<SynthesisRequest> {
    let language = LanguageCode::new(args.lang.as_str())?;
    let mood = if args.mood.trim().eq_ignore_ascii_case(MOOD_AUTO) {
        detect_mood(&args.text)
    } else {
        Mood::from_label(&args.mood)
    };
    let class = if args.canonical {
        ContentClass::Canonical
    } else {
        ContentClass::Conversational
    };

    let mut request = SynthesisRequest::new(args.text.as_str(), language)?
        .with_mood(mood)
        .with_content_class(class);
    if let Some(persona) = &args.persona {
        request = request.with_persona(persona.as_str());
    }
    if let Some(provider) = args.provider {
        request = request.with_provider(provider);
    }
    Ok(request)
}
