use crate::cache::ContentClass;
use crate::tts::ProviderKind;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};
use url::Url;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;
pub const DEFAULT_CANONICAL_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_CONVERSATIONAL_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 512;
pub const DEFAULT_MIN_AUDIO_BYTES: usize = 100;
pub const DEFAULT_PIPER_MODEL_DIR: &str = "./voices";
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_SARVAM_BASE_URL: &str = "https://api.sarvam.ai";

pub const ENV_ELEVENLABS_API_KEY: &str = "ELEVENLABS_API_KEY";
pub const ENV_SARVAM_API_KEY: &str = "SARVAM_API_KEY";
pub const ENV_PIPER_BINARY: &str = "PIPER_BINARY";
pub const ENV_PIPER_MODEL_DIR: &str = "PIPER_MODEL_DIR";
pub const ENV_BREAKER_THRESHOLD: &str = "TTS_BREAKER_THRESHOLD";
pub const ENV_BREAKER_COOLDOWN_SECS: &str = "TTS_BREAKER_COOLDOWN_SECS";
pub const ENV_CACHE_TTL_CANONICAL_SECS: &str = "TTS_CACHE_TTL_CANONICAL_SECS";
pub const ENV_CACHE_TTL_CONVERSATIONAL_SECS: &str = "TTS_CACHE_TTL_CONVERSATIONAL_SECS";
pub const ENV_CACHE_MAX_ENTRIES: &str = "TTS_CACHE_MAX_ENTRIES";
pub const ENV_MIN_AUDIO_BYTES: &str = "TTS_MIN_AUDIO_BYTES";
pub const ENV_ELEVENLABS_BASE_URL: &str = "ELEVENLABS_BASE_URL";
pub const ENV_SARVAM_BASE_URL: &str = "SARVAM_BASE_URL";

/// BCP-47-ish language tag, normalised to `xx` or `xx-YY`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        let v = v.trim();
        if v.is_empty() {
            return Err(ConfigError::EmptyLanguage);
        }

        let mut parts = v.split(['-', '_']);
        let primary = parts.next().unwrap_or_default();
        if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidLanguage(v.to_owned()));
        }

        let mut normalized = primary.to_ascii_lowercase();
        for sub in parts {
            if sub.is_empty() || sub.len() > 8 || !sub.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::InvalidLanguage(v.to_owned()));
            }
            normalized.push('-');
            if sub.len() == 2 {
                normalized.push_str(&sub.to_ascii_uppercase());
            } else {
                normalized.push_str(sub);
            }
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase primary subtag, e.g. `hi` for `hi-IN`.
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    pub fn region(&self) -> Option<&str> {
        self.0.split('-').nth(1).filter(|s| s.len() == 2)
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Self(DEFAULT_LANGUAGE.to_owned())
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKeys {
    pub elevenlabs: Option<ApiKey>,
    pub sarvam: Option<ApiKey>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl BreakerConfig {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Result<Self, ConfigError> {
        if failure_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if cooldown.is_zero() {
            return Err(ConfigError::ZeroDuration("breaker cooldown"));
        }
        Ok(Self {
            failure_threshold,
            cooldown,
        })
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    pub canonical_ttl: Duration,
    pub conversational_ttl: Duration,
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn ttl_for(&self, class: ContentClass) -> Duration {
        match class {
            ContentClass::Canonical => self.canonical_ttl,
            ContentClass::Conversational => self.conversational_ttl,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            canonical_ttl: Duration::from_secs(DEFAULT_CANONICAL_TTL_SECS),
            conversational_ttl: Duration::from_secs(DEFAULT_CONVERSATIONAL_TTL_SECS),
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderTimeouts {
    pub elevenlabs: Duration,
    pub sarvam: Duration,
    pub piper: Duration,
}

impl ProviderTimeouts {
    pub fn for_provider(&self, kind: ProviderKind) -> Duration {
        match kind {
            ProviderKind::ElevenLabs => self.elevenlabs,
            ProviderKind::Sarvam => self.sarvam,
            ProviderKind::Piper => self.piper,
        }
    }
}

impl Default for ProviderTimeouts {
    fn default() -> Self {
        Self {
            elevenlabs: Duration::from_secs(20),
            sarvam: Duration::from_secs(15),
            piper: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PiperConfig {
    pub binary: PathBuf,
    pub model_dir: PathBuf,
}

/// Provider base URLs. Validated with [`Url::parse`] when resolved.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub elevenlabs: String,
    pub sarvam: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            elevenlabs: DEFAULT_ELEVENLABS_BASE_URL.to_owned(),
            sarvam: DEFAULT_SARVAM_BASE_URL.to_owned(),
        }
    }
}

/// Startup configuration for the synthesis layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SynthesisConfig {
    pub api_keys: ApiKeys,
    pub piper: Option<PiperConfig>,
    pub breaker: BreakerConfig,
    pub cache: CacheConfig,
    pub timeouts: ProviderTimeouts,
    pub endpoints: ProviderEndpoints,
    pub min_audio_bytes: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_keys: ApiKeys::default(),
            piper: None,
            breaker: BreakerConfig::default(),
            cache: CacheConfig::default(),
            timeouts: ProviderTimeouts::default(),
            endpoints: ProviderEndpoints::default(),
            min_audio_bytes: DEFAULT_MIN_AUDIO_BYTES,
        }
    }
}

/// Values supplied on the command line. Each takes precedence over its env var.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub elevenlabs_api_key: Option<String>,
    pub sarvam_api_key: Option<String>,
    pub piper_binary: Option<String>,
    pub piper_model_dir: Option<String>,
    pub breaker_threshold: Option<u32>,
    pub breaker_cooldown_secs: Option<u64>,
}

impl SynthesisConfig {
    pub fn from_env(env: &impl Env) -> Result<Self, ConfigError> {
        Self::resolve(ConfigOverrides::default(), env)
    }

    pub fn resolve(overrides: ConfigOverrides, env: &impl Env) -> Result<Self, ConfigError> {
        let api_keys = ApiKeys {
            elevenlabs: resolve_api_key(overrides.elevenlabs_api_key, ENV_ELEVENLABS_API_KEY, env)?,
            sarvam: resolve_api_key(overrides.sarvam_api_key, ENV_SARVAM_API_KEY, env)?,
        };

        let piper = resolve_optional_string(overrides.piper_binary, ENV_PIPER_BINARY, env).map(
            |binary| PiperConfig {
                binary: PathBuf::from(binary),
                model_dir: PathBuf::from(resolve_string_with_default(
                    overrides.piper_model_dir,
                    ENV_PIPER_MODEL_DIR,
                    env,
                    DEFAULT_PIPER_MODEL_DIR,
                )),
            },
        );

        let breaker = BreakerConfig::new(
            resolve_number(
                overrides.breaker_threshold,
                ENV_BREAKER_THRESHOLD,
                env,
                DEFAULT_FAILURE_THRESHOLD,
            )?,
            Duration::from_secs(resolve_number(
                overrides.breaker_cooldown_secs,
                ENV_BREAKER_COOLDOWN_SECS,
                env,
                DEFAULT_COOLDOWN_SECS,
            )?),
        )?;

        let cache = CacheConfig {
            canonical_ttl: nonzero_secs(
                resolve_number(None, ENV_CACHE_TTL_CANONICAL_SECS, env, DEFAULT_CANONICAL_TTL_SECS)?,
                "canonical cache ttl",
            )?,
            conversational_ttl: nonzero_secs(
                resolve_number(
                    None,
                    ENV_CACHE_TTL_CONVERSATIONAL_SECS,
                    env,
                    DEFAULT_CONVERSATIONAL_TTL_SECS,
                )?,
                "conversational cache ttl",
            )?,
            max_entries: resolve_number(None, ENV_CACHE_MAX_ENTRIES, env, DEFAULT_CACHE_MAX_ENTRIES)?,
        };

        let endpoints = ProviderEndpoints {
            elevenlabs: resolve_url(ENV_ELEVENLABS_BASE_URL, env, DEFAULT_ELEVENLABS_BASE_URL)?,
            sarvam: resolve_url(ENV_SARVAM_BASE_URL, env, DEFAULT_SARVAM_BASE_URL)?,
        };

        Ok(Self {
            api_keys,
            piper,
            breaker,
            cache,
            timeouts: ProviderTimeouts::default(),
            endpoints,
            min_audio_bytes: resolve_number(None, ENV_MIN_AUDIO_BYTES, env, DEFAULT_MIN_AUDIO_BYTES)?,
        })
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("language code must not be empty")]
    EmptyLanguage,
    #[error("invalid language code: {0}")]
    InvalidLanguage(String),
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("failure threshold must be > 0")]
    ZeroThreshold,
    #[error("{0} must be > 0")]
    ZeroDuration(&'static str),
    #[error("invalid number for {key}: {value}")]
    InvalidNumber { key: String, value: String },
    #[error("invalid url for {key}: {reason}")]
    InvalidUrl { key: String, reason: String },
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}

pub fn resolve_number<T: FromStr>(
    cli_value: Option<T>,
    env_key: &str,
    env: &impl Env,
    default: T,
) -> Result<T, ConfigError> {
    if let Some(v) = cli_value {
        return Ok(v);
    }
    match env.var(env_key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            key: env_key.to_owned(),
            value: raw,
        }),
        None => Ok(default),
    }
}

fn resolve_url(env_key: &str, env: &impl Env, default: &str) -> Result<String, ConfigError> {
    let raw = resolve_string_with_default(None, env_key, env, default);
    let url = Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
        key: env_key.to_owned(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            key: env_key.to_owned(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_owned())
}

fn nonzero_secs(secs: u64, what: &'static str) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::ZeroDuration(what));
    }
    Ok(Duration::from_secs(secs))
}
