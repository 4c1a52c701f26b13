//! Voice persona registry.
//!
//! A persona is the voice character end users pick. Internally it maps to one
//! voice per provider, each limited to the languages that voice can speak.
//! The registry is validated once at construction and never mutated.

mod builtin;

use crate::config::LanguageCode;
use crate::emotion::Loudness;
use crate::tts::{ProviderKind, VoiceId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use builtin::{builtin_personas, DEFAULT_PERSONA_ID};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    Neutral,
}

/// How ceremonial a persona sounds. Only slows sacred content down.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SacredTier {
    #[default]
    Everyday,
    Devotional,
    Ceremonial,
}

impl SacredTier {
    pub fn rate_bias(self) -> f32 {
        match self {
            SacredTier::Everyday => 1.0,
            SacredTier::Devotional => 0.95,
            SacredTier::Ceremonial => 0.9,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Baseline {
    pub rate: f32,
    pub pitch_st: f32,
    pub loudness: Loudness,
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch_st: 0.0,
            loudness: Loudness::Medium,
        }
    }
}

/// A provider-specific voice and the primary language subtags it supports.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VoiceBinding {
    pub provider: ProviderKind,
    pub voice_id: VoiceId,
    pub languages: BTreeSet<String>,
}

impl VoiceBinding {
    pub fn new(provider: ProviderKind, voice_id: &str, languages: &[&str]) -> Self {
        Self {
            provider,
            voice_id: VoiceId(voice_id.to_owned()),
            languages: languages.iter().map(|l| l.to_ascii_lowercase()).collect(),
        }
    }

    pub fn supports(&self, language: &LanguageCode) -> bool {
        self.languages.contains(language.primary())
    }

    fn is_usable(&self) -> bool {
        !self.voice_id.0.trim().is_empty() && !self.languages.is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VoicePersona {
    pub id: String,
    pub display_name: String,
    pub gender: Gender,
    pub style_tags: Vec<String>,
    pub voices: Vec<VoiceBinding>,
    pub baseline: Baseline,
    pub sacred_tier: SacredTier,
}

impl VoicePersona {
    pub fn binding(&self, provider: ProviderKind) -> Option<&VoiceBinding> {
        self.voices.iter().find(|b| b.provider == provider)
    }

    pub fn resolve_voice(&self, provider: ProviderKind, language: &LanguageCode) -> Option<&VoiceId> {
        self.binding(provider)
            .filter(|b| b.is_usable() && b.supports(language))
            .map(|b| &b.voice_id)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("persona registry is empty")]
    Empty,
    #[error("duplicate persona id: {0}")]
    DuplicateId(String),
    #[error("persona {0} has no usable voice for any provider and language")]
    Unreachable(String),
    #[error("persona {persona} binds provider {provider} more than once")]
    DuplicateBinding {
        persona: String,
        provider: ProviderKind,
    },
    #[error("default persona {0} is not registered")]
    UnknownDefault(String),
}

#[derive(Clone, Debug)]
pub struct PersonaRegistry {
    personas: BTreeMap<String, VoicePersona>,
    default_id: String,
}

impl PersonaRegistry {
    pub fn new(personas: Vec<VoicePersona>, default_id: &str) -> Result<Self, RegistryError> {
        if personas.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut map = BTreeMap::new();
        for persona in personas {
            if !persona.voices.iter().any(VoiceBinding::is_usable) {
                return Err(RegistryError::Unreachable(persona.id));
            }
            let mut seen = BTreeSet::new();
            for binding in &persona.voices {
                if !seen.insert(binding.provider) {
                    return Err(RegistryError::DuplicateBinding {
                        persona: persona.id.clone(),
                        provider: binding.provider,
                    });
                }
            }
            if map.contains_key(&persona.id) {
                return Err(RegistryError::DuplicateId(persona.id));
            }
            map.insert(persona.id.clone(), persona);
        }

        if !map.contains_key(default_id) {
            return Err(RegistryError::UnknownDefault(default_id.to_owned()));
        }

        Ok(Self {
            personas: map,
            default_id: default_id.to_owned(),
        })
    }

    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(builtin_personas(), DEFAULT_PERSONA_ID)
    }

    pub fn get(&self, id: &str) -> Option<&VoicePersona> {
        self.personas.get(id)
    }

    pub fn default_persona(&self) -> &VoicePersona {
        // Checked in `new`; the map is never mutated afterwards.
        &self.personas[&self.default_id]
    }

    /// Looks up a persona, degrading to the default for unknown ids.
    pub fn resolve(&self, id: Option<&str>) -> &VoicePersona {
        id.and_then(|id| self.get(id.trim()))
            .unwrap_or_else(|| self.default_persona())
    }

    pub fn resolve_voice(
        &self,
        persona: &str,
        provider: ProviderKind,
        language: &LanguageCode,
    ) -> Option<&VoiceId> {
        self.get(persona)?.resolve_voice(provider, language)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.personas.keys().map(String::as_str)
    }
}
