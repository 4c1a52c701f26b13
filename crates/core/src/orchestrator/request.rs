use crate::cache::ContentClass;
use crate::config::LanguageCode;
use crate::emotion::Mood;
use crate::tts::ProviderKind;
use thiserror::Error;

pub const MAX_TEXT_CHARS: usize = 5000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text is empty")]
    EmptyText,
    #[error("text is {chars} characters, limit is {max}")]
    TooLong { chars: usize, max: usize },
}

/// One synthesis call. Validated on construction and immutable afterwards.
///
/// Unknown personas and moods are not errors: they degrade to the registry
/// default and [`Mood::Neutral`].
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesisRequest {
    text: String,
    language: LanguageCode,
    persona: Option<String>,
    mood: Mood,
    provider: Option<ProviderKind>,
    content_class: ContentClass,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, language: LanguageCode) -> Result<Self, ValidationError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let chars = trimmed.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Err(ValidationError::TooLong {
                chars,
                max: MAX_TEXT_CHARS,
            });
        }

        Ok(Self {
            text: trimmed.to_owned(),
            language,
            persona: None,
            mood: Mood::Neutral,
            provider: None,
            content_class: ContentClass::default(),
        })
    }

    #[must_use]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        let persona = persona.into();
        self.persona = (!persona.trim().is_empty()).then_some(persona);
        self
    }

    #[must_use]
    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = mood;
        self
    }

    /// Sets the mood from a free-form label; unknown labels become neutral.
    #[must_use]
    pub fn with_mood_label(self, label: &str) -> Self {
        self.with_mood(Mood::from_label(label))
    }

    #[must_use]
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn with_content_class(mut self, class: ContentClass) -> Self {
        self.content_class = class;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> &LanguageCode {
        &self.language
    }

    pub fn persona(&self) -> Option<&str> {
        self.persona.as_deref()
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn provider(&self) -> Option<ProviderKind> {
        self.provider
    }

    pub fn content_class(&self) -> ContentClass {
        self.content_class
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
