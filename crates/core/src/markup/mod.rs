//! Speech markup generation.
//!
//! Turns `(text, mood, persona, language)` into SSML-style markup plus the
//! effective prosody. The output is a pure function of its inputs, which is
//! what lets the cache key off the markup alone.
//!
//! Pipeline, in order:
//! 1. escape markup-significant characters
//! 2. punctuation pauses, longest pattern first ([`pauses::PAUSE_RULES`])
//! 3. emphasis around a fixed vocabulary ([`emphasis::EMPHASIS_WORDS`])
//! 4. breathing pauses between paragraphs, when the mood asks for them
//! 5. the outer `<speak><prosody ..>` envelope

mod emphasis;
mod pauses;
mod render;

use crate::config::LanguageCode;
use crate::emotion::{Loudness, Mood};
use crate::persona::VoicePersona;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

pub use emphasis::{EMPHASIS_WORDS, MAX_EMPHASIS_PER_WORD};
pub use pauses::{PauseRule, BREATH_PAUSE_MS, PAUSE_RULES};
pub use render::{to_break_text, to_plain_text, unescape};

/// Weight of the persona baseline when blending loudness; the mood gets the rest.
pub const PERSONA_LOUDNESS_WEIGHT: f32 = 0.6;
pub const MIN_RATE: f32 = 0.5;
pub const MAX_RATE: f32 = 1.5;
pub const MAX_PITCH_ST: f32 = 12.0;

/// Effective acoustic parameters for one request.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Prosody {
    /// Speaking rate relative to the provider default (1.0 = unchanged).
    pub rate: f32,
    /// Pitch shift in semitones.
    pub pitch_st: f32,
    pub loudness: Loudness,
}

impl Default for Prosody {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch_st: 0.0,
            loudness: Loudness::Medium,
        }
    }
}

impl Prosody {
    /// `rate` as a whole percentage, e.g. `85%`.
    pub fn rate_attr(&self) -> String {
        format!("{}%", (self.rate * 100.0).round() as i32)
    }

    /// `pitch` as signed semitones, e.g. `-1.5st`.
    pub fn pitch_attr(&self) -> String {
        // `+ 0.0` turns a negative zero into a positive one.
        format!("{:+.1}st", round_to(self.pitch_st, 10.0) + 0.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MarkupOutput {
    pub markup: String,
    pub prosody: Prosody,
}

/// Blend a mood profile with a persona baseline.
///
/// * rate: product of the two, times the persona's sacred-tier bias when the
///   mood itself is sacred
/// * pitch: sum
/// * loudness: weighted average of the two levels, snapped to the nearest step
pub fn effective_prosody(mood: Mood, persona: &VoicePersona) -> Prosody {
    let profile = mood.profile();
    let baseline = persona.baseline;

    let tier_bias = if mood.is_sacred() {
        persona.sacred_tier.rate_bias()
    } else {
        1.0
    };
    let rate = (profile.rate * baseline.rate * tier_bias).clamp(MIN_RATE, MAX_RATE);
    let pitch_st = (baseline.pitch_st + profile.pitch_st).clamp(-MAX_PITCH_ST, MAX_PITCH_ST);
    let level = PERSONA_LOUDNESS_WEIGHT * baseline.loudness.level()
        + (1.0 - PERSONA_LOUDNESS_WEIGHT) * profile.loudness.level();

    Prosody {
        rate: round_to(rate, 100.0),
        pitch_st: round_to(pitch_st, 10.0),
        loudness: Loudness::from_level(level),
    }
}

pub fn generate(
    text: &str,
    mood: Mood,
    persona: &VoicePersona,
    language: &LanguageCode,
) -> MarkupOutput {
    let profile = mood.profile();
    let prosody = effective_prosody(mood, persona);

    let escaped = escape(text);
    let segments = pauses::insert_pauses(&escaped, profile.pause_multiplier);
    let segments = emphasis::apply_emphasis(segments);
    let segments = if profile.breathing {
        pauses::insert_breaths(segments, profile.pause_multiplier)
    } else {
        segments
    };

    MarkupOutput {
        markup: wrap(&segments, &prosody, language),
        prosody,
    }
}

/// Escape `& < > " '`. `&` goes first so later entities are not re-escaped.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Markup under construction: escaped text interleaved with generated tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    Text(String),
    Tag(String),
}

pub(crate) fn break_tag(ms: u32) -> String {
    format!("<break time=\"{ms}ms\"/>")
}

fn wrap(segments: &[Segment], prosody: &Prosody, language: &LanguageCode) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<speak xml:lang=\"{}\"><prosody rate=\"{}\" pitch=\"{}\" volume=\"{}\">",
        language,
        prosody.rate_attr(),
        prosody.pitch_attr(),
        prosody.loudness.as_markup()
    );
    for segment in segments {
        match segment {
            Segment::Text(t) | Segment::Tag(t) => out.push_str(t),
        }
    }
    out.push_str("</prosody></speak>");
    out
}

fn round_to(value: f32, scale: f32) -> f32 {
    (value * scale).round() / scale
}
