mod detect;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use detect::detect_mood;

/// Emotional state hint attached to a synthesis request.
///
/// Labels arrive as free-form strings from upstream collaborators; anything not
/// recognised resolves to [`Mood::Neutral`].
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    #[default]
    Neutral,
    Calm,
    Peaceful,
    Joyful,
    Excited,
    Grateful,
    Hopeful,
    Loving,
    Compassionate,
    Encouraging,
    Sad,
    Grieving,
    Lonely,
    Anxious,
    Fearful,
    Angry,
    Frustrated,
    Confused,
    Tired,
    Reflective,
    Reverent,
    Prayerful,
    Worshipful,
    Meditative,
    Triumphant,
}

impl Mood {
    pub const ALL: [Mood; 25] = [
        Mood::Neutral,
        Mood::Calm,
        Mood::Peaceful,
        Mood::Joyful,
        Mood::Excited,
        Mood::Grateful,
        Mood::Hopeful,
        Mood::Loving,
        Mood::Compassionate,
        Mood::Encouraging,
        Mood::Sad,
        Mood::Grieving,
        Mood::Lonely,
        Mood::Anxious,
        Mood::Fearful,
        Mood::Angry,
        Mood::Frustrated,
        Mood::Confused,
        Mood::Tired,
        Mood::Reflective,
        Mood::Reverent,
        Mood::Prayerful,
        Mood::Worshipful,
        Mood::Meditative,
        Mood::Triumphant,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Mood::Neutral => "neutral",
            Mood::Calm => "calm",
            Mood::Peaceful => "peaceful",
            Mood::Joyful => "joyful",
            Mood::Excited => "excited",
            Mood::Grateful => "grateful",
            Mood::Hopeful => "hopeful",
            Mood::Loving => "loving",
            Mood::Compassionate => "compassionate",
            Mood::Encouraging => "encouraging",
            Mood::Sad => "sad",
            Mood::Grieving => "grieving",
            Mood::Lonely => "lonely",
            Mood::Anxious => "anxious",
            Mood::Fearful => "fearful",
            Mood::Angry => "angry",
            Mood::Frustrated => "frustrated",
            Mood::Confused => "confused",
            Mood::Tired => "tired",
            Mood::Reflective => "reflective",
            Mood::Reverent => "reverent",
            Mood::Prayerful => "prayerful",
            Mood::Worshipful => "worshipful",
            Mood::Meditative => "meditative",
            Mood::Triumphant => "triumphant",
        }
    }

    /// Strict parse. Accepts canonical labels and a handful of common synonyms.
    pub fn parse(label: &str) -> Option<Mood> {
        let normalized = label.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        if let Some(mood) = Mood::ALL.iter().copied().find(|m| m.label() == normalized) {
            return Some(mood);
        }
        let alias = match normalized.as_str() {
            "default" | "normal" => Mood::Neutral,
            "happy" | "joy" => Mood::Joyful,
            "thankful" => Mood::Grateful,
            "grief" | "mourning" => Mood::Grieving,
            "worried" | "nervous" | "stressed" => Mood::Anxious,
            "scared" | "afraid" => Mood::Fearful,
            "mad" => Mood::Angry,
            "exhausted" | "weary" => Mood::Tired,
            "prayer" => Mood::Prayerful,
            "worship" => Mood::Worshipful,
            "sacred" | "devotional" => Mood::Reverent,
            _ => return None,
        };
        Some(alias)
    }

    /// Lossy parse: unknown labels degrade to [`Mood::Neutral`].
    pub fn from_label(label: &str) -> Mood {
        Mood::parse(label).unwrap_or_default()
    }

    /// Devotional moods used for scripture, prayer and worship content.
    pub fn is_sacred(self) -> bool {
        matches!(
            self,
            Mood::Reverent | Mood::Prayerful | Mood::Worshipful | Mood::Meditative
        )
    }

    pub fn profile(self) -> EmotionProfile {
        EmotionProfile::for_mood(self)
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Discrete loudness steps understood by every markup consumer.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Loudness {
    XSoft,
    Soft,
    #[default]
    Medium,
    Loud,
    XLoud,
}

impl Loudness {
    pub fn level(self) -> f32 {
        match self {
            Loudness::XSoft => -2.0,
            Loudness::Soft => -1.0,
            Loudness::Medium => 0.0,
            Loudness::Loud => 1.0,
            Loudness::XLoud => 2.0,
        }
    }

    /// Nearest step for a numeric level; halves round away from zero.
    pub fn from_level(level: f32) -> Loudness {
        match level.round() as i32 {
            i32::MIN..=-2 => Loudness::XSoft,
            -1 => Loudness::Soft,
            0 => Loudness::Medium,
            1 => Loudness::Loud,
            _ => Loudness::XLoud,
        }
    }

    pub fn as_markup(self) -> &'static str {
        match self {
            Loudness::XSoft => "x-soft",
            Loudness::Soft => "soft",
            Loudness::Medium => "medium",
            Loudness::Loud => "loud",
            Loudness::XLoud => "x-loud",
        }
    }
}

/// Acoustic adjustments associated with a mood.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmotionProfile {
    /// Multiplier applied to the persona baseline rate.
    pub rate: f32,
    /// Added to the persona baseline pitch, in semitones.
    pub pitch_st: f32,
    pub loudness: Loudness,
    /// Scales every inserted pause. Zero disables punctuation pauses.
    pub pause_multiplier: f32,
    /// Adds a breathing pause between paragraphs.
    pub breathing: bool,
}

impl EmotionProfile {
    const fn new(
        rate: f32,
        pitch_st: f32,
        loudness: Loudness,
        pause_multiplier: f32,
        breathing: bool,
    ) -> Self {
        Self {
            rate,
            pitch_st,
            loudness,
            pause_multiplier,
            breathing,
        }
    }

    pub fn neutral() -> Self {
        Self::for_mood(Mood::Neutral)
    }

    // Exhaustive: a new mood cannot be added without a profile.
    pub fn for_mood(mood: Mood) -> Self {
        use Loudness::*;
        match mood {
            Mood::Neutral => Self::new(1.0, 0.0, Medium, 1.0, false),
            Mood::Calm => Self::new(0.9, -0.5, Soft, 1.2, true),
            Mood::Peaceful => Self::new(0.85, -1.0, Soft, 1.3, true),
            Mood::Joyful => Self::new(1.05, 1.5, Loud, 0.9, false),
            Mood::Excited => Self::new(1.1, 2.0, Loud, 0.8, false),
            Mood::Grateful => Self::new(0.95, 0.5, Medium, 1.1, false),
            Mood::Hopeful => Self::new(1.0, 1.0, Medium, 1.0, false),
            Mood::Loving => Self::new(0.9, 0.0, Soft, 1.2, true),
            Mood::Compassionate => Self::new(0.85, -0.5, Soft, 1.3, true),
            Mood::Encouraging => Self::new(1.0, 1.0, Loud, 1.0, false),
            Mood::Sad => Self::new(0.8, -2.0, Soft, 1.4, true),
            Mood::Grieving => Self::new(0.7, -2.5, XSoft, 1.6, true),
            Mood::Lonely => Self::new(0.8, -1.5, Soft, 1.4, true),
            Mood::Anxious => Self::new(0.85, -0.5, Soft, 1.3, true),
            Mood::Fearful => Self::new(0.85, -1.0, Soft, 1.3, true),
            Mood::Angry => Self::new(0.9, -1.0, Medium, 1.1, false),
            Mood::Frustrated => Self::new(0.9, -0.5, Medium, 1.2, false),
            Mood::Confused => Self::new(0.9, 0.0, Medium, 1.2, false),
            Mood::Tired => Self::new(0.8, -1.0, Soft, 1.3, true),
            Mood::Reflective => Self::new(0.85, -0.5, Soft, 1.3, true),
            Mood::Reverent => Self::new(0.75, -1.5, Soft, 1.5, true),
            Mood::Prayerful => Self::new(0.7, -1.5, XSoft, 1.6, true),
            Mood::Worshipful => Self::new(0.8, -0.5, Medium, 1.4, true),
            Mood::Meditative => Self::new(0.65, -2.0, XSoft, 1.8, true),
            Mood::Triumphant => Self::new(1.0, 1.5, XLoud, 1.0, false),
        }
    }
}

/// Resolve a raw mood label to its profile. Never fails.
pub fn resolve_profile(label: &str) -> EmotionProfile {
    Mood::from_label(label).profile()
}
