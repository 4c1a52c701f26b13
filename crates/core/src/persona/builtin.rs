use crate::emotion::Loudness;
use crate::persona::{Baseline, Gender, SacredTier, VoiceBinding, VoicePersona};
use crate::tts::ProviderKind;

pub const DEFAULT_PERSONA_ID: &str = "narrator";

const ELEVENLABS_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "pl", "nl", "sv", "tr", "ru", "uk", "ar", "hi", "ta",
    "id", "ja", "ko", "zh",
];

const SARVAM_LANGUAGES: &[&str] = &[
    "hi", "bn", "ta", "te", "kn", "ml", "mr", "gu", "pa", "od", "en",
];

fn persona(
    id: &str,
    display_name: &str,
    gender: Gender,
    style_tags: &[&str],
    baseline: Baseline,
    sacred_tier: SacredTier,
    voices: Vec<VoiceBinding>,
) -> VoicePersona {
    VoicePersona {
        id: id.to_owned(),
        display_name: display_name.to_owned(),
        gender,
        style_tags: style_tags.iter().map(|t| (*t).to_owned()).collect(),
        voices,
        baseline,
        sacred_tier,
    }
}

fn baseline(rate: f32, pitch_st: f32, loudness: Loudness) -> Baseline {
    Baseline {
        rate,
        pitch_st,
        loudness,
    }
}

pub fn builtin_personas() -> Vec<VoicePersona> {
    use ProviderKind::*;

    vec![
        persona(
            "narrator",
            "Narrator",
            Gender::Female,
            &["clear", "neutral"],
            baseline(1.0, 0.0, Loudness::Medium),
            SacredTier::Everyday,
            vec![
                VoiceBinding::new(ElevenLabs, "21m00Tcm4TlvDq8ikWAM", ELEVENLABS_LANGUAGES),
                VoiceBinding::new(Sarvam, "meera", SARVAM_LANGUAGES),
                VoiceBinding::new(Piper, "en_US-lessac-medium", &["en"]),
            ],
        ),
        persona(
            "shepherd",
            "Shepherd",
            Gender::Male,
            &["warm", "pastoral"],
            baseline(0.95, -1.0, Loudness::Medium),
            SacredTier::Devotional,
            vec![
                VoiceBinding::new(ElevenLabs, "pNInz6obpgDQGcFMJ2zr", ELEVENLABS_LANGUAGES),
                VoiceBinding::new(Sarvam, "arvind", SARVAM_LANGUAGES),
                VoiceBinding::new(Piper, "en_US-ryan-high", &["en"]),
            ],
        ),
        persona(
            "grace",
            "Grace",
            Gender::Female,
            &["gentle", "nurturing"],
            baseline(0.95, 0.5, Loudness::Soft),
            SacredTier::Devotional,
            vec![
                VoiceBinding::new(ElevenLabs, "EXAVITQu4vr4xnSDxMaL", ELEVENLABS_LANGUAGES),
                VoiceBinding::new(Sarvam, "pavithra", SARVAM_LANGUAGES),
                VoiceBinding::new(Piper, "en_US-amy-medium", &["en"]),
            ],
        ),
        persona(
            "elder",
            "Elder",
            Gender::Male,
            &["deep", "ceremonial"],
            baseline(0.9, -2.0, Loudness::Medium),
            SacredTier::Ceremonial,
            vec![
                VoiceBinding::new(ElevenLabs, "VR6AewLTigWG4xSOukaG", ELEVENLABS_LANGUAGES),
                VoiceBinding::new(Sarvam, "amol", SARVAM_LANGUAGES),
                VoiceBinding::new(Piper, "en_GB-alan-medium", &["en"]),
            ],
        ),
        persona(
            "companion",
            "Companion",
            Gender::Female,
            &["friendly", "youthful"],
            baseline(1.05, 1.0, Loudness::Medium),
            SacredTier::Everyday,
            vec![
                VoiceBinding::new(ElevenLabs, "AZnzlk1XvdvUeBnXmlld", ELEVENLABS_LANGUAGES),
                VoiceBinding::new(Sarvam, "maitreyi", SARVAM_LANGUAGES),
            ],
        ),
        persona(
            "cantor",
            "Cantor",
            Gender::Male,
            &["resonant", "liturgical"],
            baseline(0.9, -0.5, Loudness::Loud),
            SacredTier::Ceremonial,
            vec![
                VoiceBinding::new(ElevenLabs, "TxGEqnHWrfWFTfGW9XjX", ELEVENLABS_LANGUAGES),
                VoiceBinding::new(Piper, "es_ES-davefx-medium", &["es"]),
            ],
        ),
    ]
}
