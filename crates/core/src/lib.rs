#![deny(warnings)]

pub mod cache;
pub mod config;
pub mod emotion;
pub mod health;
pub mod markup;
pub mod orchestrator;
pub mod persona;
pub mod tts;

pub use cache::{AudioCache, ContentClass, MemoryAudioCache};
pub use config::SynthesisConfig;
pub use emotion::Mood;
pub use health::HealthRegistry;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, SynthesisRequest, SynthesisResult};
pub use persona::PersonaRegistry;
pub use tts::{ProviderKind, TtsProvider};
