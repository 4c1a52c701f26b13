//! Fire-and-forget analytics seam. Sinks must never block or fail the
//! synthesis path, so [`AnalyticsSink::record`] is synchronous and infallible.

use crate::tts::ProviderKind;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

const LOG_TARGET: &str = "tts::analytics";

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SynthesisEvent {
    /// `None` when every provider was exhausted.
    pub provider: Option<ProviderKind>,
    pub latency: Duration,
    pub cache_hit: bool,
    pub characters: usize,
}

pub trait AnalyticsSink: Send + Sync {
    fn record(&self, event: SynthesisEvent);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn record(&self, _event: SynthesisEvent) {}
}

/// Emits each event as one structured `info!` line.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn record(&self, event: SynthesisEvent) {
        tracing::info!(
            target: LOG_TARGET,
            provider = event.provider.map(ProviderKind::as_str).unwrap_or("none"),
            latency_ms = event.latency.as_millis() as u64,
            cache_hit = event.cache_hit,
            characters = event.characters,
            "synthesis"
        );
    }
}

/// Forwards events to a bounded channel for an out-of-band writer. Events are
/// dropped when the channel is full or closed.
#[derive(Clone, Debug)]
pub struct ChannelAnalytics {
    tx: mpsc::Sender<SynthesisEvent>,
}

impl ChannelAnalytics {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SynthesisEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl AnalyticsSink for ChannelAnalytics {
    fn record(&self, event: SynthesisEvent) {
        if let Err(e) = self.tx.try_send(event) {
            tracing::debug!(target: LOG_TARGET, "dropping analytics event: {e}");
        }
    }
}
