//! Per-provider circuit breaker.
//!
//! A provider trips after `failure_threshold` consecutive failures and stays
//! excluded until its cooldown elapses. Successes reset the failure counter
//! but never shorten an active cooldown: recovery is time-gated.
//!
//! Timestamps come from [`tokio::time::Instant`], which is monotonic and can be
//! paused and advanced in tests.

use crate::config::BreakerConfig;
use crate::tts::ProviderKind;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

const LOG_TARGET: &str = "tts::health";

#[derive(Clone, Copy, Debug, Default)]
struct ProviderHealth {
    consecutive_failures: u32,
    disabled_until: Option<Instant>,
    last_success: Option<Instant>,
}

impl ProviderHealth {
    fn is_healthy_at(&self, now: Instant) -> bool {
        match self.disabled_until {
            None => true,
            Some(until) => until < now,
        }
    }
}

/// Read-only copy of one provider's breaker state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub healthy: bool,
    pub consecutive_failures: u32,
    pub cooldown_remaining: Option<Duration>,
    pub last_success: Option<Instant>,
}

/// Shared breaker state with one lock per provider. Updates for the same
/// provider are serialised; different providers never share a lock.
#[derive(Debug)]
pub struct HealthRegistry {
    config: BreakerConfig,
    slots: [Mutex<ProviderHealth>; 3],
}

impl HealthRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            slots: Default::default(),
        }
    }

    fn slot(&self, kind: ProviderKind) -> MutexGuard<'_, ProviderHealth> {
        match self.slots[kind.index()].lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!(target: LOG_TARGET, provider = %kind, "health lock was poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn config(&self) -> BreakerConfig {
        self.config
    }

    /// Counts a failure. Returns `true` when this call tripped the breaker.
    ///
    /// A provider already in cooldown keeps its original expiry.
    pub fn record_failure(&self, kind: ProviderKind) -> bool {
        let now = Instant::now();
        let mut entry = self.slot(kind);
        entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);

        if entry.consecutive_failures < self.config.failure_threshold || !entry.is_healthy_at(now) {
            return false;
        }

        entry.disabled_until = Some(now + self.config.cooldown);
        tracing::warn!(
            target: LOG_TARGET,
            provider = %kind,
            failures = entry.consecutive_failures,
            cooldown_secs = self.config.cooldown.as_secs(),
            "circuit opened"
        );
        true
    }

    /// Resets the failure counter. An active cooldown is left in place.
    pub fn record_success(&self, kind: ProviderKind) {
        let now = Instant::now();
        let mut entry = self.slot(kind);
        if entry.consecutive_failures > 0 {
            tracing::debug!(
                target: LOG_TARGET,
                provider = %kind,
                previous_failures = entry.consecutive_failures,
                "failure counter reset"
            );
        }
        entry.consecutive_failures = 0;
        entry.last_success = Some(now);
    }

    /// `true` unless a cooldown is set and has not yet passed.
    pub fn is_healthy(&self, kind: ProviderKind) -> bool {
        let now = Instant::now();
        self.slot(kind).is_healthy_at(now)
    }

    pub fn snapshot(&self, kind: ProviderKind) -> HealthSnapshot {
        let now = Instant::now();
        let health = *self.slot(kind);
        HealthSnapshot {
            healthy: health.is_healthy_at(now),
            consecutive_failures: health.consecutive_failures,
            cooldown_remaining: health
                .disabled_until
                .filter(|until| *until >= now)
                .map(|until| until - now),
            last_success: health.last_success,
        }
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const COOLDOWN: Duration = Duration::from_secs(60);

    fn registry(threshold: u32) -> HealthRegistry {
        HealthRegistry::new(BreakerConfig::new(threshold, COOLDOWN).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn trips_exactly_at_threshold() {
        let health = registry(3);
        assert!(!health.record_failure(ProviderKind::ElevenLabs));
        assert!(!health.record_failure(ProviderKind::ElevenLabs));
        assert!(health.is_healthy(ProviderKind::ElevenLabs));

        assert!(health.record_failure(ProviderKind::ElevenLabs));
        assert!(!health.is_healthy(ProviderKind::ElevenLabs));
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_counter_but_not_cooldown() {
        let health = registry(2);
        health.record_failure(ProviderKind::Sarvam);
        health.record_failure(ProviderKind::Sarvam);
        assert!(!health.is_healthy(ProviderKind::Sarvam));

        health.record_success(ProviderKind::Sarvam);
        let snap = health.snapshot(ProviderKind::Sarvam);
        assert_eq!(snap.consecutive_failures, 0);
        assert!(!snap.healthy);
        assert!(snap.last_success.is_some());

        tokio::time::advance(COOLDOWN + Duration::from_millis(1)).await;
        assert!(health.is_healthy(ProviderKind::Sarvam));
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_expiry_restores_health_without_success() {
        let health = registry(1);
        health.record_failure(ProviderKind::Piper);
        assert!(!health.is_healthy(ProviderKind::Piper));

        tokio::time::advance(COOLDOWN).await;
        // Expiry is strict: equal to `now` is still disabled.
        assert!(!health.is_healthy(ProviderKind::Piper));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(health.is_healthy(ProviderKind::Piper));
        assert_eq!(health.snapshot(ProviderKind::Piper).cooldown_remaining, None);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_during_cooldown_do_not_extend_it() {
        let health = registry(1);
        health.record_failure(ProviderKind::Piper);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!health.record_failure(ProviderKind::Piper));
        assert_eq!(
            health.snapshot(ProviderKind::Piper).cooldown_remaining,
            Some(Duration::from_secs(30))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_failure_after_cooldown_retrips() {
        let health = registry(3);
        for _ in 0..3 {
            health.record_failure(ProviderKind::ElevenLabs);
        }
        tokio::time::advance(COOLDOWN + Duration::from_secs(1)).await;
        assert!(health.is_healthy(ProviderKind::ElevenLabs));

        assert!(health.record_failure(ProviderKind::ElevenLabs));
        assert!(!health.is_healthy(ProviderKind::ElevenLabs));
    }

    #[test]
    fn providers_are_tracked_independently() {
        let health = registry(1);
        health.record_failure(ProviderKind::ElevenLabs);
        assert!(!health.is_healthy(ProviderKind::ElevenLabs));
        assert!(health.is_healthy(ProviderKind::Sarvam));
        assert_eq!(
            health.snapshot(ProviderKind::Sarvam),
            HealthSnapshot {
                healthy: true,
                consecutive_failures: 0,
                cooldown_remaining: None,
                last_success: None,
            }
        );
    }

    #[test]
    fn providers_do_not_share_a_lock() {
        let health = registry(1);
        let _held = health.slots[ProviderKind::ElevenLabs.index()].lock().unwrap();

        // Would deadlock if Sarvam's state sat behind ElevenLabs' lock.
        assert!(health.record_failure(ProviderKind::Sarvam));
        assert!(!health.is_healthy(ProviderKind::Sarvam));
        health.record_success(ProviderKind::Piper);
        assert!(health.snapshot(ProviderKind::Piper).healthy);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_failures_trip_once() {
        let health = Arc::new(registry(64));
        let mut handles = Vec::new();
        for _ in 0..64 {
            let health = Arc::clone(&health);
            handles.push(tokio::spawn(async move {
                health.record_failure(ProviderKind::Sarvam)
            }));
        }
        let mut trips = 0;
        for handle in handles {
            if handle.await.unwrap() {
                trips += 1;
            }
        }
        assert_eq!(trips, 1);
        assert_eq!(health.snapshot(ProviderKind::Sarvam).consecutive_failures, 64);
        assert!(!health.is_healthy(ProviderKind::Sarvam));
    }
}
