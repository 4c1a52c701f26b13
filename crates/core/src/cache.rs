//! Synthesized-audio cache.
//!
//! Keys are a digest of `(markup, provider, voice)`. The markup already encodes
//! text, language, mood and persona prosody, so any change to those yields a
//! new key and nothing needs explicit invalidation. TTLs are chosen by the
//! caller per [`ContentClass`].

use crate::tts::{ProviderKind, VoiceId};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

const LOG_TARGET: &str = "tts::cache";

/// How long synthesized audio for a piece of text stays useful.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentClass {
    /// Static canonical text such as verses; long TTL.
    Canonical,
    /// Generated conversational replies; short TTL.
    #[default]
    Conversational,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(markup: &str, provider: ProviderKind, voice: &VoiceId) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(provider.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(voice.0.as_bytes());
        hasher.update([0u8]);
        hasher.update(markup.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait AudioCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Bytes>;
    fn put(&self, key: CacheKey, audio: Bytes, ttl: Duration);
    fn clear(&self);
}

#[derive(Clone, Debug)]
struct CacheEntry {
    audio: Bytes,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn expires_at(&self) -> Instant {
        self.inserted_at + self.ttl
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }
}

/// Bounded in-process cache. When full, expired entries are purged first,
/// then the entry closest to expiry is evicted.
#[derive(Debug)]
pub struct MemoryAudioCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    max_entries: usize,
}

impl MemoryAudioCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        match self.entries.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!(target: LOG_TARGET, "audio cache lock was poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl AudioCache for MemoryAudioCache {
    fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let now = Instant::now();
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.audio.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    fn put(&self, key: CacheKey, audio: Bytes, ttl: Duration) {
        if self.max_entries == 0 || ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let mut entries = self.lock();

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            entries.retain(|_, e| !e.is_expired(now));
            if entries.len() >= self.max_entries {
                let victim = entries
                    .iter()
                    .min_by_key(|(_, e)| e.expires_at())
                    .map(|(k, _)| k.clone());
                if let Some(victim) = victim {
                    tracing::debug!(target: LOG_TARGET, key = %victim, "evicting cached audio");
                    entries.remove(&victim);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                audio,
                inserted_at: now,
                ttl,
            },
        );
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u32) -> CacheKey {
        CacheKey::derive(&format!("<speak>{n}</speak>"), ProviderKind::Piper, &VoiceId("v".into()))
    }

    #[test]
    fn key_is_deterministic_and_input_sensitive() {
        let voice = VoiceId("rachel".into());
        let a = CacheKey::derive("<speak>hi</speak>", ProviderKind::ElevenLabs, &voice);
        let b = CacheKey::derive("<speak>hi</speak>", ProviderKind::ElevenLabs, &voice);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);

        assert_ne!(a, CacheKey::derive("<speak>hi!</speak>", ProviderKind::ElevenLabs, &voice));
        assert_ne!(a, CacheKey::derive("<speak>hi</speak>", ProviderKind::Sarvam, &voice));
        assert_ne!(
            a,
            CacheKey::derive("<speak>hi</speak>", ProviderKind::ElevenLabs, &VoiceId("adam".into()))
        );
    }

    #[test]
    fn key_fields_are_separated() {
        // Without separators "ab" + "c" and "a" + "bc" would collide.
        let a = CacheKey::derive("c", ProviderKind::Piper, &VoiceId("ab".into()));
        let b = CacheKey::derive("bc", ProviderKind::Piper, &VoiceId("a".into()));
        assert_ne!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryAudioCache::new(8);
        cache.put(key(1), Bytes::from_static(b"audio"), Duration::from_secs(10));
        assert_eq!(cache.get(&key(1)), Some(Bytes::from_static(b"audio")));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get(&key(1)), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn full_cache_evicts_soonest_expiry() {
        let cache = MemoryAudioCache::new(2);
        cache.put(key(1), Bytes::from_static(b"one"), Duration::from_secs(100));
        cache.put(key(2), Bytes::from_static(b"two"), Duration::from_secs(5));
        cache.put(key(3), Bytes::from_static(b"three"), Duration::from_secs(100));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(2)).is_none());
        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(3)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_purged_before_eviction() {
        let cache = MemoryAudioCache::new(2);
        cache.put(key(1), Bytes::from_static(b"one"), Duration::from_secs(1));
        cache.put(key(2), Bytes::from_static(b"two"), Duration::from_secs(100));
        tokio::time::advance(Duration::from_secs(2)).await;

        cache.put(key(3), Bytes::from_static(b"three"), Duration::from_secs(50));
        assert!(cache.get(&key(2)).is_some());
        assert!(cache.get(&key(3)).is_some());
    }

    #[test]
    fn overwrite_and_clear() {
        let cache = MemoryAudioCache::new(1);
        cache.put(key(1), Bytes::from_static(b"a"), Duration::from_secs(60));
        cache.put(key(1), Bytes::from_static(b"b"), Duration::from_secs(60));
        assert_eq!(cache.get(&key(1)), Some(Bytes::from_static(b"b")));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_or_ttl_stores_nothing() {
        let disabled = MemoryAudioCache::new(0);
        disabled.put(key(1), Bytes::from_static(b"a"), Duration::from_secs(60));
        assert!(disabled.is_empty());

        let cache = MemoryAudioCache::new(4);
        cache.put(key(1), Bytes::from_static(b"a"), Duration::ZERO);
        assert!(cache.is_empty());
    }
}
