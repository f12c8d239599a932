use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

use super::KvStore;

pub const DEFAULT_CAPACITY: usize = 1024;

/// Far-future stand-in for TTLs too large to add to an `Instant`.
const NEVER: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// In-process store. Used when no external store is configured.
/// Bounded: the least recently used entry goes first once full.
pub struct MemoryStore {
    entries: Mutex<LruCache<String, (Instant, serde_json::Value)>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

fn expiry(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(NEVER))
        .unwrap_or(now)
}

#[async_trait]
impl KvStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some((expires_at, value)) if *expires_at > Instant::now() => {
                return Ok(Some(value.clone()))
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, (expires_at, _))| *expires_at <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for k in &expired {
            entries.pop(k);
        }

        entries.put(key.to_string(), (expiry(now, ttl), value));
        Ok(())
    }
}
