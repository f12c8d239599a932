pub mod disk;
pub mod key;
pub mod memory;
pub mod rest;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::types::{AnalysisResult, FreeformAnswer};
use key::CacheKey;

/// External key-value capability over JSON values.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub analysis: AnalysisResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeform_answer: Option<FreeformAnswer>,
}

/// Cache-first wrapper. Never a correctness dependency: read failures are
/// misses and write failures are dropped.
pub struct ResultCache {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let store_key = key.store_key();
        let value = match self.store.get(&store_key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(key = %store_key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %store_key, error = %e, "Cache lookup failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key = %store_key, error = %e, "Unreadable cache entry, treating as miss");
                None
            }
        }
    }

    pub async fn set(&self, key: &CacheKey, entry: &CacheEntry) {
        let store_key = key.store_key();
        let value = match serde_json::to_value(entry) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %store_key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };
        if let Err(e) = self.store.set(&store_key, value, self.ttl).await {
            warn!(key = %store_key, error = %e, "Cache write failed, continuing");
        }
    }
}

/// Pick the backing store from the environment, once per process.
pub async fn store_from_env() -> Result<Arc<dyn KvStore>> {
    let endpoint = dotenv::var("KV_REST_API_URL").ok().filter(|s| !s.is_empty());
    let token = dotenv::var("KV_REST_API_TOKEN").ok().filter(|s| !s.is_empty());
    if let (Some(endpoint), Some(token)) = (endpoint, token) {
        info!(endpoint = %endpoint, "Using REST key-value store");
        return Ok(Arc::new(rest::RestStore::new(endpoint, token)?));
    }

    if let Some(dir) = dotenv::var("CACHE_DIR").ok().filter(|s| !s.is_empty()) {
        let dir = PathBuf::from(dir);
        let store = disk::DiskStore::new(&dir).await?;
        info!("Disk cache initialized at {:?}", dir);
        return Ok(Arc::new(store));
    }

    let capacity = dotenv::var("MEMORY_CACHE_CAPACITY")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(memory::DEFAULT_CAPACITY);
    info!(capacity, "No external store configured, caching in memory");
    Ok(Arc::new(memory::MemoryStore::with_capacity(capacity)))
}
