use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cnidarium::{StateDelta, StateRead, StateWrite, Storage};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::KvStore;

// Key prefix, no trailing slash
const ANALYSIS_PREFIX: &str = "analysis";

/// Stored value plus its absolute expiry (unix seconds).
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    expires_at: i64,
    value: serde_json::Value,
}

/// Local persistent store on top of cnidarium.
pub struct DiskStore {
    storage: Storage,
    /// Commits are applied against the latest snapshot; serialize them.
    write_lock: Mutex<()>,
}

impl DiskStore {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let storage = Storage::load(data_dir.to_path_buf(), vec![ANALYSIS_PREFIX.to_string()])
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self {
            storage,
            write_lock: Mutex::new(()),
        })
    }
}

#[async_trait]
impl KvStore for DiskStore {
    fn backend(&self) -> &'static str {
        "disk"
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let snapshot = self.storage.latest_snapshot();
        let Some(bytes) = snapshot.get_raw(key).await? else {
            return Ok(None);
        };
        let envelope: Envelope =
            serde_json::from_slice(&bytes).context("Corrupt cache envelope")?;
        if envelope.expires_at <= chrono::Utc::now().timestamp() {
            debug!(key, "Cache envelope expired");
            return Ok(None);
        }
        Ok(Some(envelope.value))
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let envelope = Envelope {
            expires_at: now.saturating_add(ttl_secs),
            value,
        };
        let bytes = serde_json::to_vec(&envelope).context("serialize cache envelope")?;

        let _guard = self.write_lock.lock().await;
        let snapshot = self.storage.latest_snapshot();
        let expired = expired_keys(&snapshot, now).await;
        let mut delta = StateDelta::new(snapshot);
        for stale in &expired {
            delta.delete(stale.clone());
        }
        delta.put_raw(key.to_string(), bytes);
        self.storage.commit(delta).await?;
        debug!(key, ttl_secs, purged = expired.len(), "Cache envelope stored");
        Ok(())
    }
}

/// Keys under the analysis prefix whose envelope has lapsed or is unreadable.
async fn expired_keys(snapshot: &cnidarium::Snapshot, now: i64) -> Vec<String> {
    let mut stream = snapshot.prefix_raw(ANALYSIS_PREFIX);
    let mut expired = Vec::new();
    while let Some(entry) = stream.next().await {
        match entry {
            Ok((key, bytes)) => {
                let live = serde_json::from_slice::<Envelope>(&bytes)
                    .map(|e| e.expires_at > now)
                    .unwrap_or(false);
                if !live {
                    expired.push(key);
                }
            }
            Err(e) => warn!("Error scanning cache envelopes: {}", e),
        }
    }
    expired
}
