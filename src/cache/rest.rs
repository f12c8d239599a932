use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::KvStore;

/// Redis-over-HTTP store (Upstash / Vercel KV REST protocol).
///
/// Commands are posted as JSON arrays to the endpoint root, e.g.
/// `["SET", key, value, "EX", ttl]`, authenticated with a bearer token.
pub struct RestStore {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RestStore {
    pub fn new(endpoint: String, token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn command(&self, args: serde_json::Value) -> Result<Option<serde_json::Value>> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await
            .context("KV request failed")?;

        let status = resp.status();
        let reply: CommandReply = resp.json().await.context("Failed to parse KV reply")?;
        if let Some(error) = reply.error {
            bail!("KV error: {}", error);
        }
        if !status.is_success() {
            bail!("KV request returned HTTP {}", status.as_u16());
        }
        Ok(reply.result.filter(|v| !v.is_null()))
    }
}

#[async_trait]
impl KvStore for RestStore {
    fn backend(&self) -> &'static str {
        "rest"
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        match self.command(serde_json::json!(["GET", key])).await? {
            Some(serde_json::Value::String(raw)) => Ok(Some(
                serde_json::from_str(&raw).context("Corrupt cached value")?,
            )),
            Some(other) => Ok(Some(other)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        let raw = serde_json::to_string(&value).context("serialize cached value")?;
        self.command(serde_json::json!(["SET", key, raw, "EX", ttl.as_secs().max(1)]))
            .await?;
        Ok(())
    }
}
