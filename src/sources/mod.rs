pub mod clean;
pub mod types;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use tracing::{debug, info, warn};

use types::{Extraction, ExtractionOutcome, PartyInput, Source};

/// Browser-like identity; several publishers reject obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub const NO_SOURCE_REASON: &str = "no source provided";

/// Markup budget per extracted character; pages rarely need more.
const BODY_BYTES_PER_CHAR: usize = 64;
const MIN_BODY_BYTES: usize = 4 * 1024 * 1024;

pub struct SourceExtractor {
    client: reqwest::Client,
    timeout: Duration,
    max_chars: usize,
    max_body_bytes: usize,
}

impl SourceExtractor {
    pub fn new(timeout: Duration, max_chars: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            timeout,
            max_chars,
            max_body_bytes: max_chars.saturating_mul(BODY_BYTES_PER_CHAR).max(MIN_BODY_BYTES),
        })
    }

    /// Extract every party concurrently. One slow or failing source never
    /// affects the others; all are awaited before returning.
    pub async fn extract_all(&self, parties: &[PartyInput]) -> Vec<ExtractionOutcome> {
        join_all(parties.iter().map(|party| self.extract(party))).await
    }

    pub async fn extract(&self, party: &PartyInput) -> ExtractionOutcome {
        let extraction = match party.source() {
            Source::None => Extraction::Failure {
                reason: NO_SOURCE_REASON.to_string(),
            },
            Source::Text(text) => Extraction::Success {
                text: clean::truncate_chars(text.to_string(), self.max_chars),
            },
            Source::Url(url) => match tokio::time::timeout(self.timeout, self.fetch(url)).await {
                Ok(Ok(text)) => Extraction::Success {
                    text: clean::truncate_chars(text, self.max_chars),
                },
                Ok(Err(e)) => Extraction::Failure {
                    reason: format!("{:#}", e),
                },
                Err(_) => Extraction::Failure {
                    reason: format!("timed out after {}s", self.timeout.as_secs()),
                },
            },
        };

        match &extraction {
            Extraction::Success { text } => {
                info!(party_id = %party.id, chars = text.chars().count(), "Source extracted")
            }
            Extraction::Failure { .. } => {
                warn!(party_id = %party.id, "Source {}", extraction)
            }
        }

        ExtractionOutcome {
            party_id: party.id.clone(),
            name: party.name.clone(),
            extraction,
        }
    }

    /// Single GET, no retries. The body is read up to `max_body_bytes` and
    /// rendered off the runtime so the caller's timeout still applies.
    async fn fetch(&self, url: &str) -> Result<String> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch URL")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP {}", status.as_u16());
        }

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.context("Failed to read response body")? {
            let room = self.max_body_bytes - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                debug!(url, limit = self.max_body_bytes, "Response body truncated");
                break;
            }
            body.extend_from_slice(&chunk);
        }
        debug!(url, content_type, bytes = body.len(), "Fetched source");

        // Untyped responses are usually HTML too
        let is_html = content_type.contains("html") || content_type.is_empty();
        let text = tokio::task::spawn_blocking(move || {
            let raw = String::from_utf8_lossy(&body);
            if is_html {
                clean::html_to_text(&raw)
            } else {
                clean::collapse_whitespace(&raw)
            }
        })
        .await
        .context("spawn_blocking join failed")?;

        if text.is_empty() {
            bail!("no readable text");
        }
        Ok(text)
    }
}
