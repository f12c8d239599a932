mod analysis;
mod cache;
mod error;
mod llm;
mod routes;
mod sources;
mod state;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn, Level};

use analysis::Analyzer;
use cache::ResultCache;
use llm::{LlmClient, TextGenerator};
use state::{AppState, PipelineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();

    let level = dotenv::var("LOG_LEVEL")
        .ok()
        .and_then(|l| l.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = PipelineConfig::from_env();
    info!(
        caching = config.caching_enabled,
        freeform = config.freeform_enabled,
        ttl_secs = config.cache_ttl.as_secs(),
        extract_timeout_secs = config.extract_timeout.as_secs(),
        deadline_secs = config.request_deadline.as_secs(),
        "Pipeline configured"
    );

    // Init LLM client
    let llm_client = Arc::new(LlmClient::from_env()?);
    if llm_client.has_credential() {
        info!("LLM client initialized");
    } else {
        warn!("No LLM_API_KEY set; analysis requests will fail until one is configured");
    }

    // Init cache store
    let store = cache::store_from_env().await?;
    let cache = ResultCache::new(store, config.cache_ttl);

    let analyzer = Arc::new(Analyzer::new(llm_client, cache, config)?);
    let app = routes::router(AppState { analyzer });

    let addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
