use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    cache: &'static str,
    llm_configured: bool,
}

/// Liveness probe. Always 200; reports what is configured.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache: state.analyzer.cache_backend(),
        llm_configured: state.analyzer.llm_configured(),
    })
}
