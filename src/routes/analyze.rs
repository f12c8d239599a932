use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::info;

use super::error_response;
use crate::analysis::types::AnalyzeRequest;
use crate::state::AppState;

/// `POST /api/analyze`
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let parties = request.parties.as_ref().map_or(0, Vec::len);
    info!(parties, "Analysis requested");

    match state.analyzer.analyze(request).await {
        Ok(response) => {
            info!(
                parties = response.analysis.len(),
                from_cache = response.from_cache,
                freeform = response.freeform_answer.is_some(),
                "Analysis complete"
            );
            Json(response).into_response()
        }
        Err(e) => e.into_response(),
    }
}
