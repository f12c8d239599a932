mod analyze;
mod health;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::AnalysisError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Analysis request failed");
        }
        error_response(status, self.to_string())
    }
}

async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/analyze",
            post(analyze::analyze).fallback(method_not_allowed),
        )
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header::CONTENT_TYPE, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::analysis::Analyzer;
    use crate::cache::memory::MemoryStore;
    use crate::cache::ResultCache;
    use crate::state::PipelineConfig;
    use crate::testing::ScriptedGenerator;

    fn app(llm: ScriptedGenerator) -> Router {
        let config = PipelineConfig::default();
        let cache = ResultCache::new(Arc::new(MemoryStore::new()), config.cache_ttl);
        let analyzer = Analyzer::new(Arc::new(llm), cache, config).unwrap();
        router(AppState {
            analyzer: Arc::new(analyzer),
        })
    }

    fn default_app() -> Router {
        app(ScriptedGenerator::new(
            r#"{"a": {"economic": "Tax cuts."}}"#,
            "A cuts taxes.",
        ))
    }

    fn post_json(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn valid_body() -> String {
        json!({
            "parties": [
                { "id": "a", "name": "A", "policyText": "We will cut taxes." },
                { "id": "b", "name": "B" }
            ],
            "themes": [{ "key": "economic", "label": "Economy" }],
            "freeformQuestion": "Who cuts taxes?"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_analyze_success_then_cached() {
        let app = default_app();

        let resp = app.clone().oneshot(post_json(valid_body())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["analysis"]["a"]["economic"], "Tax cuts.");
        assert_eq!(
            body["analysis"]["b"]["economic"],
            "information retrieval failed"
        );
        assert_eq!(body["freeformAnswer"]["question"], "Who cuts taxes?");
        assert_eq!(body["freeformAnswer"]["answer"], "A cuts taxes.");
        assert_eq!(body["fromCache"], false);

        let resp = app.oneshot(post_json(valid_body())).await.unwrap();
        let cached = json_body(resp).await;
        assert_eq!(cached["fromCache"], true);
        assert_eq!(cached["analysis"], body["analysis"]);
        assert_eq!(cached["freeformAnswer"], body["freeformAnswer"]);
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let resp = default_app()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/analyze")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json_body(resp).await["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let resp = default_app()
            .oneshot(post_json("not json".to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let no_themes = json!({ "parties": [{ "id": "a", "name": "A", "policyText": "x" }] });
        let resp = default_app()
            .oneshot(post_json(no_themes.to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "Missing themes");

        let no_parties = json!({ "parties": [], "themes": [] });
        let resp = default_app()
            .oneshot(post_json(no_parties.to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let resp = app(ScriptedGenerator::new("{}", "").without_credential())
            .oneshot(post_json(valid_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(resp).await["error"],
            "Model API key is not configured"
        );
    }

    #[tokio::test]
    async fn test_all_sources_failed() {
        let body = json!({
            "parties": [{ "id": "b", "name": "B" }],
            "themes": [{ "key": "economic", "label": "Economy" }]
        });
        let resp = default_app()
            .oneshot(post_json(body.to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await["error"], "No source could be retrieved");
    }

    #[tokio::test]
    async fn test_health() {
        let resp = default_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cache"], "memory");
        assert_eq!(body["llmConfigured"], true);
    }
}
