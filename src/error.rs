use axum::http::StatusCode;
use thiserror::Error;

/// Request-fatal failures of the analysis pipeline.
///
/// Per-source extraction failures, free-form answer failures and cache
/// failures never become one of these.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Configuration(String),

    #[error("No source could be retrieved")]
    NoSourceRetrieved,

    #[error("{0}")]
    Summarization(String),

    #[error("Analysis did not finish within {0}s")]
    DeadlineExceeded(u64),
}

impl AnalysisError {
    pub fn status(&self) -> StatusCode {
        match self {
            AnalysisError::Validation(_) => StatusCode::BAD_REQUEST,
            AnalysisError::Configuration(_)
            | AnalysisError::NoSourceRetrieved
            | AnalysisError::Summarization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AnalysisError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}
