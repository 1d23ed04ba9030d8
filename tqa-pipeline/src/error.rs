//! Error types for the QA pipeline
//!
//! The taxonomy splits retriable errors (rate limiting, AI timeouts),
//! which the workflow's retry/backoff handles, from non-retriable ones
//! (state-guard violations, budget exhaustion, persistence failures),
//! which terminate the run and leave the file at `failed`.

use crate::models::FileStatus;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Pipeline error type
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CAS claim failed: the file is not in the expected predecessor state
    #[error("state guard violation for file {file_id}: expected '{expected}', found '{actual}'")]
    StateGuard {
        file_id: Uuid,
        expected: FileStatus,
        actual: String,
    },

    /// AI budget exhausted for the project; surfaced distinctly from rate
    /// limiting and never retried
    #[error("AI budget exhausted for project {0}")]
    BudgetExhausted(Uuid),

    /// Rate limit token unavailable; the workflow retries with backoff
    #[error("rate limited for project {0}")]
    RateLimited(Uuid),

    /// AI call timed out mid-flight; retriable at the workflow level
    #[error("AI call timed out: {0}")]
    AiTimeout(String),

    /// AI provider rejected or garbled a call in a non-retriable way
    #[error("AI call failed: {0}")]
    AiCall(String),

    /// A file the parser produced zero segments for cannot be scored
    #[error("file {0} has no countable words; refusing to score an empty file")]
    EmptyFile(Uuid),

    /// Requested resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invariant violation or unexpected internal state
    #[error("internal error: {0}")]
    Internal(String),

    /// tqa-common error
    #[error("common error: {0}")]
    Common(#[from] tqa_common::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Whether the workflow should retry this error with backoff.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            PipelineError::RateLimited(_) | PipelineError::AiTimeout(_)
        )
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            PipelineError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            PipelineError::StateGuard { .. } => {
                (StatusCode::CONFLICT, "STATE_GUARD", self.to_string())
            }
            PipelineError::BudgetExhausted(_) => {
                (StatusCode::PAYMENT_REQUIRED, "BUDGET_EXHAUSTED", self.to_string())
            }
            PipelineError::RateLimited(_) => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", self.to_string())
            }
            PipelineError::EmptyFile(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_FILE", self.to_string())
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                self.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_split() {
        assert!(PipelineError::RateLimited(Uuid::new_v4()).is_retriable());
        assert!(PipelineError::AiTimeout("t".into()).is_retriable());
        assert!(!PipelineError::BudgetExhausted(Uuid::new_v4()).is_retriable());
        assert!(!PipelineError::AiCall("schema mismatch".into()).is_retriable());
        assert!(!PipelineError::StateGuard {
            file_id: Uuid::new_v4(),
            expected: FileStatus::Parsed,
            actual: "failed".to_string(),
        }
        .is_retriable());
    }
}
