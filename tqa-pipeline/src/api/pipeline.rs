//! Pipeline trigger endpoints
//!
//! POST /pipeline/file and /pipeline/batch accept a trigger, respond
//! 202 and run the pipeline in a detached task; run errors land in the
//! file's status, the event stream and the diagnostic last-error slot.
//! POST /pipeline/failure is the callback external workflow runtimes
//! post their failure payloads to.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::models::{FailureContext, TriggerEvent};
use crate::AppState;

/// Response for accepted trigger requests
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_count: Option<usize>,
}

/// POST /pipeline/file
///
/// Accepts a single-file trigger and starts the run in the background.
pub async fn trigger_file(
    State(state): State<AppState>,
    Json(event): Json<TriggerEvent>,
) -> (StatusCode, Json<AcceptedResponse>) {
    let file_id = event.file_id;
    let workflow = state.workflow.clone();
    let last_error = state.last_error.clone();

    tokio::spawn(async move {
        if let Err(e) = workflow.process_file(&event).await {
            warn!(%file_id, "pipeline run failed: {}", e);
            *last_error.write().await = Some(e.to_string());
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted".to_string(),
            file_id: Some(file_id),
            file_count: None,
        }),
    )
}

/// POST /pipeline/batch
///
/// Accepts a batch of file triggers; each file runs through its layers,
/// then the cross-file consistency pass covers the batch.
pub async fn trigger_batch(
    State(state): State<AppState>,
    Json(events): Json<Vec<TriggerEvent>>,
) -> (StatusCode, Json<AcceptedResponse>) {
    let file_count = events.len();
    let workflow = state.workflow.clone();
    let last_error = state.last_error.clone();

    tokio::spawn(async move {
        match workflow.process_batch(&events).await {
            Ok(summary) if !summary.failed.is_empty() => {
                warn!(
                    failed = summary.failed.len(),
                    succeeded = summary.succeeded.len(),
                    "batch finished with failures"
                );
                if let Some((file_id, cause)) = summary.failed.first() {
                    *last_error.write().await =
                        Some(format!("file {}: {}", file_id, cause));
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("batch run failed: {}", e);
                *last_error.write().await = Some(e.to_string());
            }
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted".to_string(),
            file_id: None,
            file_count: Some(file_count),
        }),
    )
}

/// POST /pipeline/failure
///
/// Failure callback for external workflow runtimes. The payload nesting
/// varies by runtime; the extractor probes the known shapes.
pub async fn report_failure(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> StatusCode {
    let cause = payload
        .get("error")
        .and_then(|e| e.as_str())
        .unwrap_or("workflow runtime reported a failure")
        .to_string();

    match FailureContext::from_payload(&payload, cause) {
        Some(context) => {
            state.workflow.handle_failure(&context).await;
            StatusCode::OK
        }
        None => {
            warn!("failure callback without extractable file/tenant ids");
            StatusCode::BAD_REQUEST
        }
    }
}

/// Build pipeline trigger routes
pub fn pipeline_routes() -> Router<AppState> {
    Router::new()
        .route("/pipeline/file", post(trigger_file))
        .route("/pipeline/batch", post(trigger_batch))
        .route("/pipeline/failure", post(report_failure))
}
