//! Trigger event and failure-context normalization

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing mode selecting which layers run for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Deterministic rules + AI screening
    Economy,
    /// Deterministic rules + AI screening + deep AI analysis
    Thorough,
}

/// Event from the external scheduler/queue that starts a file's pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    #[serde(alias = "file_id")]
    pub file_id: Uuid,
    #[serde(alias = "project_id")]
    pub project_id: Uuid,
    #[serde(alias = "tenant_id")]
    pub tenant_id: Uuid,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<Uuid>,
    pub mode: ProcessingMode,
}

/// Normalized failure context extracted from a workflow-runtime failure
/// event.
///
/// Runtimes nest the original triggering event at varying depths inside
/// the failure payload; this extractor probes the known shapes so the
/// failure handler never inspects runtime-specific nesting itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureContext {
    pub file_id: Uuid,
    pub tenant_id: Uuid,
    pub cause: String,
}

impl FailureContext {
    /// Extract a failure context from a (possibly nested) event payload.
    ///
    /// Probes, in order: the payload itself, `data`, `event.data`, and
    /// `data.event.data`. Returns `None` when no candidate carries both a
    /// file id and a tenant id.
    pub fn from_payload(payload: &serde_json::Value, cause: impl Into<String>) -> Option<Self> {
        let candidates = [
            Some(payload),
            payload.get("data"),
            payload.get("event").and_then(|e| e.get("data")),
            payload
                .get("data")
                .and_then(|d| d.get("event"))
                .and_then(|e| e.get("data")),
        ];

        let cause = cause.into();
        for candidate in candidates.into_iter().flatten() {
            let file_id = extract_uuid(candidate, "fileId", "file_id");
            let tenant_id = extract_uuid(candidate, "tenantId", "tenant_id");
            if let (Some(file_id), Some(tenant_id)) = (file_id, tenant_id) {
                return Some(Self {
                    file_id,
                    tenant_id,
                    cause,
                });
            }
        }
        None
    }
}

fn extract_uuid(value: &serde_json::Value, camel: &str, snake: &str) -> Option<Uuid> {
    value
        .get(camel)
        .or_else(|| value.get(snake))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trigger_event_accepts_camel_case() {
        let event: TriggerEvent = serde_json::from_value(json!({
            "fileId": "6f0c2f9e-2b9a-4b5e-9a3f-111111111111",
            "projectId": "6f0c2f9e-2b9a-4b5e-9a3f-222222222222",
            "tenantId": "6f0c2f9e-2b9a-4b5e-9a3f-333333333333",
            "mode": "thorough"
        }))
        .unwrap();
        assert_eq!(event.mode, ProcessingMode::Thorough);
        assert!(event.user_id.is_none());
    }

    #[test]
    fn failure_context_from_flat_payload() {
        let file_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let payload = json!({
            "fileId": file_id.to_string(),
            "tenantId": tenant_id.to_string(),
        });

        let ctx = FailureContext::from_payload(&payload, "step failed").unwrap();
        assert_eq!(ctx.file_id, file_id);
        assert_eq!(ctx.tenant_id, tenant_id);
    }

    #[test]
    fn failure_context_from_nested_payload() {
        let file_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let payload = json!({
            "runId": "abc",
            "data": {
                "event": {
                    "name": "pipeline/file.process",
                    "data": {
                        "fileId": file_id.to_string(),
                        "tenantId": tenant_id.to_string(),
                        "projectId": Uuid::new_v4().to_string(),
                    }
                }
            }
        });

        let ctx = FailureContext::from_payload(&payload, "boom").unwrap();
        assert_eq!(ctx.file_id, file_id);
        assert_eq!(ctx.tenant_id, tenant_id);
        assert_eq!(ctx.cause, "boom");
    }

    #[test]
    fn failure_context_missing_ids_is_none() {
        let payload = json!({ "data": { "somethingElse": true } });
        assert!(FailureContext::from_payload(&payload, "x").is_none());
    }
}
