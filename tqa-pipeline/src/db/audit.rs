//! Append-only audit log sink
//!
//! Every layer completion and score computation writes one structured
//! entry. Writes are fire-and-forget: a failed audit write is logged and
//! swallowed, never propagated into the pipeline run.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

/// One structured audit entry
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub tenant_id: Uuid,
    pub project_id: Option<Uuid>,
    pub file_id: Option<Uuid>,
    /// Dotted action name, e.g. `layer.l1.completed`, `score.auto_passed`
    pub action: String,
    pub details: serde_json::Value,
}

#[derive(Clone)]
pub struct AuditLog {
    pool: SqlitePool,
}

impl AuditLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an entry, best-effort.
    ///
    /// Failures are logged at warn level and never surfaced to the
    /// caller.
    pub async fn record(&self, entry: AuditEntry) {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_log (id, tenant_id, project_id, file_id, action, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(entry.tenant_id.to_string())
        .bind(entry.project_id.map(|id| id.to_string()))
        .bind(entry.file_id.map(|id| id.to_string()))
        .bind(&entry.action)
        .bind(entry.details.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(action = %entry.action, "Audit log write failed (non-fatal): {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use serde_json::json;
    use sqlx::Row;

    #[tokio::test]
    async fn entries_are_appended() {
        let pool = test_pool().await;
        let audit = AuditLog::new(pool.clone());
        let tenant = Uuid::new_v4();

        audit
            .record(AuditEntry {
                tenant_id: tenant,
                project_id: None,
                file_id: Some(Uuid::new_v4()),
                action: "layer.l1.completed".to_string(),
                details: json!({ "critical": 0, "major": 2, "minor": 5 }),
            })
            .await;

        let row = sqlx::query("SELECT COUNT(*) AS n FROM audit_log WHERE tenant_id = ?")
            .bind(tenant.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.get::<i64, _>("n"), 1);
    }
}
