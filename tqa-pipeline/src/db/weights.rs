//! Scoring configuration repository: penalty weights and auto-pass
//! thresholds

use crate::error::{PipelineError, PipelineResult};
use crate::models::{PenaltyWeights, Severity};
use crate::scoring::{resolve_weights, PenaltyWeightRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct ScoringConfigRepository {
    pool: SqlitePool,
}

impl ScoringConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve penalty weights for a tenant.
    ///
    /// One query fetches both the tenant rows and the NULL-tenant system
    /// rows; the merge happens in application code. Filtering to
    /// tenant-only rows here would silently drop system defaults for
    /// tenants without overrides.
    pub async fn penalty_weights(&self, tenant_id: Uuid) -> PipelineResult<PenaltyWeights> {
        let rows = sqlx::query(
            r#"
            SELECT tenant_id, severity, weight
            FROM penalty_weights
            WHERE tenant_id = ? OR tenant_id IS NULL
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut weight_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let severity_str: String = row.get("severity");
            let severity = Severity::parse(&severity_str).ok_or_else(|| {
                PipelineError::Internal(format!("unknown severity '{}'", severity_str))
            })?;
            let tenant: Option<String> = row.get("tenant_id");
            weight_rows.push(PenaltyWeightRow {
                tenant_id: tenant
                    .map(|s| crate::db::parse_uuid(&s, "tenant_id"))
                    .transpose()?,
                severity,
                weight: row.get("weight"),
            });
        }

        Ok(resolve_weights(&weight_rows))
    }

    /// Language-pair-specific auto-pass threshold, when configured
    pub async fn pair_threshold(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        source_language: &str,
        target_language: &str,
    ) -> PipelineResult<Option<f64>> {
        let row = sqlx::query(
            r#"
            SELECT auto_pass_threshold
            FROM language_pair_configs
            WHERE tenant_id = ? AND project_id = ?
              AND source_language = ? AND target_language = ?
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(project_id.to_string())
        .bind(source_language)
        .bind(target_language)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<f64, _>("auto_pass_threshold")))
    }

    /// Project-level auto-pass threshold; `None` when the project record
    /// is missing or carries no threshold
    pub async fn project_threshold(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
    ) -> PipelineResult<Option<f64>> {
        let row = sqlx::query(
            "SELECT auto_pass_threshold FROM projects WHERE tenant_id = ? AND id = ?",
        )
        .bind(tenant_id.to_string())
        .bind(project_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| r.get::<Option<f64>, _>("auto_pass_threshold")))
    }
}
