//! Finding repository
//!
//! Findings for a (file, layer) are a fully-replaceable set: reruns
//! delete and reinsert inside one transaction, in bounded batches, so a
//! layer rerun can never duplicate findings.

use crate::db::parse_uuid;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Finding, FindingStatus, Layer, Severity};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Maximum rows per INSERT statement
const INSERT_BATCH_SIZE: usize = 100;

#[derive(Clone)]
pub struct FindingRepository {
    pool: SqlitePool,
}

impl FindingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomically replace the finding set for (file, layer).
    ///
    /// Deletes the existing set and batch-inserts the new one in a single
    /// transaction; rerunning a layer yields the same result set, never
    /// duplicates.
    pub async fn replace_for_layer(
        &self,
        tenant_id: Uuid,
        file_id: Uuid,
        layer: Layer,
        findings: &[Finding],
    ) -> PipelineResult<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM findings WHERE tenant_id = ? AND file_id = ? AND layer = ?")
            .bind(tenant_id.to_string())
            .bind(file_id.to_string())
            .bind(layer.as_str())
            .execute(&mut *tx)
            .await?;

        insert_batched(&mut tx, findings).await?;

        tx.commit().await?;
        Ok(findings.len())
    }

    /// Atomically replace the batch-scoped consistency finding set for a
    /// project.
    pub async fn replace_consistency(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        findings: &[Finding],
    ) -> PipelineResult<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM findings WHERE tenant_id = ? AND project_id = ? AND layer = ?")
            .bind(tenant_id.to_string())
            .bind(project_id.to_string())
            .bind(Layer::Consistency.as_str())
            .execute(&mut *tx)
            .await?;

        insert_batched(&mut tx, findings).await?;

        tx.commit().await?;
        Ok(findings.len())
    }

    /// Findings for a file, optionally filtered to specific layers.
    ///
    /// `None` means "all layers": no layer predicate is added.
    pub async fn for_file(
        &self,
        tenant_id: Uuid,
        file_id: Uuid,
        layers: Option<&[Layer]>,
    ) -> PipelineResult<Vec<Finding>> {
        let mut sql = String::from(
            r#"
            SELECT id, tenant_id, project_id, file_id, segment_id, layer, severity,
                   category, status, segment_count, description, suggested_fix,
                   confidence, source_file_ids
            FROM findings
            WHERE tenant_id = ? AND file_id = ?
            "#,
        );

        if let Some(layers) = layers {
            let placeholders = vec!["?"; layers.len()].join(", ");
            sql.push_str(&format!(" AND layer IN ({})", placeholders));
        }

        let mut query = sqlx::query(&sql)
            .bind(tenant_id.to_string())
            .bind(file_id.to_string());
        if let Some(layers) = layers {
            for layer in layers {
                query = query.bind(layer.as_str());
            }
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_finding).collect()
    }

    /// Consistency findings for a project (no owning file)
    pub async fn consistency_for_project(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
    ) -> PipelineResult<Vec<Finding>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, project_id, file_id, segment_id, layer, severity,
                   category, status, segment_count, description, suggested_fix,
                   confidence, source_file_ids
            FROM findings
            WHERE tenant_id = ? AND project_id = ? AND layer = ?
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(project_id.to_string())
        .bind(Layer::Consistency.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_finding).collect()
    }
}

async fn insert_batched(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    findings: &[Finding],
) -> PipelineResult<()> {
    for batch in findings.chunks(INSERT_BATCH_SIZE) {
        let placeholders = vec!["(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"; batch.len()]
            .join(", ");
        let sql = format!(
            r#"
            INSERT INTO findings (id, tenant_id, project_id, file_id, segment_id, layer,
                                  severity, category, status, segment_count, description,
                                  suggested_fix, confidence, source_file_ids)
            VALUES {}
            "#,
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for finding in batch {
            let source_file_ids = finding
                .source_file_ids
                .as_ref()
                .map(|ids| {
                    serde_json::to_string(
                        &ids.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                    )
                })
                .transpose()
                .map_err(|e| {
                    PipelineError::Internal(format!("serialize source_file_ids: {}", e))
                })?;

            query = query
                .bind(finding.id.to_string())
                .bind(finding.tenant_id.to_string())
                .bind(finding.project_id.to_string())
                .bind(finding.file_id.map(|id| id.to_string()))
                .bind(finding.segment_id.map(|id| id.to_string()))
                .bind(finding.layer.as_str())
                .bind(finding.severity.as_str())
                .bind(&finding.category)
                .bind(finding.status.as_str())
                .bind(finding.segment_count)
                .bind(&finding.description)
                .bind(finding.suggested_fix.as_deref())
                .bind(finding.confidence)
                .bind(source_file_ids);
        }
        query.execute(&mut **tx).await?;
    }
    Ok(())
}

fn row_to_finding(row: sqlx::sqlite::SqliteRow) -> PipelineResult<Finding> {
    let layer_str: String = row.get("layer");
    let severity_str: String = row.get("severity");
    let status_str: String = row.get("status");

    let layer = Layer::parse(&layer_str)
        .ok_or_else(|| PipelineError::Internal(format!("unknown layer '{}'", layer_str)))?;
    let severity = Severity::parse(&severity_str)
        .ok_or_else(|| PipelineError::Internal(format!("unknown severity '{}'", severity_str)))?;
    let status = FindingStatus::parse(&status_str)
        .ok_or_else(|| PipelineError::Internal(format!("unknown finding status '{}'", status_str)))?;

    let source_file_ids = row
        .get::<Option<String>, _>("source_file_ids")
        .map(|json| {
            let raw: Vec<String> = serde_json::from_str(&json).map_err(|e| {
                PipelineError::Internal(format!("parse source_file_ids: {}", e))
            })?;
            raw.iter()
                .map(|s| parse_uuid(s, "source_file_ids"))
                .collect::<PipelineResult<Vec<Uuid>>>()
        })
        .transpose()?;

    Ok(Finding {
        id: parse_uuid(&row.get::<String, _>("id"), "id")?,
        tenant_id: parse_uuid(&row.get::<String, _>("tenant_id"), "tenant_id")?,
        project_id: parse_uuid(&row.get::<String, _>("project_id"), "project_id")?,
        file_id: row
            .get::<Option<String>, _>("file_id")
            .map(|s| parse_uuid(&s, "file_id"))
            .transpose()?,
        segment_id: row
            .get::<Option<String>, _>("segment_id")
            .map(|s| parse_uuid(&s, "segment_id"))
            .transpose()?,
        layer,
        severity,
        category: row.get("category"),
        status,
        segment_count: row.get("segment_count"),
        description: row.get("description"),
        suggested_fix: row.get("suggested_fix"),
        confidence: row.get("confidence"),
        source_file_ids,
    })
}
