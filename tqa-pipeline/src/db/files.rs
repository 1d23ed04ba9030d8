//! File repository: status state machine persistence
//!
//! The CAS transition here is the only way a layer runner claims a file.

use crate::db::parse_uuid;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{FileStatus, Layer, QaFile};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load a file, tenant-scoped
    pub async fn get(&self, tenant_id: Uuid, file_id: Uuid) -> PipelineResult<Option<QaFile>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, project_id, name, status, source_language, target_language
            FROM files
            WHERE tenant_id = ? AND id = ?
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(file_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_file).transpose()
    }

    /// Insert a file record (used by the parsing collaborator and tests)
    pub async fn insert(&self, file: &QaFile) -> PipelineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO files (id, tenant_id, project_id, name, status, source_language, target_language, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))
            "#,
        )
        .bind(file.id.to_string())
        .bind(file.tenant_id.to_string())
        .bind(file.project_id.to_string())
        .bind(&file.name)
        .bind(file.status.as_str())
        .bind(&file.source_language)
        .bind(&file.target_language)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Current status string, or `None` when the file does not exist
    pub async fn current_status(
        &self,
        tenant_id: Uuid,
        file_id: Uuid,
    ) -> PipelineResult<Option<String>> {
        let row = sqlx::query("SELECT status FROM files WHERE tenant_id = ? AND id = ?")
            .bind(tenant_id.to_string())
            .bind(file_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("status")))
    }

    /// Compare-and-swap status transition.
    ///
    /// Returns `true` when exactly one row moved from `from` to `to`.
    pub async fn try_transition(
        &self,
        tenant_id: Uuid,
        file_id: Uuid,
        from: FileStatus,
        to: FileStatus,
    ) -> PipelineResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE files
            SET status = ?, updated_at = datetime('now')
            WHERE tenant_id = ? AND id = ? AND status = ?
            "#,
        )
        .bind(to.as_str())
        .bind(tenant_id.to_string())
        .bind(file_id.to_string())
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Claim a file for a layer run.
    ///
    /// Fails non-retriably with a state-guard violation when the file is
    /// not in the layer's expected predecessor state; it never silently
    /// no-ops.
    pub async fn claim(&self, tenant_id: Uuid, file_id: Uuid, layer: Layer) -> PipelineResult<()> {
        let (expected, processing) = match (layer.expected_predecessor(), layer.processing_status())
        {
            (Some(expected), Some(processing)) => (expected, processing),
            _ => {
                return Err(PipelineError::Internal(format!(
                    "layer {} does not participate in the file state machine",
                    layer
                )))
            }
        };

        if self
            .try_transition(tenant_id, file_id, expected, processing)
            .await?
        {
            return Ok(());
        }

        let actual = self
            .current_status(tenant_id, file_id)
            .await?
            .unwrap_or_else(|| "missing".to_string());
        Err(PipelineError::StateGuard {
            file_id,
            expected,
            actual,
        })
    }

    /// Unconditional status update, tenant-scoped.
    ///
    /// Used for completion transitions after a successful claim and for
    /// failure rollbacks.
    pub async fn set_status(
        &self,
        tenant_id: Uuid,
        file_id: Uuid,
        to: FileStatus,
    ) -> PipelineResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE files
            SET status = ?, updated_at = datetime('now')
            WHERE tenant_id = ? AND id = ?
            "#,
        )
        .bind(to.as_str())
        .bind(tenant_id.to_string())
        .bind(file_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PipelineError::NotFound(format!("file {}", file_id)));
        }
        Ok(())
    }
}

fn row_to_file(row: sqlx::sqlite::SqliteRow) -> PipelineResult<QaFile> {
    let status_str: String = row.get("status");
    let status = FileStatus::parse(&status_str)
        .ok_or_else(|| PipelineError::Internal(format!("unknown file status '{}'", status_str)))?;

    Ok(QaFile {
        id: parse_uuid(&row.get::<String, _>("id"), "id")?,
        tenant_id: parse_uuid(&row.get::<String, _>("tenant_id"), "tenant_id")?,
        project_id: parse_uuid(&row.get::<String, _>("project_id"), "project_id")?,
        name: row.get("name"),
        status,
        source_language: row.get("source_language"),
        target_language: row.get("target_language"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn sample_file(status: FileStatus) -> QaFile {
        QaFile {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            name: "handbook.sdlxliff".to_string(),
            status,
            source_language: "en-US".to_string(),
            target_language: "de-DE".to_string(),
        }
    }

    #[tokio::test]
    async fn claim_moves_parsed_file_into_processing() {
        let repo = FileRepository::new(test_pool().await);
        let file = sample_file(FileStatus::Parsed);
        repo.insert(&file).await.unwrap();

        repo.claim(file.tenant_id, file.id, Layer::L1).await.unwrap();

        let loaded = repo.get(file.tenant_id, file.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, FileStatus::L1Processing);
    }

    #[tokio::test]
    async fn claim_fails_with_state_guard_when_already_claimed() {
        let repo = FileRepository::new(test_pool().await);
        let file = sample_file(FileStatus::Parsed);
        repo.insert(&file).await.unwrap();

        repo.claim(file.tenant_id, file.id, Layer::L1).await.unwrap();
        let err = repo
            .claim(file.tenant_id, file.id, Layer::L1)
            .await
            .unwrap_err();

        match err {
            PipelineError::StateGuard { actual, .. } => assert_eq!(actual, "l1_processing"),
            other => panic!("expected StateGuard, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn claim_is_tenant_scoped() {
        let repo = FileRepository::new(test_pool().await);
        let file = sample_file(FileStatus::Parsed);
        repo.insert(&file).await.unwrap();

        let err = repo
            .claim(Uuid::new_v4(), file.id, Layer::L1)
            .await
            .unwrap_err();
        match err {
            PipelineError::StateGuard { actual, .. } => assert_eq!(actual, "missing"),
            other => panic!("expected StateGuard, got {:?}", other),
        }
    }
}
