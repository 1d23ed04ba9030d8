//! Durable step journal for pipeline runs
//!
//! Each completed workflow step writes a checkpoint row; a crash between
//! steps resumes at the last completed step instead of restarting the
//! file from scratch.

use crate::error::PipelineResult;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Clone)]
pub struct RunJournal {
    pool: SqlitePool,
}

impl RunJournal {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether a named step already completed for this file
    pub async fn is_completed(&self, file_id: Uuid, step: &str) -> PipelineResult<bool> {
        let row = sqlx::query("SELECT 1 FROM pipeline_runs WHERE file_id = ? AND step = ?")
            .bind(file_id.to_string())
            .bind(step)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Checkpoint a completed step (idempotent)
    pub async fn mark_completed(&self, file_id: Uuid, step: &str) -> PipelineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pipeline_runs (file_id, step, completed_at)
            VALUES (?, ?, ?)
            ON CONFLICT(file_id, step) DO UPDATE SET completed_at = excluded.completed_at
            "#,
        )
        .bind(file_id.to_string())
        .bind(step)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drop all checkpoints for a file (a fresh run from the start state)
    pub async fn clear(&self, file_id: Uuid) -> PipelineResult<()> {
        sqlx::query("DELETE FROM pipeline_runs WHERE file_id = ?")
            .bind(file_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn checkpoints_are_idempotent_and_clearable() {
        let journal = RunJournal::new(test_pool().await);
        let file = Uuid::new_v4();

        assert!(!journal.is_completed(file, "rule_pass").await.unwrap());
        journal.mark_completed(file, "rule_pass").await.unwrap();
        journal.mark_completed(file, "rule_pass").await.unwrap();
        assert!(journal.is_completed(file, "rule_pass").await.unwrap());

        journal.clear(file).await.unwrap();
        assert!(!journal.is_completed(file, "rule_pass").await.unwrap());
    }
}
