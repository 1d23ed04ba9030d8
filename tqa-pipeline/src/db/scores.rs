//! Score repository
//!
//! At most one current score row per file; replacement happens inside a
//! transaction and preserves the prior row's layers-completed marker.

use crate::db::parse_uuid;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Score, ScoreStatus};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct ScoreRepository {
    pool: SqlitePool,
}

impl ScoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the score row for a file.
    ///
    /// Deletes any prior row and inserts the new one in one transaction.
    /// The prior row's `layers_completed` marker wins over the value on
    /// the new score. The insert must return a row; an empty return is a
    /// fatal internal error.
    pub async fn replace_for_file(&self, score: &Score) -> PipelineResult<Score> {
        let mut tx = self.pool.begin().await?;

        let prior_marker: Option<String> = sqlx::query(
            "SELECT layers_completed FROM scores WHERE tenant_id = ? AND file_id = ?",
        )
        .bind(score.tenant_id.to_string())
        .bind(score.file_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .and_then(|row| row.get::<Option<String>, _>("layers_completed"));

        sqlx::query("DELETE FROM scores WHERE tenant_id = ? AND file_id = ?")
            .bind(score.tenant_id.to_string())
            .bind(score.file_id.to_string())
            .execute(&mut *tx)
            .await?;

        let layers_completed = prior_marker.or_else(|| score.layers_completed.clone());

        let inserted = sqlx::query(
            r#"
            INSERT INTO scores (id, tenant_id, project_id, file_id, score, npt,
                                critical_count, major_count, minor_count, total_words,
                                status, auto_pass_rationale, layers_completed, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(score.id.to_string())
        .bind(score.tenant_id.to_string())
        .bind(score.project_id.to_string())
        .bind(score.file_id.to_string())
        .bind(score.score)
        .bind(score.npt)
        .bind(score.critical_count)
        .bind(score.major_count)
        .bind(score.minor_count)
        .bind(score.total_words)
        .bind(score.status.as_str())
        .bind(score.auto_pass_rationale.as_deref())
        .bind(layers_completed.as_deref())
        .bind(score.created_at.to_rfc3339())
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            return Err(PipelineError::Internal(format!(
                "score insert for file {} returned no row",
                score.file_id
            )));
        }

        tx.commit().await?;

        let mut persisted = score.clone();
        persisted.layers_completed = layers_completed;
        Ok(persisted)
    }

    /// Current score for a file, if any
    pub async fn for_file(&self, tenant_id: Uuid, file_id: Uuid) -> PipelineResult<Option<Score>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, project_id, file_id, score, npt, critical_count,
                   major_count, minor_count, total_words, status, auto_pass_rationale,
                   layers_completed, created_at
            FROM scores
            WHERE tenant_id = ? AND file_id = ?
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(file_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_score).transpose()
    }

    /// Number of files already scored for an exact language pair within a
    /// project. Drives the new-pair mandatory-review window.
    pub async fn count_scored_for_pair(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        source_language: &str,
        target_language: &str,
    ) -> PipelineResult<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n
            FROM scores s
            JOIN files f ON f.id = s.file_id AND f.tenant_id = s.tenant_id
            WHERE s.tenant_id = ? AND s.project_id = ?
              AND f.source_language = ? AND f.target_language = ?
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(project_id.to_string())
        .bind(source_language)
        .bind(target_language)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("n"))
    }
}

fn row_to_score(row: sqlx::sqlite::SqliteRow) -> PipelineResult<Score> {
    let status_str: String = row.get("status");
    let status = ScoreStatus::parse(&status_str)
        .ok_or_else(|| PipelineError::Internal(format!("unknown score status '{}'", status_str)))?;

    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| PipelineError::Internal(format!("invalid created_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(Score {
        id: parse_uuid(&row.get::<String, _>("id"), "id")?,
        tenant_id: parse_uuid(&row.get::<String, _>("tenant_id"), "tenant_id")?,
        project_id: parse_uuid(&row.get::<String, _>("project_id"), "project_id")?,
        file_id: parse_uuid(&row.get::<String, _>("file_id"), "file_id")?,
        score: row.get("score"),
        npt: row.get("npt"),
        critical_count: row.get("critical_count"),
        major_count: row.get("major_count"),
        minor_count: row.get("minor_count"),
        total_words: row.get("total_words"),
        status,
        auto_pass_rationale: row.get("auto_pass_rationale"),
        layers_completed: row.get("layers_completed"),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::files::FileRepository;
    use crate::db::test_pool;
    use crate::models::{FileStatus, QaFile};

    fn score(tenant: Uuid, project: Uuid, file: Uuid, marker: Option<&str>) -> Score {
        Score {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            project_id: project,
            file_id: file,
            score: 97.5,
            npt: 2.5,
            critical_count: 0,
            major_count: 1,
            minor_count: 3,
            total_words: 1200,
            status: ScoreStatus::Calculated,
            auto_pass_rationale: None,
            layers_completed: marker.map(|s| s.to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn replacement_preserves_prior_layers_completed_marker() {
        let repo = ScoreRepository::new(test_pool().await);
        let (tenant, project, file) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        repo.replace_for_file(&score(tenant, project, file, Some("l3")))
            .await
            .unwrap();
        let replaced = repo
            .replace_for_file(&score(tenant, project, file, Some("l1")))
            .await
            .unwrap();

        assert_eq!(replaced.layers_completed.as_deref(), Some("l3"));
        let loaded = repo.for_file(tenant, file).await.unwrap().unwrap();
        assert_eq!(loaded.layers_completed.as_deref(), Some("l3"));
    }

    #[tokio::test]
    async fn at_most_one_row_per_file() {
        let repo = ScoreRepository::new(test_pool().await);
        let (tenant, project, file) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        for _ in 0..3 {
            repo.replace_for_file(&score(tenant, project, file, None))
                .await
                .unwrap();
        }

        let loaded = repo.for_file(tenant, file).await.unwrap();
        assert!(loaded.is_some());
    }

    #[tokio::test]
    async fn pair_count_matches_exact_language_pair() {
        let pool = test_pool().await;
        let scores = ScoreRepository::new(pool.clone());
        let files = FileRepository::new(pool);
        let (tenant, project) = (Uuid::new_v4(), Uuid::new_v4());

        for (src, tgt) in [("en", "de"), ("en", "de"), ("en", "fr")] {
            let file = QaFile {
                id: Uuid::new_v4(),
                tenant_id: tenant,
                project_id: project,
                name: "f".to_string(),
                status: FileStatus::L3Completed,
                source_language: src.to_string(),
                target_language: tgt.to_string(),
            };
            files.insert(&file).await.unwrap();
            scores
                .replace_for_file(&score(tenant, project, file.id, None))
                .await
                .unwrap();
        }

        assert_eq!(
            scores
                .count_scored_for_pair(tenant, project, "en", "de")
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            scores
                .count_scored_for_pair(tenant, project, "en", "es")
                .await
                .unwrap(),
            0
        );
    }
}
