//! Segment repository: read-only input to every layer runner

use crate::db::parse_uuid;
use crate::error::PipelineResult;
use crate::models::Segment;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct SegmentRepository {
    pool: SqlitePool,
}

impl SegmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All segments of a file, ordered by position
    pub async fn for_file(&self, tenant_id: Uuid, file_id: Uuid) -> PipelineResult<Vec<Segment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, file_id, position, source_text, target_text,
                   source_language, target_language, word_count, signed_off
            FROM segments
            WHERE tenant_id = ? AND file_id = ?
            ORDER BY position
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(file_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_segment).collect()
    }

    /// Segments across a set of files, for the batch-scoped consistency pass
    pub async fn for_files(
        &self,
        tenant_id: Uuid,
        file_ids: &[Uuid],
    ) -> PipelineResult<Vec<Segment>> {
        if file_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; file_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT id, file_id, position, source_text, target_text,
                   source_language, target_language, word_count, signed_off
            FROM segments
            WHERE tenant_id = ? AND file_id IN ({})
            ORDER BY file_id, position
            "#,
            placeholders
        );

        let mut query = sqlx::query(&sql).bind(tenant_id.to_string());
        for file_id in file_ids {
            query = query.bind(file_id.to_string());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_segment).collect()
    }

    /// Sum of word counts for a file
    pub async fn total_words(&self, tenant_id: Uuid, file_id: Uuid) -> PipelineResult<i64> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(word_count), 0) AS total FROM segments WHERE tenant_id = ? AND file_id = ?",
        )
        .bind(tenant_id.to_string())
        .bind(file_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("total"))
    }

    /// Insert segments (used by the parsing collaborator and tests)
    pub async fn insert_many(&self, tenant_id: Uuid, segments: &[Segment]) -> PipelineResult<()> {
        for segment in segments {
            sqlx::query(
                r#"
                INSERT INTO segments (id, tenant_id, file_id, position, source_text, target_text,
                                      source_language, target_language, word_count, signed_off)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(segment.id.to_string())
            .bind(tenant_id.to_string())
            .bind(segment.file_id.to_string())
            .bind(segment.position)
            .bind(&segment.source_text)
            .bind(&segment.target_text)
            .bind(&segment.source_language)
            .bind(&segment.target_language)
            .bind(segment.word_count)
            .bind(segment.signed_off as i64)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

fn row_to_segment(row: sqlx::sqlite::SqliteRow) -> PipelineResult<Segment> {
    Ok(Segment {
        id: parse_uuid(&row.get::<String, _>("id"), "id")?,
        file_id: parse_uuid(&row.get::<String, _>("file_id"), "file_id")?,
        position: row.get("position"),
        source_text: row.get("source_text"),
        target_text: row.get("target_text"),
        source_language: row.get("source_language"),
        target_language: row.get("target_language"),
        word_count: row.get("word_count"),
        signed_off: row.get::<i64, _>("signed_off") != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn segment(file_id: Uuid, position: i64, words: i64) -> Segment {
        Segment {
            id: Uuid::new_v4(),
            file_id,
            position,
            source_text: "Hello world".to_string(),
            target_text: "Hallo Welt".to_string(),
            source_language: "en".to_string(),
            target_language: "de".to_string(),
            word_count: words,
            signed_off: false,
        }
    }

    #[tokio::test]
    async fn word_counts_sum_per_file() {
        let repo = SegmentRepository::new(test_pool().await);
        let tenant = Uuid::new_v4();
        let file = Uuid::new_v4();

        repo.insert_many(tenant, &[segment(file, 0, 10), segment(file, 1, 7)])
            .await
            .unwrap();

        assert_eq!(repo.total_words(tenant, file).await.unwrap(), 17);
        assert_eq!(repo.total_words(tenant, Uuid::new_v4()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn for_files_spans_multiple_files_and_is_tenant_scoped() {
        let repo = SegmentRepository::new(test_pool().await);
        let tenant = Uuid::new_v4();
        let file_a = Uuid::new_v4();
        let file_b = Uuid::new_v4();

        repo.insert_many(tenant, &[segment(file_a, 0, 3), segment(file_b, 0, 4)])
            .await
            .unwrap();

        let both = repo.for_files(tenant, &[file_a, file_b]).await.unwrap();
        assert_eq!(both.len(), 2);

        let other_tenant = repo
            .for_files(Uuid::new_v4(), &[file_a, file_b])
            .await
            .unwrap();
        assert!(other_tenant.is_empty());
    }
}
