//! Key/value settings persistence (AI API key et al.)

use crate::error::PipelineResult;
use sqlx::{Row, SqlitePool};

const AI_API_KEY: &str = "ai_api_key";

/// Read the stored AI API key, if any
pub async fn get_ai_api_key(pool: &SqlitePool) -> PipelineResult<Option<String>> {
    let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
        .bind(AI_API_KEY)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get::<String, _>("value")))
}

/// Store the AI API key (upsert)
pub async fn set_ai_api_key(pool: &SqlitePool, key: String) -> PipelineResult<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(AI_API_KEY)
    .bind(key)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn api_key_roundtrip() {
        let pool = test_pool().await;
        assert!(get_ai_api_key(&pool).await.unwrap().is_none());

        set_ai_api_key(&pool, "sk-test".to_string()).await.unwrap();
        assert_eq!(get_ai_api_key(&pool).await.unwrap().as_deref(), Some("sk-test"));

        set_ai_api_key(&pool, "sk-rotated".to_string()).await.unwrap();
        assert_eq!(
            get_ai_api_key(&pool).await.unwrap().as_deref(),
            Some("sk-rotated")
        );
    }
}
