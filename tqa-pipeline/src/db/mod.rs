//! Database access for the QA pipeline
//!
//! One pool is constructed at process start and passed explicitly into
//! every repository; there is no ambient database handle. Every query is
//! tenant-scoped.

pub mod audit;
pub mod files;
pub mod findings;
pub mod runs;
pub mod scores;
pub mod segments;
pub mod settings;
pub mod weights;

use crate::error::{PipelineError, PipelineResult};
use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

/// Initialize the database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create pipeline tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            source_language TEXT NOT NULL,
            target_language TEXT NOT NULL,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS segments (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            file_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            source_text TEXT NOT NULL,
            target_text TEXT NOT NULL,
            source_language TEXT NOT NULL,
            target_language TEXT NOT NULL,
            word_count INTEGER NOT NULL,
            signed_off INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS findings (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            file_id TEXT,
            segment_id TEXT,
            layer TEXT NOT NULL,
            severity TEXT NOT NULL,
            category TEXT NOT NULL,
            status TEXT NOT NULL,
            segment_count INTEGER NOT NULL DEFAULT 1,
            description TEXT NOT NULL,
            suggested_fix TEXT,
            confidence REAL,
            source_file_ids TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scores (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            file_id TEXT NOT NULL UNIQUE,
            score REAL NOT NULL,
            npt REAL NOT NULL,
            critical_count INTEGER NOT NULL,
            major_count INTEGER NOT NULL,
            minor_count INTEGER NOT NULL,
            total_words INTEGER NOT NULL,
            status TEXT NOT NULL,
            auto_pass_rationale TEXT,
            layers_completed TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS penalty_weights (
            id TEXT PRIMARY KEY,
            tenant_id TEXT,
            severity TEXT NOT NULL,
            weight REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS language_pair_configs (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            source_language TEXT NOT NULL,
            target_language TEXT NOT NULL,
            auto_pass_threshold REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            name TEXT NOT NULL,
            auto_pass_threshold REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            project_id TEXT,
            file_id TEXT,
            action TEXT NOT NULL,
            details TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_runs (
            file_id TEXT NOT NULL,
            step TEXT NOT NULL,
            completed_at TEXT NOT NULL,
            PRIMARY KEY (file_id, step)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized");

    Ok(())
}

/// Parse a UUID column, naming the field in the error
pub(crate) fn parse_uuid(s: &str, field: &str) -> PipelineResult<Uuid> {
    Uuid::parse_str(s)
        .map_err(|e| PipelineError::Internal(format!("invalid UUID in column {}: {}", field, e)))
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    init_tables(&pool).await.unwrap();
    pool
}
