//! Service-level configuration helpers
//!
//! The TOML/env layer lives in tqa-common; this module adds the
//! database-backed AI API key resolution used at startup.

use crate::db::settings;
use crate::error::PipelineResult;
use sqlx::SqlitePool;
use tqa_common::config::TomlConfig;
use tracing::info;

/// Resolve the AI API key.
///
/// Priority: settings table (operator-managed, survives redeploys) >
/// environment variable > TOML file. The env/TOML layering is already
/// applied by [`TomlConfig::load`], so this only adds the database tier.
pub async fn resolve_ai_api_key(
    pool: &SqlitePool,
    config: &TomlConfig,
) -> PipelineResult<Option<String>> {
    if let Some(key) = settings::get_ai_api_key(pool).await? {
        info!("AI API key loaded from settings table");
        return Ok(Some(key));
    }

    if config.ai.api_key.is_some() {
        info!("AI API key loaded from environment/config file");
    }
    Ok(config.ai.api_key.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn database_key_wins_over_config() {
        let pool = test_pool().await;
        let mut config = TomlConfig::default();
        config.ai.api_key = Some("sk-from-toml".to_string());

        assert_eq!(
            resolve_ai_api_key(&pool, &config).await.unwrap().as_deref(),
            Some("sk-from-toml")
        );

        settings::set_ai_api_key(&pool, "sk-from-db".to_string())
            .await
            .unwrap();
        assert_eq!(
            resolve_ai_api_key(&pool, &config).await.unwrap().as_deref(),
            Some("sk-from-db")
        );
    }

    #[tokio::test]
    async fn no_key_anywhere_is_none() {
        let pool = test_pool().await;
        let config = TomlConfig::default();
        assert!(resolve_ai_api_key(&pool, &config).await.unwrap().is_none());
    }
}
