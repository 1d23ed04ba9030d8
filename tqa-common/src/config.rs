//! Configuration loading for TQA services
//!
//! Resolution priority: environment variable overrides > TOML file > defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// AI provider configuration for the language-model layers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Base URL of the text-generation service
    pub endpoint: String,
    /// API key (may also come from TQA_AI_API_KEY or the settings table)
    pub api_key: Option<String>,
    /// Model used by the screening pass (L2)
    pub screening_model: String,
    /// Model used by the deep analysis pass (L3)
    pub deep_model: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Input token price per 1k tokens (USD), for cost accounting
    pub input_cost_per_1k: f64,
    /// Output token price per 1k tokens (USD), for cost accounting
    pub output_cost_per_1k: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com".to_string(),
            api_key: None,
            screening_model: "gpt-4o-mini".to_string(),
            deep_model: "gpt-4o".to_string(),
            timeout_secs: 120,
            input_cost_per_1k: 0.00015,
            output_cost_per_1k: 0.0006,
        }
    }
}

/// Service configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// SQLite database path
    pub database_path: String,
    /// HTTP bind address
    pub bind_address: String,
    /// Combined source+target character budget per AI chunk
    pub chunk_char_budget: usize,
    /// Per-project AI request rate limit (requests per minute)
    pub rate_limit_per_minute: u32,
    /// Optional external budget service URL; unlimited quota when absent
    pub budget_service_url: Option<String>,
    /// AI provider settings
    pub ai: AiConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: "tqa.db".to_string(),
            bind_address: "127.0.0.1:5810".to_string(),
            chunk_char_budget: 30_000,
            rate_limit_per_minute: 30,
            budget_service_url: None,
            ai: AiConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Load configuration from a TOML file, then apply environment overrides.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?
        } else {
            tracing::info!("Config file {} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (highest priority)
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TQA_DATABASE_PATH") {
            self.database_path = path;
        }
        if let Ok(addr) = std::env::var("TQA_BIND_ADDRESS") {
            self.bind_address = addr;
        }
        if let Ok(key) = std::env::var("TQA_AI_API_KEY") {
            if !key.trim().is_empty() {
                self.ai.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("TQA_BUDGET_SERVICE_URL") {
            self.budget_service_url = Some(url);
        }
    }
}

/// Write configuration back to a TOML file (atomic best-effort)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = TomlConfig::default();
        assert_eq!(config.chunk_char_budget, 30_000);
        assert_eq!(config.rate_limit_per_minute, 30);
        assert!(config.budget_service_url.is_none());
    }

    #[test]
    fn roundtrip_through_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tqa.toml");

        let mut config = TomlConfig::default();
        config.chunk_char_budget = 10_000;
        config.ai.screening_model = "test-model".to_string();
        write_toml_config(&config, &path).unwrap();

        let loaded = TomlConfig::load(&path).unwrap();
        assert_eq!(loaded.chunk_char_budget, 10_000);
        assert_eq!(loaded.ai.screening_model, "test-model");
    }
}
