//! Configuration management for cinescout

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub llm: LlmConfig,
    pub http: HttpConfig,
}

/// Movie catalog API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Catalog API key; falls back to `CINESCOUT_TMDB_API_KEY` then
    /// `TMDB_API_KEY` when unset
    pub api_key: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".to_string(),
            api_key: None,
        }
    }
}

impl CatalogConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("CINESCOUT_TMDB_API_KEY").ok())
            .or_else(|| std::env::var("TMDB_API_KEY").ok())
    }
}

/// LLM chat-completion API settings (OpenAI-compatible endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    /// Bearer token; falls back to `CINESCOUT_LLM_API_KEY` then
    /// `OPENROUTER_API_KEY` when unset
    pub api_key: Option<String>,
    /// Model used for per-movie summaries
    pub summary_model: String,
    /// Model used for the chat assistant
    pub chat_model: String,
    pub max_tokens: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            api_key: None,
            summary_model: "openai/gpt-4o-mini".to_string(),
            chat_model: "openai/gpt-oss-20b".to_string(),
            max_tokens: 1024,
        }
    }
}

impl LlmConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("CINESCOUT_LLM_API_KEY").ok())
            .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
    }
}

/// Shared HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds; hung external calls surface as
    /// typed timeout errors instead of waiting forever
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from the default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "cinescout") {
            let config_dir = proj_dirs.config_dir();
            std::fs::create_dir_all(config_dir)?;
            Ok(config_dir.join("config.toml"))
        } else {
            Ok(PathBuf::from("config.toml"))
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.catalog.base_url, "https://api.themoviedb.org/3");
        assert_eq!(
            config.llm.endpoint,
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [llm]
            chat_model = "openai/gpt-4o"
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.chat_model, "openai/gpt-4o");
        assert_eq!(config.llm.summary_model, "openai/gpt-4o-mini");
        assert_eq!(config.catalog.base_url, "https://api.themoviedb.org/3");
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = Config::default();
        let content = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&content).unwrap();
        assert_eq!(back.http.timeout_secs, config.http.timeout_secs);
        assert_eq!(back.llm.max_tokens, config.llm.max_tokens);
    }
}
