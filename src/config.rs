use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

pub const NOTION_API_URL: &str = "https://api.notion.com/v1/";
pub const NOTION_API_VERSION: &str = "2022-06-28";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub notion_api_key: Option<String>,
    pub notion_database_id: Option<String>,

    #[serde(default = "default_api_url")]
    pub notion_api_url: String,

    #[serde(default = "default_sync_interval")]
    pub sync_interval_minutes: u32,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_minutes: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("article-mirror");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("articles.db").to_string_lossy().to_string()
}

fn default_api_url() -> String {
    NOTION_API_URL.to_string()
}

fn default_sync_interval() -> u32 {
    10
}

fn default_cache_ttl() -> u32 {
    40
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            notion_api_key: None,
            notion_database_id: None,
            notion_api_url: default_api_url(),
            sync_interval_minutes: default_sync_interval(),
            cache_ttl_minutes: default_cache_ttl(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("article-mirror")
            .join("config.toml")
    }

    /// Environment variables win over the config file so secrets can stay out of it.
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("NOTION_API_KEY") {
            self.notion_api_key = Some(key);
        }
        if let Ok(id) = std::env::var("NOTION_DATABASE_ID") {
            self.notion_database_id = Some(id);
        }
        if let Ok(path) = std::env::var("ARTICLE_MIRROR_DB") {
            self.db_path = path;
        }
    }

    pub fn api_key(&self) -> Result<&str> {
        match self.notion_api_key.as_deref() {
            Some(key) if !key.is_empty() && !key.starts_with("your_") => Ok(key),
            _ => Err(AppError::Config(
                "NOTION_API_KEY is not properly configured".to_string(),
            )),
        }
    }

    pub fn database_id(&self) -> Result<&str> {
        self.notion_database_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Config("NOTION_DATABASE_ID is not set".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = toml::from_str(r#"notion_database_id = "db-1""#).unwrap();
        assert_eq!(config.sync_interval_minutes, 10);
        assert_eq!(config.cache_ttl_minutes, 40);
        assert_eq!(config.notion_api_url, NOTION_API_URL);
        assert_eq!(config.database_id().unwrap(), "db-1");
    }

    #[test]
    fn placeholder_api_key_is_rejected() {
        let config = Config {
            notion_api_key: Some("your_notion_key".to_string()),
            ..Config::default()
        };
        assert!(matches!(config.api_key(), Err(AppError::Config(_))));
    }
}
