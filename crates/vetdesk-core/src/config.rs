//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the API
//! base endpoint, request timeout, where session tokens are persisted, and
//! the last email used to log in.
//!
//! Configuration is stored at `~/.config/vetdesk/config.json`. The base
//! endpoint can be overridden with `VETDESK_API_URL`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileStorage, KeyringStorage, MemoryStorage, TokenStorage};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "vetdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Session token file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Local development backend, versioned API prefix included
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Environment variable overriding the base endpoint
pub const API_URL_ENV: &str = "VETDESK_API_URL";

/// HTTP request timeout in seconds.
/// Generous enough for a backend waking from a cold start.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where session tokens are kept between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub storage: StorageKind,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            storage: StorageKind::default(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load config from disk, then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_url = url.trim().to_string();
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Build the configured token storage backend
    pub fn token_storage(&self) -> Result<Arc<dyn TokenStorage>> {
        let storage: Arc<dyn TokenStorage> = match self.storage {
            StorageKind::File => Arc::new(FileStorage::new(self.cache_dir()?.join(SESSION_FILE))),
            StorageKind::Keyring => Arc::new(KeyringStorage::new()),
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
        };
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://localhost:8000/api/v1");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.storage, StorageKind::File);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api_url":"https://api.example.com/api/v1","storage":"keyring"}"#)
                .unwrap();
        assert_eq!(config.api_url, "https://api.example.com/api/v1");
        assert_eq!(config.storage, StorageKind::Keyring);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.last_email, None);
    }

    #[test]
    fn test_memory_storage_needs_no_directories() {
        let config = Config {
            storage: StorageKind::Memory,
            ..Config::default()
        };
        let storage = config.token_storage().unwrap();
        storage.set("token", "A1").unwrap();
        assert_eq!(storage.get("token").unwrap().as_deref(), Some("A1"));
    }
}
