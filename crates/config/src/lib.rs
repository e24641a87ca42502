#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for curie
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/curie/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;

use curie_errors::{ConfigError, Error};
use curie_types::ApiKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Signed URL API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Never written back to disk by curie itself
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
}

/// Local asset cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: Option<PathBuf>,
    #[serde(default = "default_extension")]
    pub extension: String,
}

// Default implementations

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: 300, // 5 minutes
            connect_timeout: 30,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            extension: default_extension(),
        }
    }
}

// Default value functions for serde
fn default_endpoint() -> String {
    constants::DEFAULT_SIGNURL_ENDPOINT.to_string()
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_extension() -> String {
    constants::DEFAULT_ASSET_EXTENSION.to_string()
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join(constants::APP_DIR).join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ConfigError::NotFound {
                    path: path.display().to_string(),
                },
                _ => ConfigError::ReadError {
                    path: path.display().to_string(),
                    error: e.to_string(),
                },
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if fs::try_exists(&config_path).await.unwrap_or(false) {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!("no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// If path is provided, loads from that file.
    /// If path is None, uses the default loading behavior.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // CURIE_API_KEY
        if let Ok(key) = std::env::var("CURIE_API_KEY") {
            if !key.is_empty() {
                self.api.api_key = Some(key);
            }
        }

        // CURIE_API_ENDPOINT
        if let Ok(endpoint) = std::env::var("CURIE_API_ENDPOINT") {
            self.api.endpoint = endpoint;
        }

        // CURIE_CACHE_DIR
        if let Ok(dir) = std::env::var("CURIE_CACHE_DIR") {
            self.cache.dir = Some(PathBuf::from(dir));
        }

        // CURIE_TIMEOUT
        if let Ok(timeout) = std::env::var("CURIE_TIMEOUT") {
            self.network.timeout = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                field: "CURIE_TIMEOUT".to_string(),
                value: timeout,
            })?;
        }

        self.validate()
    }

    /// Check values that serde cannot
    ///
    /// # Errors
    ///
    /// Returns an error if the asset extension is empty or not a plain
    /// alphanumeric suffix, or if a network timeout is zero.
    pub fn validate(&self) -> Result<(), Error> {
        for (field, value) in [
            ("network.timeout", self.network.timeout),
            ("network.connect_timeout", self.network.connect_timeout),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                }
                .into());
            }
        }

        let ext = &self.cache.extension;
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::InvalidValue {
                field: "cache.extension".to_string(),
                value: ext.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Get the API key
    ///
    /// # Errors
    ///
    /// Returns an error if no key was configured in the file or environment.
    pub fn api_key(&self) -> Result<ApiKey, Error> {
        self.api
            .api_key
            .as_deref()
            .map(ApiKey::new)
            .ok_or_else(|| {
                ConfigError::MissingField {
                    field: "api.api_key".to_string(),
                }
                .into()
            })
    }

    /// Get the cache directory (with default)
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is configured and the per-user data
    /// directory cannot be determined.
    pub fn cache_dir(&self) -> Result<PathBuf, Error> {
        if let Some(dir) = &self.cache.dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir().ok_or_else(|| ConfigError::MissingField {
            field: "cache.dir".to_string(),
        })?;
        Ok(data_dir.join(constants::APP_DIR).join(constants::ASSETS_DIR))
    }

    /// Request timeout as a `Duration`
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout)
    }

    /// Connect timeout as a `Duration`
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.network.connect_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.api.endpoint,
            "https://api.curie.io/public/products/signurl"
        );
        assert_eq!(config.cache.extension, "usdz");
        assert_eq!(config.timeout(), Duration::from_secs(300));
        assert!(config.api_key().is_err());
    }

    #[test]
    fn test_explicit_cache_dir_wins() {
        let mut config = Config::default();
        config.cache.dir = Some(PathBuf::from("/srv/assets"));
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/srv/assets"));
    }

    #[test]
    fn test_rejects_bad_extension() {
        let mut config = Config::default();
        config.cache.extension = "../x".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = Config::default();
        config.api.api_key = Some("secret".to_string());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("secret"));
    }
}
