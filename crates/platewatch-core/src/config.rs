//! Configuration management for platewatch.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::provider::Provider;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
///
/// Loaded from `~/.config/platewatch/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fleet backend connection settings
    pub backend: BackendConfig,
    /// Engine concurrency and timeout settings
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `PLATEWATCH_BASE_URL`: Override the backend base URL
    /// - `PLATEWATCH_GLOBAL_CONCURRENCY`: Override the global fetch cap
    /// - `PLATEWATCH_SINK_CONCURRENCY`: Override the sink dispatch cap
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;

        if let Ok(val) = std::env::var("PLATEWATCH_BASE_URL") {
            if !val.is_empty() {
                tracing::debug!("Override backend.base_url from env");
                config.backend.base_url = val;
            }
        }

        if let Ok(val) = std::env::var("PLATEWATCH_GLOBAL_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                config.engine.global_concurrency = n;
                tracing::debug!("Override engine.global_concurrency from env: {}", n);
            }
        }

        if let Ok(val) = std::env::var("PLATEWATCH_SINK_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                config.engine.sink_concurrency = n;
                tracing::debug!("Override engine.sink_concurrency from env: {}", n);
            }
        }

        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/platewatch/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "platewatch", "platewatch").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Fleet backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the fleet backend API
    pub base_url: String,
    /// Sign-in email
    pub email: String,
    /// Sign-in password
    pub password: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fleet.example.com/api".to_string(),
            email: String::new(),
            password: String::new(),
        }
    }
}

/// Engine concurrency and timeout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Global cap on concurrent provider requests. `0` sizes the cap from
    /// the machine: twice the available parallelism.
    pub global_concurrency: usize,
    /// Cap on concurrent sink submissions
    pub sink_concurrency: usize,
    /// Wall-clock budget for ad hoc single-plate lookups, in seconds
    pub lookup_timeout_secs: u64,
    /// Providers enabled for bulk runs. An empty list enables all of them.
    pub providers: Vec<Provider>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            global_concurrency: 0,
            sink_concurrency: 4,
            lookup_timeout_secs: 120,
            providers: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Resolve the global concurrency cap, sizing from the machine when
    /// configured as `0`.
    #[must_use]
    pub fn global_permits(&self) -> usize {
        if self.global_concurrency > 0 {
            return self.global_concurrency;
        }
        let parallelism = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(4);
        parallelism * 2
    }

    /// Lookup timeout as a [`Duration`].
    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    /// Providers bulk runs should sweep, in configured order.
    #[must_use]
    pub fn enabled_providers(&self) -> Vec<Provider> {
        if self.providers.is_empty() {
            Provider::ALL.to_vec()
        } else {
            self.providers.clone()
        }
    }
}
