//! Configuration management.
//!
//! s7s configuration can come from:
//! - Environment variables (S7S_*)
//! - Config file (~/.config/s7s/config.toml)
//!
//! All timing knobs are milliseconds. [`Config::validate`] enforces
//! floor values so a typo in the config file cannot disable the
//! timeout or rate-limit protections entirely.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// s7s configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Security gate configuration
    #[serde(default)]
    pub security: SecurityConfig,

    /// Execution configuration
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Catalog cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Security gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Maximum serialized input size in bytes
    #[serde(default = "default_max_input_size")]
    pub max_input_size: usize,

    /// Shortcut names that are always rejected
    #[serde(default)]
    pub blocked_shortcuts: Vec<String>,

    /// If non-empty, only shortcut names matching one of these prefixes
    /// may be executed
    #[serde(default)]
    pub allowed_prefixes: Vec<String>,

    /// Allow executing shortcuts classified as system-level
    #[serde(default)]
    pub allow_system_shortcuts: bool,

    /// Rate limiting window in milliseconds
    #[serde(default = "default_rate_window_ms")]
    pub rate_window_ms: u64,

    /// Maximum requests per client within the window
    #[serde(default = "default_rate_max_requests")]
    pub rate_max_requests: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_size: default_max_input_size(),
            blocked_shortcuts: Vec::new(),
            allowed_prefixes: Vec::new(),
            allow_system_shortcuts: false,
            rate_window_ms: default_rate_window_ms(),
            rate_max_requests: default_rate_max_requests(),
        }
    }
}

fn default_max_input_size() -> usize {
    1024 * 1024
}

fn default_rate_window_ms() -> u64 {
    60_000
}

fn default_rate_max_requests() -> usize {
    60
}

/// Execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Default per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Upper bound for per-request timeout overrides
    #[serde(default = "default_max_execution_ms")]
    pub max_execution_ms: u64,

    /// Path to the `shortcuts` binary
    #[serde(default = "default_shortcuts_bin")]
    pub shortcuts_bin: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            max_execution_ms: default_max_execution_ms(),
            shortcuts_bin: default_shortcuts_bin(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_execution_ms() -> u64 {
    120_000
}

fn default_shortcuts_bin() -> String {
    "shortcuts".to_string()
}

/// Catalog cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for catalog listings in milliseconds
    #[serde(default = "default_cache_ttl_ms")]
    pub list_ttl_ms: u64,

    /// Time-to-live for composed shortcut info in milliseconds
    #[serde(default = "default_cache_ttl_ms")]
    pub info_ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            list_ttl_ms: default_cache_ttl_ms(),
            info_ttl_ms: default_cache_ttl_ms(),
        }
    }
}

fn default_cache_ttl_ms() -> u64 {
    300_000
}

impl Config {
    /// Load configuration from default locations.
    pub fn load() -> Self {
        let mut config = Self::default();

        let primary_path = Self::config_dir().join("config.toml");
        if let Ok(partial) = Self::load_partial_from_path(&primary_path) {
            config.apply_partial(partial);
        }

        config.apply_env_overrides();
        config
    }

    /// Get the config directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("s7s"))
            .unwrap_or_else(|| PathBuf::from(".s7s"))
    }

    /// Enforce floor values on the protection knobs.
    ///
    /// Rejects configurations that would effectively disable the
    /// timeout, input-size, or rate-limit guards.
    pub fn validate(&self) -> Result<()> {
        if self.execution.default_timeout_ms < 1000 {
            return Err(Error::Config(
                "execution.default_timeout_ms must be >= 1000".to_string(),
            ));
        }
        if self.execution.max_execution_ms < self.execution.default_timeout_ms {
            return Err(Error::Config(
                "execution.max_execution_ms must be >= default_timeout_ms".to_string(),
            ));
        }
        if self.security.max_input_size < 1024 {
            return Err(Error::Config(
                "security.max_input_size must be >= 1024".to_string(),
            ));
        }
        if self.security.rate_window_ms < 1000 {
            return Err(Error::Config(
                "security.rate_window_ms must be >= 1000".to_string(),
            ));
        }
        if self.security.rate_max_requests < 1 {
            return Err(Error::Config(
                "security.rate_max_requests must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("S7S_DEFAULT_TIMEOUT_MS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.execution.default_timeout_ms = parsed;
            }
        }
        if let Ok(v) = std::env::var("S7S_MAX_INPUT_SIZE") {
            if let Ok(parsed) = v.parse::<usize>() {
                self.security.max_input_size = parsed;
            }
        }
        if let Ok(v) = std::env::var("S7S_SHORTCUTS_BIN") {
            self.execution.shortcuts_bin = v;
        }
        if let Ok(v) = std::env::var("S7S_ALLOW_SYSTEM_SHORTCUTS") {
            self.security.allow_system_shortcuts = v.to_lowercase() == "true";
        }
        if let Ok(v) = std::env::var("S7S_BLOCKED_SHORTCUTS") {
            self.security.blocked_shortcuts = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("S7S_ALLOWED_PREFIXES") {
            self.security.allowed_prefixes = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("S7S_CACHE_TTL_MS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.cache.list_ttl_ms = parsed;
                self.cache.info_ttl_ms = parsed;
            }
        }
    }

    fn load_partial_from_path(path: &Path) -> std::result::Result<PartialConfig, ()> {
        let content = std::fs::read_to_string(path).map_err(|_| ())?;
        toml::from_str(&content).map_err(|_| ())
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(security) = partial.security {
            self.security = security;
        }
        if let Some(execution) = partial.execution {
            self.execution = execution;
        }
        if let Some(cache) = partial.cache {
            self.cache = cache;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    security: Option<SecurityConfig>,
    execution: Option<ExecutionConfig>,
    cache: Option<CacheConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.execution.default_timeout_ms, 30_000);
        assert_eq!(config.security.rate_max_requests, 60);
        assert!(!config.security.allow_system_shortcuts);
    }

    #[test]
    fn test_timeout_floor() {
        let mut config = Config::default();
        config.execution.default_timeout_ms = 500;
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_input_size_floor() {
        let mut config = Config::default();
        config.security.max_input_size = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rate_limit_floors() {
        let mut config = Config::default();
        config.security.rate_window_ms = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.security.rate_max_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_merge() {
        let mut config = Config::default();
        let partial: PartialConfig = toml::from_str(
            r#"
            [security]
            max_input_size = 4096
            blocked_shortcuts = ["Wipe Disk"]
            "#,
        )
        .unwrap();
        config.apply_partial(partial);
        assert_eq!(config.security.max_input_size, 4096);
        assert_eq!(config.security.blocked_shortcuts, vec!["Wipe Disk"]);
        // Untouched sections keep defaults
        assert_eq!(config.execution.default_timeout_ms, 30_000);
    }
}
