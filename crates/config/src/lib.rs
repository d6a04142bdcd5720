//! Configuration loading, validation, and management for pocketline.
//!
//! Loads configuration from `~/.pocketline/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! This is process configuration (where data lives, pacing, limits). The
//! in-app settings the user edits (API endpoint, persona) are domain state
//! and live in the store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.pocketline/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where `settings.json` and `characters.json` live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// API key fallback, used when the in-app settings carry none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model fallback, used when the in-app settings carry none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature for every completion
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP client timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// History cutoff for newly created characters
    #[serde(default = "default_history_limit")]
    pub default_history_limit: usize,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    /// Returned by model listing when the endpoint cannot be queried
    #[serde(default = "default_fallback_models")]
    pub fallback_models: Vec<String>,
}

fn default_temperature() -> f32 {
    0.8
}
fn default_request_timeout() -> u64 {
    120
}
fn default_history_limit() -> usize {
    20
}
fn default_fallback_models() -> Vec<String> {
    vec![
        "gpt-4o-mini".into(),
        "gpt-4o".into(),
        "deepseek-chat".into(),
        "claude-3-5-sonnet".into(),
    ]
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("data_dir", &self.data_dir)
            .field(
                "api_key",
                &match self.api_key {
                    Some(_) => "[REDACTED]",
                    None => "None",
                },
            )
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("default_history_limit", &self.default_history_limit)
            .field("delivery", &self.delivery)
            .field("backup", &self.backup)
            .field("summary", &self.summary)
            .field("fallback_models", &self.fallback_models)
            .finish()
    }
}

/// Bubble pacing: a short "read" pause, then a slower typing cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_first_delay")]
    pub first_delay_ms: u64,

    #[serde(default = "default_step_delay")]
    pub step_delay_ms: u64,
}

fn default_first_delay() -> u64 {
    600
}
fn default_step_delay() -> u64 {
    1500
}

impl DeliveryConfig {
    pub fn first_delay(&self) -> Duration {
        Duration::from_millis(self.first_delay_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            first_delay_ms: default_first_delay(),
            step_delay_ms: default_step_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Most recent messages kept per list on export
    #[serde(default = "default_message_cap")]
    pub message_cap: usize,
}

fn default_message_cap() -> usize {
    50
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            message_cap: default_message_cap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Messages read by one summarization when a character sets no scope
    #[serde(default = "default_summary_scope")]
    pub default_scope: usize,
}

fn default_summary_scope() -> usize {
    30
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            default_scope: default_summary_scope(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.pocketline/config.toml).
    ///
    /// Environment overrides:
    /// - `POCKETLINE_DATA_DIR`
    /// - `POCKETLINE_API_KEY`
    /// - `POCKETLINE_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(dir) = std::env::var("POCKETLINE_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if config.api_key.is_none() {
            config.api_key = std::env::var("POCKETLINE_API_KEY").ok();
        }

        if let Ok(model) = std::env::var("POCKETLINE_MODEL") {
            config.model = Some(model);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".pocketline")
    }

    /// Effective data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("data"))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.default_history_limit == 0 {
            return Err(ConfigError::ValidationError(
                "default_history_limit must be at least 1".into(),
            ));
        }

        if self.backup.message_cap == 0 {
            return Err(ConfigError::ValidationError(
                "backup.message_cap must be at least 1".into(),
            ));
        }

        if self.summary.default_scope == 0 {
            return Err(ConfigError::ValidationError(
                "summary.default_scope must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            api_key: None,
            model: None,
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
            default_history_limit: default_history_limit(),
            delivery: DeliveryConfig::default(),
            backup: BackupConfig::default(),
            summary: SummaryConfig::default(),
            fallback_models: default_fallback_models(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
