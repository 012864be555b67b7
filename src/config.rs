//! Configuration loading for sitewide-comment-control
//!
//! Supports TOML configuration with embedded defaults. The moderation lists
//! themselves live in the settings store, not here.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::ConfigError;

/// General configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable audit logging
    pub audit_log: bool,

    /// Path to audit log file
    pub audit_path: Option<String>,

    /// Path to the JSON settings store
    pub store_path: String,

    /// Classify and log, but never act
    pub dry_run: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            audit_log: true,
            audit_path: Some("~/.local/share/sitewide-comment-control/audit.jsonl".to_string()),
            store_path: "~/.local/share/sitewide-comment-control/settings.json".to_string(),
            dry_run: false,
        }
    }
}

/// The host's own disallowed-comment keys
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DisallowedConfig {
    /// One key per entry; matched case-insensitively anywhere in a comment
    pub keys: Vec<String>,
}

/// Administrative surface configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Anti-forgery token required by `--update-rules`; unset rejects updates
    pub token: Option<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub disallowed: DisallowedConfig,
    pub admin: AdminConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load() -> Self {
        // Try to load from standard locations
        let config_paths = [
            // User-specific config
            dirs::config_dir().map(|p| p.join("sitewide-comment-control/config.toml")),
            // System-wide config
            Some(PathBuf::from("/etc/sitewide-comment-control/config.toml")),
        ];

        for path in config_paths.into_iter().flatten() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "ignoring unusable config");
                    }
                }
            }
        }

        // Return defaults
        Config::default()
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Expand ~ in path strings
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get the audit log path (expanded), if audit logging is on
    pub fn audit_path(&self) -> Option<PathBuf> {
        if !self.general.audit_log {
            return None;
        }
        self.general.audit_path.as_ref().map(|p| Self::expand_path(p))
    }

    /// Get the settings store path (expanded)
    pub fn store_path(&self) -> PathBuf {
        Self::expand_path(&self.general.store_path)
    }
}

/// Embedded default configuration
pub const DEFAULT_CONFIG_TOML: &str = r#"
[general]
audit_log = true
audit_path = "~/.local/share/sitewide-comment-control/audit.jsonl"
store_path = "~/.local/share/sitewide-comment-control/settings.json"
dry_run = false

[disallowed]
keys = []

[admin]
# token = "change-me"
"#;
