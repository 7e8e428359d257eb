//! Panel configuration
//!
//! Loaded from `<config_dir>/change-logger/config.toml`. Every section is
//! optional; missing keys take their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const APP_DIR: &str = "change-logger";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{key} must be between {min} and {max} (got {value})")]
    OutOfRange {
        key: &'static str,
        min: u64,
        max: u64,
        value: u64,
    },

    #[error("telemetry.endpoint must be set when telemetry is enabled")]
    MissingEndpoint,

    #[error("Could not determine the user config directory")]
    NoConfigDir,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period before a description edit is written
    pub debounce_ms: u64,
    /// Entries allowed at once while auto-save is on
    pub capture_limit: usize,
    /// Try to switch auto-save on when a session starts
    pub enabled_on_start: bool,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            capture_limit: 20,
            enabled_on_start: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualConfig {
    /// Entries allowed at once while auto-save is off
    pub capture_limit: usize,
}

impl Default for ManualConfig {
    fn default() -> Self {
        Self { capture_limit: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangelogConfig {
    /// Title written into B1 of a fresh change log
    pub template_title: String,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            template_title: changelog::DEFAULT_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub autosave: AutosaveConfig,
    pub manual: ManualConfig,
    pub changelog: ChangelogConfig,
    pub telemetry: TelemetryConfig,
}

impl PanelConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.autosave.debounce_ms)
    }

    /// Capture limit for the current auto-save mode
    pub fn capture_limit(&self, autosave: bool) -> usize {
        if autosave {
            self.autosave.capture_limit
        } else {
            self.manual.capture_limit
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("autosave.debounce_ms", self.autosave.debounce_ms, 1, 10_000)?;
        check_range("autosave.capture_limit", self.autosave.capture_limit as u64, 1, 1000)?;
        check_range("manual.capture_limit", self.manual.capture_limit as u64, 1, 1000)?;

        let has_endpoint = self
            .telemetry
            .endpoint
            .as_deref()
            .is_some_and(|e| !e.trim().is_empty());
        if self.telemetry.enabled && !has_endpoint {
            return Err(ConfigError::MissingEndpoint);
        }
        Ok(())
    }

    /// Value of a dotted key, as shown by `clog config --get`
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "autosave.debounce_ms" => self.autosave.debounce_ms.to_string(),
            "autosave.capture_limit" => self.autosave.capture_limit.to_string(),
            "autosave.enabled_on_start" => self.autosave.enabled_on_start.to_string(),
            "manual.capture_limit" => self.manual.capture_limit.to_string(),
            "changelog.template_title" => self.changelog.template_title.clone(),
            "telemetry.enabled" => self.telemetry.enabled.to_string(),
            "telemetry.endpoint" => self.telemetry.endpoint.clone().unwrap_or_default(),
            "telemetry.api_key" => self.telemetry.api_key.clone().unwrap_or_default(),
            _ => return None,
        };
        Some(value)
    }

    pub const KEYS: &'static [&'static str] = &[
        "autosave.debounce_ms",
        "autosave.capture_limit",
        "autosave.enabled_on_start",
        "manual.capture_limit",
        "changelog.template_title",
        "telemetry.enabled",
        "telemetry.endpoint",
        "telemetry.api_key",
    ];
}

fn check_range(key: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { key, min, max, value })
    }
}

/// `<config_dir>/change-logger/config.toml`
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or(ConfigError::NoConfigDir)
}

/// Per-user data directory holding settings, logs and the default workbook
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Load from `path`; a missing file yields the defaults
pub fn load_from(path: &Path) -> Result<PanelConfig, ConfigError> {
    if !path.exists() {
        return Ok(PanelConfig::default());
    }

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: PanelConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

pub fn save_to(path: &Path, config: &PanelConfig) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let raw = toml::to_string_pretty(config)?;
    fs::write(path, raw).map_err(write_err)
}

/// Write the defaults to `path` unless a file is already there
pub fn init_if_missing(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }
    save_to(path, &PanelConfig::default())?;
    Ok(true)
}

pub fn example_config() -> &'static str {
    r#"# Change logger configuration
# Location: <config_dir>/change-logger/config.toml

[autosave]
# Quiet period before an edited description is written (1-10000 ms)
debounce_ms = 300
# Maximum captured addresses while auto-save is on (1-1000)
capture_limit = 20
# Switch auto-save on at session start when the workbook allows it
enabled_on_start = true

[manual]
# Maximum captured addresses while auto-save is off (1-1000)
capture_limit = 5

[changelog]
template_title = "Change Log - Generated by FIECON Change Logger Powerup"

[telemetry]
# Usage events are only sent when enabled and an endpoint is set
enabled = false
# endpoint = "https://example.supabase.co/rest/v1/powerup_actions"
# api_key = "..."
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PanelConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.capture_limit(true), 20);
        assert_eq!(config.capture_limit(false), 5);
        assert!(!config.telemetry.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_parses_to_defaults() {
        let parsed: PanelConfig = toml::from_str(example_config()).unwrap();
        assert_eq!(parsed, PanelConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let parsed: PanelConfig = toml::from_str("[manual]\ncapture_limit = 8\n").unwrap();
        assert_eq!(parsed.manual.capture_limit, 8);
        assert_eq!(parsed.autosave, AutosaveConfig::default());
    }

    #[test]
    fn test_validation() {
        let mut config = PanelConfig::default();
        config.autosave.debounce_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { key: "autosave.debounce_ms", .. })
        ));

        let mut config = PanelConfig::default();
        config.manual.capture_limit = 1001;
        assert!(config.validate().is_err());

        let mut config = PanelConfig::default();
        config.telemetry.enabled = true;
        assert!(matches!(config.validate(), Err(ConfigError::MissingEndpoint)));
        config.telemetry.endpoint = Some("https://telemetry.invalid/events".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert_eq!(load_from(&path).unwrap(), PanelConfig::default());
        assert!(init_if_missing(&path).unwrap());
        assert!(!init_if_missing(&path).unwrap());

        let mut config = PanelConfig::default();
        config.autosave.debounce_ms = 50;
        config.changelog.template_title = "Model changes".into();
        save_to(&path, &config).unwrap();
        assert_eq!(load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[autosave]\ncapture_limit = 0\n").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::OutOfRange { .. })));

        fs::write(&path, "[autosave\n").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_get_keys() {
        let config = PanelConfig::default();
        for key in PanelConfig::KEYS {
            assert!(config.get(key).is_some(), "{key}");
        }
        assert_eq!(config.get("nope"), None);
    }
}
