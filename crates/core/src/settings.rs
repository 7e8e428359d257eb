//! Local key-value settings
//!
//! Holds per-user preferences (initials, fill colour). Keys can be
//! namespaced with a partition prefix so several panels sharing one backing
//! store do not see each other's values.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// User initials
pub const INITIALS_KEY: &str = "pwrups_user_initials";

/// Fill colour applied to inserted change-log rows
pub const FILL_COLOUR_KEY: &str = "pwrups_fill_col";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// String key-value storage
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

fn partitioned(partition: Option<&str>, key: &str) -> String {
    match partition {
        Some(prefix) => format!("{}{}", prefix, key),
        None => key.to_string(),
    }
}

/// Volatile settings, used by tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemorySettings {
    partition: Option<String>,
    values: RwLock<BTreeMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partition(partition: impl Into<String>) -> Self {
        Self {
            partition: Some(partition.into()),
            values: RwLock::default(),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let key = partitioned(self.partition.as_deref(), key);
        Ok(self.values.read().get(&key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let key = partitioned(self.partition.as_deref(), key);
        self.values.write().insert(key, value.to_string());
        Ok(())
    }
}

/// Settings persisted as a flat JSON object
pub struct FileSettings {
    path: PathBuf,
    partition: Option<String>,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileSettings {
    /// Open the settings file, starting empty if it does not exist yet
    pub fn open(path: &Path, partition: Option<String>) -> Result<Self, SettingsError> {
        let values = match std::fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| SettingsError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            partition,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write to a sibling temp file, then rename over the target
    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let text = serde_json::to_string_pretty(values).map_err(|source| SettingsError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let key = partitioned(self.partition.as_deref(), key);
        Ok(self.values.read().get(&key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let key = partitioned(self.partition.as_deref(), key);
        let mut values = self.values.write();
        values.insert(key, value.to_string());
        self.persist(&values)
    }
}

/// Random fully-saturated colour as `#rrggbb`
pub fn random_vibrant_colour() -> String {
    use rand::Rng;
    let hue = rand::thread_rng().gen_range(0..360);
    hsl_to_hex(hue as f64, 100.0, 50.0)
}

/// Convert HSL (hue in degrees, saturation and lightness in percent) to `#rrggbb`
pub fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    let l = l / 100.0;
    let a = s * l.min(1.0 - l) / 100.0;
    let channel = |n: f64| {
        let k = (n + h / 30.0) % 12.0;
        let colour = l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0);
        (255.0 * colour).round() as u8
    };
    format!("#{:02x}{:02x}{:02x}", channel(0.0), channel(8.0), channel(4.0))
}
