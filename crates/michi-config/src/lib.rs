//! Typed configuration for michi-mem.
//!
//! The on-disk file is JSON. Any subset of keys may be present; missing keys
//! fall back to [`MemConfig::default`] field by field, including the nested
//! `plugins.mem` table. Validation happens once, in [`MemConfig::resolve`].

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_MIN_TURNS: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be positive (got {value})")]
    NonPositive { key: &'static str, value: i64 },

    #[error("{key} is out of range (got {value})")]
    OutOfRange { key: &'static str, value: i64 },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Effective, validated configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemConfig {
    pub retention_days: u32,
    pub min_turns: u32,
    pub plugins: Plugins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plugins {
    pub mem: PluginToggle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginToggle {
    pub enabled: bool,
}

impl Default for MemConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            min_turns: DEFAULT_MIN_TURNS,
            plugins: Plugins {
                mem: PluginToggle { enabled: true },
            },
        }
    }
}

/// User-supplied configuration; every field optional.
///
/// Numbers are read as `i64` so that negative values reach validation and
/// produce a named error instead of a generic parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialConfig {
    #[serde(default)]
    pub retention_days: Option<i64>,
    #[serde(default)]
    pub min_turns: Option<i64>,
    #[serde(default)]
    pub plugins: Option<PartialPlugins>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialPlugins {
    #[serde(default)]
    pub mem: Option<PartialPluginToggle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialPluginToggle {
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl MemConfig {
    /// Overlay `partial` onto the defaults and validate the result.
    pub fn resolve(partial: PartialConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let retention_days = match partial.retention_days {
            Some(v) => positive("retention_days", v)?,
            None => defaults.retention_days,
        };
        let min_turns = match partial.min_turns {
            Some(v) => positive("min_turns", v)?,
            None => defaults.min_turns,
        };
        let enabled = partial
            .plugins
            .and_then(|p| p.mem)
            .and_then(|m| m.enabled)
            .unwrap_or(defaults.plugins.mem.enabled);

        Ok(Self {
            retention_days,
            min_turns,
            plugins: Plugins {
                mem: PluginToggle { enabled },
            },
        })
    }

    /// Load from `path`. A missing file is created with the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let defaults = Self::default();
            defaults.save(path)?;
            tracing::info!(path = %path.display(), "wrote default config");
            return Ok(defaults);
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let partial: PartialConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::resolve(partial)
    }

    /// Persist as pretty JSON via an atomic write. Creates parent dirs.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        json.push('\n');
        michi_store::write_atomic_with(path, |file| file.write_all(json.as_bytes()))
            .map_err(io_err)
    }

    pub fn mem_enabled(&self) -> bool {
        self.plugins.mem.enabled
    }
}

fn positive(key: &'static str, value: i64) -> Result<u32, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::NonPositive { key, value });
    }
    u32::try_from(value).map_err(|_| ConfigError::OutOfRange { key, value })
}
