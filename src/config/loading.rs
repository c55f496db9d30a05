//! Configuration loading functions.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::ConfigError;
use super::types::Config;

/// Project-level config file names, in search order.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".route-audit.yaml",
    ".route-audit.yml",
    ".route-audit.json",
    ".route-audit.toml",
];

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let config: Config = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseYaml {
                path: path.display().to_string(),
                source: e,
            })?,
            "json" => serde_json::from_str(&content).map_err(|e| ConfigError::ParseJson {
                path: path.display().to_string(),
                source: e,
            })?,
            "toml" => toml::from_str(&content).map_err(|e| ConfigError::ParseToml {
                path: path.display().to_string(),
                source: e,
            })?,
            _ => {
                return Err(ConfigError::UnsupportedFormat(
                    path.display().to_string(),
                    ext,
                ));
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Find the project-level config file, if any.
    pub fn find(project_root: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| project_root.join(name))
            .find(|path| path.is_file())
    }

    /// Load configuration for a project.
    ///
    /// Search order:
    /// 1. `explicit` path (from `--config`)
    /// 2. `.route-audit.{yaml,yml,json,toml}` in the project root
    /// 3. Default configuration
    ///
    /// Unlike a missing file, a present but broken file is an error: the
    /// registry drives scope decisions and must never be silently replaced.
    pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            debug!(path = %path.display(), "Loading explicit config");
            return Self::from_file(path);
        }

        match Self::find(project_root) {
            Some(path) => {
                debug!(path = %path.display(), "Loading project config");
                Self::from_file(&path)
            }
            None => {
                debug!(root = %project_root.display(), "No config file, using defaults");
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }
}
