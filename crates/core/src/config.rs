use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const APP_NAME: &str = "ynab-converter";
const CONFIG_FILE: &str = "config.toml";
const PRESETS_FILE: &str = "presets.json";
const EXPORT_DIR: &str = "ynab-exports";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("No configuration directory available on this platform")]
    NoConfigDir,
}

/// Persisted user settings: which preset is active and where exports go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub active_preset: Option<String>,
    pub export_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active_preset: None,
            export_path: default_export_path(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io(e),
        })?;
        Self::from_toml(&content)
    }

    /// Writes the config, creating missing parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Loads the config at `path`, writing the defaults there first if absent.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }
}

/// `~/Downloads/ynab-exports`, or a relative `ynab-exports` when no home
/// directory can be determined.
pub fn default_export_path() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join("Downloads").join(EXPORT_DIR))
        .unwrap_or_else(|| PathBuf::from(EXPORT_DIR))
}

pub fn config_dir() -> Result<PathBuf, ConfigError> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(ConfigError::NoConfigDir)
}

pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

pub fn presets_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(PRESETS_FILE))
}
