//! Configuration file handling for ~/.terralink/config.ini.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::settings::ConfigFile;
use crate::grid::{LayoutError, TileLayout};
use crate::sync::{IngestPolicy, TerrainConfig};

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Fragment counts that do not form a usable tile
    #[error("Invalid tile layout: {0}")]
    Layout(#[from] LayoutError),

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.terralink/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Write the default config to `path` unless a file is already there.
    ///
    /// Returns whether a file was written.
    pub fn ensure_exists_at(path: &Path) -> Result<bool, ConfigFileError> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        Self::ensure_exists_at(&path)?;
        Ok(path)
    }

    /// Tile layout named by `[terrain]`.
    pub fn layout(&self) -> Result<TileLayout, ConfigFileError> {
        Ok(TileLayout::new(
            self.terrain.fragments_x,
            self.terrain.fragments_y,
        )?)
    }

    /// Runtime settings for a terrain sync instance.
    pub fn to_terrain_config(&self) -> Result<TerrainConfig, ConfigFileError> {
        Ok(TerrainConfig {
            enabled: self.terrain.enabled,
            spacing: self.terrain.spacing,
            cache_size: self.terrain.cache_size,
            layout: self.layout()?,
            request_interval: Duration::from_millis(self.terrain.request_interval_ms),
            ingest: IngestPolicy {
                sample_policy: self.ingest.sample_policy,
                min_elevation: self.ingest.min_elevation,
                max_elevation: self.ingest.max_elevation,
            },
        })
    }
}

/// Path to the config directory (~/.terralink).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".terralink")
}

/// Path to the config file (~/.terralink/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
