//! User configuration.
//!
//! Settings are read from `~/.terralink/config.ini`; every key is optional
//! and falls back to its default.
//!
//! ```ignore
//! use terralink::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! let terrain = config.to_terrain_config()?;
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{
    DEFAULT_LINK_CAPACITY, DEFAULT_REQUEST_INTERVAL_MS, DEFAULT_TICK_MS, MAX_CACHE_SIZE,
    MAX_SPACING_M,
};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, IngestSettings, LoggingSettings, SimulationSettings, TerrainSettings};
