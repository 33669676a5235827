//! CLI runner for common setup.
//!
//! Loads the configuration and initializes logging for commands that run
//! the sync loop.

use std::path::Path;

use tracing::info;

use terralink::config::ConfigFile;
use terralink::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard};

use crate::error::CliError;

/// Keeps logging alive and holds the loaded configuration.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Load config (or defaults) and start logging to the configured file.
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let log_path = &config.logging.file;
        let log_dir = log_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(default_log_dir);
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| default_log_file().to_string());

        let logging_guard =
            init_logging(&log_dir, &log_file).map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("terralink v{}", terralink::VERSION);
        info!("terralink CLI: {} command", command);
        info!(log_file = %self.config.logging.file.display(), "Logging to file");
    }
}
