//! CLI error handling with user-friendly messages.
//!
//! Centralizes error formatting and exit codes for every command.

use std::fmt;
use std::path::PathBuf;
use std::process;

use terralink::config::ConfigFileError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read, parsed or written
    Config(ConfigFileError),
    /// Command-line argument out of range
    InvalidArgument(String),
    /// Config file already present and --force not given
    ConfigExists(PathBuf),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigFileError::InvalidValue { .. })
            | CliError::Config(ConfigFileError::Layout(_)) => {
                eprintln!();
                eprintln!("Fix the value in the config file, or regenerate it with:");
                eprintln!("  terralink init-config --force");
            }
            CliError::ConfigExists(_) => {
                eprintln!();
                eprintln!("Use --force to overwrite it with defaults.");
            }
            _ => {}
        }

        let code = match self {
            CliError::InvalidArgument(_) => 2,
            _ => 1,
        };
        process::exit(code)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::ConfigExists(path) => {
                write!(f, "Config file already exists: {}", path.display())
            }
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}
