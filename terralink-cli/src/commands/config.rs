//! Init-config command - write a default configuration file.

use std::path::PathBuf;

use terralink::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Arguments for the init-config command.
#[derive(Debug, Clone, Default)]
pub struct InitConfigArgs {
    /// Target file; defaults to ~/.terralink/config.ini
    pub path: Option<PathBuf>,
    /// Overwrite an existing file
    pub force: bool,
}

/// Run the init-config command.
pub fn run(args: InitConfigArgs) -> Result<(), CliError> {
    let path = args.path.unwrap_or_else(config_file_path);

    if args.force {
        ConfigFile::default().save_to(&path)?;
    } else if !ConfigFile::ensure_exists_at(&path)? {
        return Err(CliError::ConfigExists(path));
    }

    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
