//! terralink CLI
//!
//! Drives the terralink terrain sync core against a simulated ground station.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::InitConfigArgs;
use commands::simulate::SimulateArgs;
use commands::tile_info::TileInfoArgs;

#[derive(Parser)]
#[command(name = "terralink")]
#[command(version)]
#[command(about = "Terrain tile synchronization between a vehicle and its ground station", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fly a simulated vehicle and fill its terrain cache from a simulated ground station
    Simulate {
        /// Start latitude in decimal degrees
        #[arg(long, default_value = "-35.363261", allow_negative_numbers = true)]
        lat: f64,

        /// Start longitude in decimal degrees
        #[arg(long, default_value = "149.165230", allow_negative_numbers = true)]
        lon: f64,

        /// Track over ground in degrees from north
        #[arg(long, default_value = "90")]
        heading: f64,

        /// Ground speed in m/s
        #[arg(long, default_value = "25")]
        speed: f64,

        /// Simulated flight time in seconds
        #[arg(long, default_value = "120")]
        duration: u64,

        /// Follow the wall clock instead of running as fast as possible
        #[arg(long)]
        realtime: bool,

        /// Drop every Nth fragment from the ground station (overrides config)
        #[arg(long)]
        drop_every: Option<u32>,
    },

    /// Show which tile, sample and fragment cover a location
    TileInfo {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Sample spacing in meters (defaults to the configured spacing)
        #[arg(long)]
        spacing: Option<u16>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Config file to write (default: ~/.terralink/config.ini)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            lat,
            lon,
            heading,
            speed,
            duration,
            realtime,
            drop_every,
        } => commands::simulate::run(SimulateArgs {
            lat,
            lon,
            heading_deg: heading,
            speed_mps: speed,
            duration_secs: duration,
            realtime,
            drop_every,
        }),
        Commands::TileInfo { lat, lon, spacing } => {
            commands::tile_info::run(TileInfoArgs { lat, lon, spacing })
        }
        Commands::InitConfig { path, force } => {
            commands::config::run(InitConfigArgs { path, force })
        }
    };

    if let Err(e) = result {
        e.exit();
    }
}
