//! Default values for every configuration setting.

use super::settings::*;
use crate::grid::{TileLayout, DEFAULT_SPACING_M};
use crate::logging::default_log_file;
use crate::sync::{
    SamplePolicy, DEFAULT_MAX_ELEVATION, DEFAULT_MIN_ELEVATION, DEFAULT_REQUEST_INTERVAL,
};
use crate::tile::DEFAULT_CACHE_SIZE;

/// Default minimum time between tile requests, milliseconds.
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = DEFAULT_REQUEST_INTERVAL.as_millis() as u64;

/// Default scheduling tick of the simulator, milliseconds.
pub const DEFAULT_TICK_MS: u64 = 200;

/// Default outbound byte budget per tick of the simulated link.
pub const DEFAULT_LINK_CAPACITY: usize = 256;

/// Largest accepted sample spacing, meters.
pub const MAX_SPACING_M: u16 = 10_000;

/// Largest accepted cache size, tiles.
pub const MAX_CACHE_SIZE: usize = 1024;

impl Default for ConfigFile {
    fn default() -> Self {
        let layout = TileLayout::STANDARD;
        Self {
            terrain: TerrainSettings {
                enabled: true,
                spacing: DEFAULT_SPACING_M,
                cache_size: DEFAULT_CACHE_SIZE,
                fragments_x: layout.fragments_x(),
                fragments_y: layout.fragments_y(),
                request_interval_ms: DEFAULT_REQUEST_INTERVAL_MS,
            },
            ingest: IngestSettings {
                sample_policy: SamplePolicy::Reject,
                min_elevation: DEFAULT_MIN_ELEVATION,
                max_elevation: DEFAULT_MAX_ELEVATION,
            },
            logging: LoggingSettings {
                file: super::file::config_directory()
                    .join("logs")
                    .join(default_log_file()),
            },
            simulation: SimulationSettings {
                tick_ms: DEFAULT_TICK_MS,
                link_capacity: DEFAULT_LINK_CAPACITY,
                drop_every: 0,
            },
        }
    }
}
