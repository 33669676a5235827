//! Runtime settings for terrain synchronization.

use std::time::Duration;

use super::ingest::IngestPolicy;
use super::scheduler::DEFAULT_REQUEST_INTERVAL;
use crate::grid::{GridGeometry, TileLayout, DEFAULT_SPACING_M};
use crate::tile::DEFAULT_CACHE_SIZE;

/// Settings for a [`TerrainSync`](super::TerrainSync) instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainConfig {
    /// Master switch; when off, ticks do nothing
    pub enabled: bool,
    /// Sample spacing in meters for tiles requested from the vehicle's position
    pub spacing: u16,
    /// Number of cached tiles
    pub cache_size: usize,
    /// Fragment arrangement of every tile
    pub layout: TileLayout,
    /// Minimum time between tile requests
    pub request_interval: Duration,
    /// Sample validation on ingest
    pub ingest: IngestPolicy,
}

impl TerrainConfig {
    /// Grid geometry described by these settings.
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(self.spacing, self.layout)
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            spacing: DEFAULT_SPACING_M,
            cache_size: DEFAULT_CACHE_SIZE,
            layout: TileLayout::STANDARD,
            request_interval: DEFAULT_REQUEST_INTERVAL,
            ingest: IngestPolicy::default(),
        }
    }
}
