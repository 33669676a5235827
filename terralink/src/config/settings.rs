//! Settings structs for each configuration section.
//!
//! One struct per `[section]` of the INI file. Pure data; parsing lives in
//! [`super::parser`] and serialization in [`super::writer`].

use std::path::PathBuf;

use crate::sync::SamplePolicy;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub terrain: TerrainSettings,
    pub ingest: IngestSettings,
    pub logging: LoggingSettings,
    pub simulation: SimulationSettings,
}

/// `[terrain]`: cache geometry and request pacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainSettings {
    pub enabled: bool,
    /// Sample spacing in meters
    pub spacing: u16,
    /// Number of cached tiles
    pub cache_size: usize,
    /// Fragments per tile along the north axis
    pub fragments_x: u8,
    /// Fragments per tile along the east axis
    pub fragments_y: u8,
    /// Minimum milliseconds between tile requests
    pub request_interval_ms: u64,
}

/// `[ingest]`: elevation sample validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSettings {
    pub sample_policy: SamplePolicy,
    pub min_elevation: u16,
    pub max_elevation: u16,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

/// `[simulation]`: the CLI's simulated link and ground station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSettings {
    /// Milliseconds between scheduling ticks
    pub tick_ms: u64,
    /// Outbound bytes the link accepts per tick
    pub link_capacity: usize,
    /// Drop every Nth fragment from the ground station (0 = never)
    pub drop_every: u32,
}
