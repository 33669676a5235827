//! Terralink - terrain tile synchronization for autonomous vehicles
//!
//! The vehicle keeps a small cache of elevation tiles and fills it from its
//! ground control station over a slow, lossy link. Each tile is split into
//! fragments that travel one per message; a 64-bit bitmap per tile tracks
//! which have arrived.
//!
//! # High-Level API
//!
//! [`sync::TerrainSync`] is the entry point:
//!
//! ```ignore
//! use std::sync::Arc;
//! use terralink::sync::{TerrainConfig, TerrainSync};
//! use terralink::time::SystemClock;
//!
//! let mut sync = TerrainSync::in_memory(TerrainConfig::default(), Arc::new(SystemClock::new()));
//!
//! // Periodically
//! sync.send_request(&position, &mut link);
//!
//! // For every message from the ground station
//! sync.handle_message(&message, &mut link);
//! ```

pub mod config;
pub mod grid;
pub mod logging;
pub mod position;
pub mod protocol;
pub mod sim;
pub mod sync;
pub mod tile;
pub mod time;

/// Version of the terralink library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
