//! CLI command implementations.
//!
//! - [`simulate`] - Fly a vehicle against a simulated ground station
//! - [`tile_info`] - Show the tile grid around a location
//! - [`config`] - Write a default configuration file

pub mod config;
pub mod simulate;
pub mod tile_info;
