//! Tile-info command - show how a location maps onto the tile grid.

use terralink::config::ConfigFile;
use terralink::grid::{offset, GridGeometry, Location};

use crate::error::CliError;

/// Arguments for the tile-info command.
#[derive(Debug, Clone)]
pub struct TileInfoArgs {
    pub lat: f64,
    pub lon: f64,
    pub spacing: Option<u16>,
}

/// Run the tile-info command.
pub fn run(args: TileInfoArgs) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let layout = config.layout()?;
    let spacing = args.spacing.unwrap_or(config.terrain.spacing);
    if spacing == 0 {
        return Err(CliError::InvalidArgument("spacing must be at least 1".to_string()));
    }

    let geometry = GridGeometry::new(spacing, layout);
    let loc = Location::from_degrees(args.lat, args.lon);
    let info = geometry.resolve(&loc);
    let fragment = layout.fragment_index(info.idx_x, info.idx_y);
    let (extent_north, extent_east) = geometry.tile_extent_m();

    println!("Location:       {}", loc);
    println!("Tile:           {}", info.key);
    println!("  Degree cell:  {}, {}", info.lat_degrees, info.lon_degrees);
    println!("  Grid index:   {} north, {} east", info.grid_idx_x, info.grid_idx_y);
    println!(
        "  Layout:       {} x {} fragments ({} x {} samples)",
        layout.fragments_x(),
        layout.fragments_y(),
        layout.samples_x(),
        layout.samples_y()
    );
    println!("  Extent:       {:.0} m x {:.0} m", extent_north, extent_east);
    println!("Sample:         ({}, {})", info.idx_x, info.idx_y);
    println!("  Fraction:     ({:.3}, {:.3})", info.frac_x, info.frac_y);
    println!("  Fragment:     {} (mask bit {:#x})", fragment, 1u64 << fragment);
    println!();
    println!("Search order:");
    println!("  current     {}", info.key);
    for (north, east) in geometry.neighbour_offsets() {
        let neighbour = offset(loc, north, east);
        println!(
            "  {:+6.0} {:+6.0} {}",
            north,
            east,
            geometry.resolve(&neighbour).key
        );
    }

    Ok(())
}
