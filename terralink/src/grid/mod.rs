//! Terrain grid geometry
//!
//! Maps geographic positions onto the tile grid shared with the ground
//! station. Tiles are anchored to whole-degree references and laid out in
//! rows (north) and columns (east) with one fragment of overlap between
//! neighbours, so every point inside a tile also has its interpolation
//! neighbours inside the same tile.

mod types;


pub use types::{
    GridInfo, LayoutError, Location, TileKey, TileLayout, DEFAULT_SPACING_M, DEGREE_UNITS,
    FRAGMENT_EDGE, FRAGMENT_SAMPLES, MAX_FRAGMENTS,
};

/// Meters per 1e-7 degree of latitude.
pub const LOCATION_SCALING_FACTOR: f64 = 0.011131884502145034;

/// 1e-7 degrees of latitude per meter.
pub const LOCATION_SCALING_FACTOR_INV: f64 = 89.83204953368922;

/// Fraction of a tile extent used when probing neighbouring tiles.
///
/// Below 1.0 so lookups land well inside the neighbour even when the
/// current position sits close to a tile edge.
pub const SEARCH_OVERLAP: f64 = 0.7;

/// Shrink factor for east-west distances at the location's latitude.
#[inline]
pub fn longitude_scale(loc: &Location) -> f64 {
    loc.lat_degrees().to_radians().cos().max(0.01)
}

/// Move a location by a distance in meters.
pub fn offset(loc: Location, north_m: f64, east_m: f64) -> Location {
    let dlat = north_m * LOCATION_SCALING_FACTOR_INV;
    let dlon = east_m * LOCATION_SCALING_FACTOR_INV / longitude_scale(&loc);
    Location {
        lat: (f64::from(loc.lat) + dlat) as i32,
        lon: (f64::from(loc.lon) + dlon) as i32,
    }
}

/// Distance from `from` to `to` in meters, as `(north, east)`.
pub fn diff(from: &Location, to: &Location) -> (f64, f64) {
    let dlat = (i64::from(to.lat) - i64::from(from.lat)) as f64;
    let dlon = (i64::from(to.lon) - i64::from(from.lon)) as f64;
    (
        dlat * LOCATION_SCALING_FACTOR,
        dlon * LOCATION_SCALING_FACTOR * longitude_scale(to),
    )
}

/// Resolves locations to tiles for one sample spacing and tile layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    spacing: u16,
    layout: TileLayout,
}

impl GridGeometry {
    pub fn new(spacing: u16, layout: TileLayout) -> Self {
        Self { spacing, layout }
    }

    pub fn spacing(&self) -> u16 {
        self.spacing
    }

    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    /// Find the tile covering `loc` and the sample square inside it.
    ///
    /// Total over every `i32` pair; locations outside the globe resolve to
    /// a saturated reference rather than overflowing.
    pub fn resolve(&self, loc: &Location) -> GridInfo {
        let lat_degrees = loc.lat.div_euclid(DEGREE_UNITS);
        let lon_degrees = loc.lon.div_euclid(DEGREE_UNITS);
        let reference = Location::new(
            lat_degrees.saturating_mul(DEGREE_UNITS),
            lon_degrees.saturating_mul(DEGREE_UNITS),
        );

        let (north, east) = diff(&reference, loc);
        let spacing = f64::from(self.spacing);

        // Whole samples from the reference; negative rounding noise clamps to 0
        let idx_x = (north / spacing) as u32;
        let idx_y = (east / spacing) as u32;

        let stride_x = self.layout.stride_x() as u32;
        let stride_y = self.layout.stride_y() as u32;
        let grid_idx_x = idx_x / stride_x;
        let grid_idx_y = idx_y / stride_y;

        let origin = offset(
            reference,
            f64::from(grid_idx_x) * f64::from(stride_x) * spacing,
            f64::from(grid_idx_y) * f64::from(stride_y) * spacing,
        );

        GridInfo {
            key: TileKey::new(origin.lat, origin.lon, self.spacing),
            lat_degrees,
            lon_degrees,
            grid_idx_x,
            grid_idx_y,
            idx_x: (idx_x % stride_x) as usize,
            idx_y: (idx_y % stride_y) as usize,
            frac_x: ((north - f64::from(idx_x) * spacing) / spacing) as f32,
            frac_y: ((east - f64::from(idx_y) * spacing) / spacing) as f32,
        }
    }

    /// Tile footprint in meters as `(north, east)`.
    pub fn tile_extent_m(&self) -> (f64, f64) {
        let spacing = f64::from(self.spacing);
        (
            self.layout.samples_x() as f64 * spacing,
            self.layout.samples_y() as f64 * spacing,
        )
    }

    /// Offsets (north, east) in meters probing the eight tiles around a position.
    ///
    /// Visited x-major, both axes ascending, skipping the centre.
    pub fn neighbour_offsets(&self) -> impl Iterator<Item = (f64, f64)> {
        let (extent_x, extent_y) = self.tile_extent_m();
        (-1i8..=1)
            .flat_map(|x| (-1i8..=1).map(move |y| (x, y)))
            .filter(|&(x, y)| x != 0 || y != 0)
            .map(move |(x, y)| {
                (
                    f64::from(x) * extent_x * SEARCH_OVERLAP,
                    f64::from(y) * extent_y * SEARCH_OVERLAP,
                )
            })
    }
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self::new(DEFAULT_SPACING_M, TileLayout::STANDARD)
    }
}
