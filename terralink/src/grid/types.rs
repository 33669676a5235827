//! Grid type definitions

use std::fmt;

use thiserror::Error;

/// Edge length of one fragment in samples. Fixed by the wire format.
pub const FRAGMENT_EDGE: usize = 4;

/// Number of elevation samples carried by one fragment.
pub const FRAGMENT_SAMPLES: usize = FRAGMENT_EDGE * FRAGMENT_EDGE;

/// Fragment indices on the wire are always below this value.
pub const MAX_FRAGMENTS: u8 = 56;

/// Default distance between two adjacent samples, in meters.
pub const DEFAULT_SPACING_M: u16 = 100;

/// Units of the integer coordinate representation (1e-7 degrees).
pub const DEGREE_UNITS: i32 = 10_000_000;

/// Geographic position in 1e-7 degree units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location {
    /// Latitude, positive north
    pub lat: i32,
    /// Longitude, positive east
    pub lon: i32,
}

impl Location {
    /// Create a location from 1e-7 degree units.
    pub const fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }

    /// Create a location from decimal degrees.
    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        Self {
            lat: (lat * f64::from(DEGREE_UNITS)).round() as i32,
            lon: (lon * f64::from(DEGREE_UNITS)).round() as i32,
        }
    }

    /// Whether the location lies within ±90° latitude and ±180° longitude.
    pub fn is_valid(&self) -> bool {
        (-90 * DEGREE_UNITS..=90 * DEGREE_UNITS).contains(&self.lat)
            && (-180 * DEGREE_UNITS..=180 * DEGREE_UNITS).contains(&self.lon)
    }

    /// Latitude in decimal degrees.
    pub fn lat_degrees(&self) -> f64 {
        f64::from(self.lat) / f64::from(DEGREE_UNITS)
    }

    /// Longitude in decimal degrees.
    pub fn lon_degrees(&self) -> f64 {
        f64::from(self.lon) / f64::from(DEGREE_UNITS)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.7}, {:.7}", self.lat_degrees(), self.lon_degrees())
    }
}

/// Identity of one tile: its south-west origin and sample spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Origin latitude (1e-7 degrees)
    pub lat: i32,
    /// Origin longitude (1e-7 degrees)
    pub lon: i32,
    /// Sample spacing in meters
    pub spacing: u16,
}

impl TileKey {
    pub const fn new(lat: i32, lon: i32, spacing: u16) -> Self {
        Self { lat, lon, spacing }
    }

    /// The tile origin as a location.
    pub fn origin(&self) -> Location {
        Location::new(self.lat, self.lon)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}m", self.origin(), self.spacing)
    }
}

/// Fragment arrangement of a tile.
///
/// A tile is `fragments_x × fragments_y` fragments, each [`FRAGMENT_EDGE`]
/// samples square. `x` runs north and `y` runs east. Fragment `i` sits at
/// sample offset `((i / fragments_y) * 4, (i % fragments_y) * 4)`, which makes
/// the completion bitmap row-major over fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileLayout {
    fragments_x: u8,
    fragments_y: u8,
}

impl TileLayout {
    /// 7 × 8 fragments (28 × 32 samples), the standard block.
    pub const STANDARD: Self = Self {
        fragments_x: 7,
        fragments_y: 8,
    };

    /// Create a validated layout.
    ///
    /// Both dimensions need at least two fragments since adjacent tiles
    /// overlap by one fragment row and column.
    pub fn new(fragments_x: u8, fragments_y: u8) -> Result<Self, LayoutError> {
        if fragments_x < 2 || fragments_y < 2 {
            return Err(LayoutError::TooNarrow {
                fragments_x,
                fragments_y,
            });
        }
        let count = u16::from(fragments_x) * u16::from(fragments_y);
        if count > u16::from(MAX_FRAGMENTS) {
            return Err(LayoutError::TooManyFragments { count });
        }
        Ok(Self {
            fragments_x,
            fragments_y,
        })
    }

    pub fn fragments_x(&self) -> u8 {
        self.fragments_x
    }

    pub fn fragments_y(&self) -> u8 {
        self.fragments_y
    }

    /// Total fragments in one tile.
    pub fn fragment_count(&self) -> u8 {
        self.fragments_x * self.fragments_y
    }

    /// Bitmap value with one bit set per fragment.
    #[inline]
    pub fn full_mask(&self) -> u64 {
        (1u64 << self.fragment_count()) - 1
    }

    /// Samples along x (north).
    pub fn samples_x(&self) -> usize {
        usize::from(self.fragments_x) * FRAGMENT_EDGE
    }

    /// Samples along y (east).
    pub fn samples_y(&self) -> usize {
        usize::from(self.fragments_y) * FRAGMENT_EDGE
    }

    pub fn sample_count(&self) -> usize {
        self.samples_x() * self.samples_y()
    }

    /// Samples between the origins of two tiles adjacent along x.
    pub fn stride_x(&self) -> usize {
        (usize::from(self.fragments_x) - 1) * FRAGMENT_EDGE
    }

    /// Samples between the origins of two tiles adjacent along y.
    pub fn stride_y(&self) -> usize {
        (usize::from(self.fragments_y) - 1) * FRAGMENT_EDGE
    }

    /// Sample offset of a fragment's first sample. Not bounds checked.
    #[inline]
    pub fn fragment_origin(&self, index: u8) -> (usize, usize) {
        let index = usize::from(index);
        let fy = usize::from(self.fragments_y);
        ((index / fy) * FRAGMENT_EDGE, (index % fy) * FRAGMENT_EDGE)
    }

    /// Whether a fragment starting at `(x0, y0)` lies fully inside the tile.
    #[inline]
    pub fn placement_fits(&self, x0: usize, y0: usize) -> bool {
        x0 + FRAGMENT_EDGE <= self.samples_x() && y0 + FRAGMENT_EDGE <= self.samples_y()
    }

    /// Fragment index holding sample `(x, y)`.
    #[inline]
    pub fn fragment_index(&self, x: usize, y: usize) -> u8 {
        ((x / FRAGMENT_EDGE) * usize::from(self.fragments_y) + y / FRAGMENT_EDGE) as u8
    }

    /// Position of sample `(x, y)` in a row-major height array.
    #[inline]
    pub fn sample_offset(&self, x: usize, y: usize) -> usize {
        x * self.samples_y() + y
    }
}

impl Default for TileLayout {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Result of resolving a location against the tile grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridInfo {
    /// Tile covering the location
    pub key: TileKey,
    /// Whole-degree latitude the tile is anchored to
    pub lat_degrees: i32,
    /// Whole-degree longitude the tile is anchored to
    pub lon_degrees: i32,
    /// Tile row north of the degree reference
    pub grid_idx_x: u32,
    /// Tile column east of the degree reference
    pub grid_idx_y: u32,
    /// Sample index inside the tile (north)
    pub idx_x: usize,
    /// Sample index inside the tile (east)
    pub idx_y: usize,
    /// Position inside the sample square, 0..1 (north)
    pub frac_x: f32,
    /// Position inside the sample square, 0..1 (east)
    pub frac_y: f32,
}

/// Errors building a [`TileLayout`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("tile layout {fragments_x}x{fragments_y} needs at least 2 fragments per side")]
    TooNarrow { fragments_x: u8, fragments_y: u8 },

    #[error("tile layout has {count} fragments, at most {max} fit the completion bitmap", max = MAX_FRAGMENTS)]
    TooManyFragments { count: u16 },

    #[error("tile store uses a {store_x}x{store_y} layout but the grid uses {grid_x}x{grid_y}")]
    Mismatch {
        store_x: u8,
        store_y: u8,
        grid_x: u8,
        grid_y: u8,
    },
}

impl LayoutError {
    pub(crate) fn mismatch(store: TileLayout, grid: TileLayout) -> Self {
        Self::Mismatch {
            store_x: store.fragments_x(),
            store_y: store.fragments_y(),
            grid_x: grid.fragments_x(),
            grid_y: grid.fragments_y(),
        }
    }
}
