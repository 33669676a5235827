//! Tile store paired with the grid geometry that addresses it.

use super::store::TileStore;
use super::types::{SlotId, SlotState};
use crate::grid::{GridGeometry, GridInfo, LayoutError, Location};

/// A [`TileStore`] together with the [`GridGeometry`] its tiles follow.
#[derive(Debug, Clone)]
pub struct TerrainCache<S> {
    store: S,
    geometry: GridGeometry,
}

impl<S: TileStore> TerrainCache<S> {
    /// Pair a store with a geometry. Both must use the same tile layout.
    pub fn new(store: S, geometry: GridGeometry) -> Result<Self, LayoutError> {
        if store.layout() != geometry.layout() {
            return Err(LayoutError::mismatch(store.layout(), geometry.layout()));
        }
        Ok(Self { store, geometry })
    }

    /// Pair a store with a geometry built from the same layout.
    pub(crate) fn from_matching(store: S, geometry: GridGeometry) -> Self {
        debug_assert_eq!(store.layout(), geometry.layout());
        Self { store, geometry }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn resolve(&self, loc: &Location) -> GridInfo {
        self.geometry.resolve(loc)
    }

    /// Slot for the tile covering `loc`, allocating and touching it.
    pub fn locate(&mut self, loc: &Location) -> SlotId {
        let info = self.geometry.resolve(loc);
        self.store.locate(&info.key)
    }

    /// Terrain height above mean sea level at `loc`, in meters.
    ///
    /// Bilinear interpolation of the four samples around the location. The
    /// covering tile is located (and allocated if new), so asking about an
    /// uncached point queues its tile for fetching. Returns `None` until the
    /// tile is trustworthy and all four samples have arrived. Locations off
    /// the globe have no height and never take a slot.
    pub fn height_amsl(&mut self, loc: &Location) -> Option<f32> {
        if !loc.is_valid() {
            return None;
        }
        let info = self.geometry.resolve(loc);
        let id = self.store.locate(&info.key);
        let slot = self.store.slot(id)?;
        if !slot.state.is_trustworthy() {
            return None;
        }
        let block = slot.block.as_ref()?;

        let (x, y) = (info.idx_x, info.idx_y);
        let corners = [(x, y), (x, y + 1), (x + 1, y), (x + 1, y + 1)];
        if !corners.iter().all(|&(cx, cy)| block.has_sample(cx, cy)) {
            return None;
        }

        let h00 = f32::from(block.height(x, y));
        let h01 = f32::from(block.height(x, y + 1));
        let h10 = f32::from(block.height(x + 1, y));
        let h11 = f32::from(block.height(x + 1, y + 1));

        let avg1 = (1.0 - info.frac_x) * h00 + info.frac_x * h10;
        let avg2 = (1.0 - info.frac_x) * h01 + info.frac_x * h11;
        Some((1.0 - info.frac_y) * avg1 + info.frac_y * avg2)
    }

    /// Whether the tile covering `loc` is cached and fully populated.
    pub fn is_tile_complete(&self, loc: &Location) -> bool {
        let info = self.geometry.resolve(loc);
        let layout = self.store.layout();
        self.store
            .find(&info.key)
            .and_then(|id| self.store.slot(id))
            .is_some_and(|slot| {
                slot.state != SlotState::DiskWait
                    && slot.bitmap() & layout.full_mask() == layout.full_mask()
            })
    }
}
