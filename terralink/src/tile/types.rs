//! Core types for cached terrain tiles.

use std::fmt;

use crate::grid::{TileKey, TileLayout, FRAGMENT_EDGE, FRAGMENT_SAMPLES};

/// Lifecycle of one cache slot.
///
/// ```text
/// Invalid ──allocate──▶ DiskWait ──load──▶ Valid ◀──write── Dirty
///                          (skipped without storage)  └─fragment─▶ Dirty
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// Unused slot
    #[default]
    Invalid,
    /// Waiting on persistent storage; contents not trustworthy yet
    DiskWait,
    /// Contents trustworthy, possibly incomplete
    Valid,
    /// Modified since last persisted
    Dirty,
}

impl SlotState {
    /// Whether the slot's contents can be read and extended.
    #[inline]
    pub fn is_trustworthy(&self) -> bool {
        matches!(self, SlotState::Valid | SlotState::Dirty)
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotState::Invalid => "invalid",
            SlotState::DiskWait => "disk-wait",
            SlotState::Valid => "valid",
            SlotState::Dirty => "dirty",
        };
        f.write_str(name)
    }
}

/// Stable index of a slot in the store's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl SlotId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Elevation samples of one tile plus its completion bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBlock {
    /// Tile identity
    pub key: TileKey,
    /// Bit `i` set when fragment `i` has been received
    pub bitmap: u64,
    layout: TileLayout,
    heights: Vec<u16>,
}

impl TileBlock {
    /// Create an empty block with no fragments present.
    pub fn new(key: TileKey, layout: TileLayout) -> Self {
        Self {
            key,
            bitmap: 0,
            layout,
            heights: vec![0; layout.sample_count()],
        }
    }

    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    /// Row-major height samples (`samples_x × samples_y`).
    pub fn heights(&self) -> &[u16] {
        &self.heights
    }

    /// Height at sample `(x, y)`, meters.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the tile.
    pub fn height(&self, x: usize, y: usize) -> u16 {
        self.heights[self.layout.sample_offset(x, y)]
    }

    /// Whether the fragment holding sample `(x, y)` has been received.
    pub fn has_sample(&self, x: usize, y: usize) -> bool {
        if x >= self.layout.samples_x() || y >= self.layout.samples_y() {
            return false;
        }
        let bit = self.layout.fragment_index(x, y);
        self.bitmap & (1u64 << bit) != 0
    }

    /// Number of fragments received.
    pub fn fragments_present(&self) -> u32 {
        (self.bitmap & self.layout.full_mask()).count_ones()
    }

    /// Copy one fragment's samples into place and mark it present.
    ///
    /// Returns false, leaving the block untouched, if the fragment does not
    /// fit the layout.
    pub(crate) fn write_fragment(&mut self, index: u8, samples: &[u16; FRAGMENT_SAMPLES]) -> bool {
        let (x0, y0) = self.layout.fragment_origin(index);
        if !self.layout.placement_fits(x0, y0) {
            return false;
        }
        for (row, chunk) in samples.chunks_exact(FRAGMENT_EDGE).enumerate() {
            let start = self.layout.sample_offset(x0 + row, y0);
            self.heights[start..start + FRAGMENT_EDGE].copy_from_slice(chunk);
        }
        self.bitmap |= 1u64 << index;
        true
    }
}

/// One fixed storage unit of the tile store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheSlot {
    /// Lifecycle state
    pub state: SlotState,
    /// Tile held by the slot; `None` while `Invalid`
    pub block: Option<TileBlock>,
    /// Access counter value at the last touch (higher is more recent)
    pub last_access: u64,
}

impl CacheSlot {
    /// Tile identity, if the slot holds one.
    pub fn key(&self) -> Option<&TileKey> {
        self.block.as_ref().map(|b| &b.key)
    }

    /// Completion bitmap, zero for an empty slot.
    pub fn bitmap(&self) -> u64 {
        self.block.as_ref().map_or(0, |b| b.bitmap)
    }

    /// Whether the slot currently holds `key`.
    pub fn holds(&self, key: &TileKey) -> bool {
        self.state != SlotState::Invalid && self.key() == Some(key)
    }
}
