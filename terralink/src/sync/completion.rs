//! Fragment completion tracking.
//!
//! A tile's completion bitmap is a plain `u64` with one bit per fragment.
//! Everything here is a pure function of the bitmap and the tile layout.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::grid::TileLayout;
use crate::tile::{CacheSlot, SlotState};

/// Fragment totals across the cache, as carried by a status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStatistics {
    /// Fragments still to be received (or waiting on storage)
    pub pending: u16,
    /// Fragments present
    pub loaded: u16,
}

impl Add for CacheStatistics {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            pending: self.pending.saturating_add(rhs.pending),
            loaded: self.loaded.saturating_add(rhs.loaded),
        }
    }
}

impl AddAssign for CacheStatistics {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for CacheStatistics {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Derives missing sets and statistics from completion bitmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionTracker {
    layout: TileLayout,
}

impl CompletionTracker {
    pub fn new(layout: TileLayout) -> Self {
        Self { layout }
    }

    /// Fragments not yet received.
    #[inline]
    pub fn missing_fragments(&self, bitmap: u64) -> u64 {
        self.layout.full_mask() & !bitmap
    }

    #[inline]
    pub fn is_complete(&self, bitmap: u64) -> bool {
        self.missing_fragments(bitmap) == 0
    }

    /// Contribution of one slot to the cache totals.
    ///
    /// Unused slots count nothing; slots waiting on storage count every
    /// fragment as pending.
    pub fn slot_statistics(&self, slot: &CacheSlot) -> CacheStatistics {
        let total = u16::from(self.layout.fragment_count());
        match slot.state {
            SlotState::Invalid => CacheStatistics::default(),
            SlotState::DiskWait => CacheStatistics {
                pending: total,
                loaded: 0,
            },
            SlotState::Valid | SlotState::Dirty => {
                let loaded = (slot.bitmap() & self.layout.full_mask()).count_ones() as u16;
                CacheStatistics {
                    pending: total - loaded,
                    loaded,
                }
            }
        }
    }

    /// Totals over every slot.
    pub fn statistics(&self, slots: &[CacheSlot]) -> CacheStatistics {
        slots.iter().map(|slot| self.slot_statistics(slot)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileKey;
    use crate::tile::TileBlock;

    fn slot(layout: TileLayout, state: SlotState, bitmap: u64) -> CacheSlot {
        let mut block = TileBlock::new(TileKey::new(0, 0, 100), layout);
        block.bitmap = bitmap;
        CacheSlot {
            state,
            block: Some(block),
            last_access: 0,
        }
    }

    #[test]
    fn test_nothing_received_is_full_mask() {
        let tracker = CompletionTracker::new(TileLayout::STANDARD);
        assert_eq!(tracker.missing_fragments(0), TileLayout::STANDARD.full_mask());
        assert!(!tracker.is_complete(0));
    }

    #[test]
    fn test_complete_exactly_when_all_bits_set() {
        let layout = TileLayout::new(2, 4).unwrap();
        let tracker = CompletionTracker::new(layout);

        let mut bitmap = 0u64;
        for index in 0..8 {
            assert!(!tracker.is_complete(bitmap));
            bitmap |= 1 << index;
        }
        assert!(tracker.is_complete(bitmap));
        assert_eq!(tracker.missing_fragments(bitmap), 0);
    }

    #[test]
    fn test_reapplying_a_bit_is_idempotent() {
        let tracker = CompletionTracker::new(TileLayout::STANDARD);
        let once = 1u64 << 5;
        let twice = once | (1 << 5);
        assert_eq!(tracker.missing_fragments(once), tracker.missing_fragments(twice));
    }

    #[test]
    fn test_bits_outside_layout_ignored() {
        let layout = TileLayout::new(2, 4).unwrap();
        let tracker = CompletionTracker::new(layout);
        assert_eq!(tracker.missing_fragments(1 << 40), 0xFF);
    }

    #[test]
    fn test_statistics_disk_wait_and_partial() {
        let layout = TileLayout::new(2, 4).unwrap();
        let tracker = CompletionTracker::new(layout);
        let slots = vec![
            slot(layout, SlotState::DiskWait, 0),
            slot(layout, SlotState::Valid, 0b0000_0111),
        ];

        let stats = tracker.statistics(&slots);
        assert_eq!(stats.pending, 8 + 5);
        assert_eq!(stats.loaded, 3);
    }

    #[test]
    fn test_statistics_skip_invalid() {
        let tracker = CompletionTracker::new(TileLayout::STANDARD);
        let slots = vec![CacheSlot::default(), CacheSlot::default()];
        assert_eq!(tracker.statistics(&slots), CacheStatistics::default());
    }

    #[test]
    fn test_statistics_are_additive() {
        let layout = TileLayout::STANDARD;
        let tracker = CompletionTracker::new(layout);
        let slots = vec![
            slot(layout, SlotState::Valid, 0xFF),
            slot(layout, SlotState::Dirty, layout.full_mask()),
            slot(layout, SlotState::Valid, 0),
        ];

        let whole = tracker.statistics(&slots);
        let summed = slots
            .iter()
            .fold(CacheStatistics::default(), |acc, s| acc + tracker.slot_statistics(s));
        assert_eq!(whole, summed);
        assert_eq!(u32::from(whole.pending) + u32::from(whole.loaded), 3 * 56);
        assert_eq!(whole.loaded, 8 + 56);
    }
}
