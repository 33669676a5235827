//! Applying inbound tile fragments to the cache.
//!
//! Every check runs before the store is touched, so a rejected fragment
//! leaves no trace: no samples written, no bitmap bit, no state change.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::trace;

use crate::grid::{TileKey, FRAGMENT_SAMPLES, MAX_FRAGMENTS};
use crate::protocol::TileData;
use crate::tile::{SlotId, SlotState, TileStore};

/// Lowest plausible elevation sample, meters.
pub const DEFAULT_MIN_ELEVATION: u16 = 1;

/// Highest plausible elevation sample, meters.
pub const DEFAULT_MAX_ELEVATION: u16 = 20_000;

/// What to do with a fragment holding samples outside the plausible band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplePolicy {
    /// Discard the whole fragment
    #[default]
    Reject,
    /// Clamp offending samples into the band and apply
    Clamp,
    /// Apply samples unchanged
    Accept,
}

impl fmt::Display for SamplePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SamplePolicy::Reject => "reject",
            SamplePolicy::Clamp => "clamp",
            SamplePolicy::Accept => "accept",
        };
        f.write_str(name)
    }
}

impl FromStr for SamplePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(SamplePolicy::Reject),
            "clamp" => Ok(SamplePolicy::Clamp),
            "accept" => Ok(SamplePolicy::Accept),
            other => Err(format!("unknown sample policy '{}'", other)),
        }
    }
}

/// Sample validation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestPolicy {
    pub sample_policy: SamplePolicy,
    pub min_elevation: u16,
    pub max_elevation: u16,
}

impl Default for IngestPolicy {
    fn default() -> Self {
        Self {
            sample_policy: SamplePolicy::Reject,
            min_elevation: DEFAULT_MIN_ELEVATION,
            max_elevation: DEFAULT_MAX_ELEVATION,
        }
    }
}

/// Why a fragment was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestRejection {
    /// No cached tile has this origin and spacing
    #[error("No cached tile matches {key}")]
    UnknownTile { key: TileKey },

    /// Index beyond what any tile can hold
    #[error("Fragment index {index} out of range")]
    FragmentOutOfRange { index: u8 },

    /// Index valid on the wire but outside this tile layout
    #[error("Fragment {index} lands outside the tile")]
    PlacementOutOfBounds { index: u8 },

    /// Slot still waiting on persistent storage
    #[error("Tile {key} is waiting on storage")]
    SlotNotReady { key: TileKey },

    /// Sample outside the plausible elevation band
    #[error("Sample {position} = {value}m outside [{min}, {max}]")]
    CorruptSample {
        position: usize,
        value: u16,
        min: u16,
        max: u16,
    },
}

/// Counters of ingestion outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestStats {
    pub applied: u64,
    pub unknown_tile: u64,
    pub out_of_range: u64,
    pub out_of_bounds: u64,
    pub not_ready: u64,
    pub corrupt: u64,
    /// Samples clamped under [`SamplePolicy::Clamp`]
    pub clamped_samples: u64,
}

impl IngestStats {
    fn record(&mut self, rejection: &IngestRejection) {
        match rejection {
            IngestRejection::UnknownTile { .. } => self.unknown_tile += 1,
            IngestRejection::FragmentOutOfRange { .. } => self.out_of_range += 1,
            IngestRejection::PlacementOutOfBounds { .. } => self.out_of_bounds += 1,
            IngestRejection::SlotNotReady { .. } => self.not_ready += 1,
            IngestRejection::CorruptSample { .. } => self.corrupt += 1,
        }
    }

    /// Total fragments not applied.
    pub fn rejected(&self) -> u64 {
        self.unknown_tile + self.out_of_range + self.out_of_bounds + self.not_ready + self.corrupt
    }
}

/// Validates and applies [`TileData`] fragments.
#[derive(Debug, Clone, Default)]
pub struct IngestionHandler {
    policy: IngestPolicy,
    stats: IngestStats,
}

impl IngestionHandler {
    pub fn new(policy: IngestPolicy) -> Self {
        Self {
            policy,
            stats: IngestStats::default(),
        }
    }

    pub fn policy(&self) -> &IngestPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Apply one fragment, returning the slot it landed in.
    ///
    /// On success the persistence layer is nudged so the dirty tile gets
    /// written eventually.
    pub fn ingest<S: TileStore + ?Sized>(
        &mut self,
        store: &mut S,
        data: &TileData,
    ) -> Result<SlotId, IngestRejection> {
        let result = self.apply(store, data);
        match &result {
            Ok(slot) => {
                self.stats.applied += 1;
                trace!(
                    tile = %data.key(),
                    fragment = data.fragment_index,
                    slot = slot.index(),
                    "Applied fragment"
                );
            }
            Err(rejection) => self.stats.record(rejection),
        }
        result
    }

    fn apply<S: TileStore + ?Sized>(
        &mut self,
        store: &mut S,
        data: &TileData,
    ) -> Result<SlotId, IngestRejection> {
        let index = data.fragment_index;
        if index >= MAX_FRAGMENTS {
            return Err(IngestRejection::FragmentOutOfRange { index });
        }

        let key = data.key();
        let id = store
            .find(&key)
            .ok_or(IngestRejection::UnknownTile { key })?;

        let layout = store.layout();
        let (x0, y0) = layout.fragment_origin(index);
        if !layout.placement_fits(x0, y0) {
            return Err(IngestRejection::PlacementOutOfBounds { index });
        }

        if store.slot_state(id) == SlotState::DiskWait {
            return Err(IngestRejection::SlotNotReady { key });
        }

        let samples = self.validate_samples(&data.samples)?;

        store.apply_fragment(id, index, &samples);
        store.request_persistence_scan();
        Ok(id)
    }

    fn validate_samples(
        &mut self,
        samples: &[u16; FRAGMENT_SAMPLES],
    ) -> Result<[u16; FRAGMENT_SAMPLES], IngestRejection> {
        let IngestPolicy {
            sample_policy,
            min_elevation: min,
            max_elevation: max,
        } = self.policy;

        match sample_policy {
            SamplePolicy::Accept => Ok(*samples),
            SamplePolicy::Reject => {
                match samples
                    .iter()
                    .enumerate()
                    .find(|&(_, &value)| !(min..=max).contains(&value))
                {
                    Some((position, &value)) => Err(IngestRejection::CorruptSample {
                        position,
                        value,
                        min,
                        max,
                    }),
                    None => Ok(*samples),
                }
            }
            SamplePolicy::Clamp => {
                let mut clamped = *samples;
                for value in clamped.iter_mut() {
                    let bounded = (*value).clamp(min, max);
                    if bounded != *value {
                        self.stats.clamped_samples += 1;
                        *value = bounded;
                    }
                }
                Ok(clamped)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileLayout;
    use crate::tile::{MemoryPersistence, MemoryTileStore};

    const KEY: TileKey = TileKey::new(100_000_000, 200_000_000, 100);

    fn data(fragment_index: u8, sample: u16) -> TileData {
        TileData {
            lat: KEY.lat,
            lon: KEY.lon,
            spacing: KEY.spacing,
            fragment_index,
            samples: [sample; FRAGMENT_SAMPLES],
        }
    }

    fn tracked_store(layout: TileLayout) -> (MemoryTileStore, SlotId) {
        let mut store = MemoryTileStore::new(4, layout);
        let id = store.locate(&KEY);
        (store, id)
    }

    #[test]
    fn test_first_fragment_sets_bit_and_dirty() {
        let (mut store, id) = tracked_store(TileLayout::STANDARD);
        let mut handler = IngestionHandler::default();

        assert_eq!(handler.ingest(&mut store, &data(0, 500)), Ok(id));

        let slot = store.slot(id).unwrap();
        assert_eq!(slot.bitmap(), 1);
        assert_eq!(slot.state, SlotState::Dirty);
        assert_eq!(handler.stats().applied, 1);
    }

    #[test]
    fn test_unknown_tile_changes_nothing() {
        let (mut store, _) = tracked_store(TileLayout::STANDARD);
        let before = store.slots().to_vec();
        let mut handler = IngestionHandler::default();

        let mut stray = data(0, 500);
        stray.spacing = 30;
        assert_eq!(
            handler.ingest(&mut store, &stray),
            Err(IngestRejection::UnknownTile { key: stray.key() })
        );
        assert_eq!(store.slots(), before.as_slice());
        assert_eq!(handler.stats().unknown_tile, 1);
    }

    #[test]
    fn test_index_at_limit_rejected() {
        let (mut store, id) = tracked_store(TileLayout::STANDARD);
        let mut handler = IngestionHandler::default();

        assert_eq!(
            handler.ingest(&mut store, &data(56, 500)),
            Err(IngestRejection::FragmentOutOfRange { index: 56 })
        );
        assert_eq!(store.slot(id).unwrap().bitmap(), 0);
    }

    #[test]
    fn test_placement_outside_small_layout_rejected() {
        let (mut store, id) = tracked_store(TileLayout::new(2, 4).unwrap());
        let mut handler = IngestionHandler::default();

        assert_eq!(
            handler.ingest(&mut store, &data(8, 500)),
            Err(IngestRejection::PlacementOutOfBounds { index: 8 })
        );
        let slot = store.slot(id).unwrap();
        assert_eq!(slot.bitmap(), 0);
        assert_eq!(slot.state, SlotState::Valid);
    }

    #[test]
    fn test_disk_wait_slot_rejected() {
        let mut store =
            MemoryTileStore::with_persistence(4, TileLayout::STANDARD, MemoryPersistence::new());
        let id = store.locate(&KEY);
        let mut handler = IngestionHandler::default();

        assert_eq!(
            handler.ingest(&mut store, &data(0, 500)),
            Err(IngestRejection::SlotNotReady { key: KEY })
        );
        assert_eq!(store.slot_state(id), SlotState::DiskWait);
        assert_eq!(store.slot(id).unwrap().bitmap(), 0);
    }

    #[test]
    fn test_corrupt_sample_rejected_by_default() {
        let (mut store, id) = tracked_store(TileLayout::STANDARD);
        let mut handler = IngestionHandler::default();

        let mut fragment = data(0, 500);
        fragment.samples[7] = 20_001;
        assert_eq!(
            handler.ingest(&mut store, &fragment),
            Err(IngestRejection::CorruptSample {
                position: 7,
                value: 20_001,
                min: 1,
                max: 20_000
            })
        );
        let slot = store.slot(id).unwrap();
        assert_eq!(slot.bitmap(), 0);
        assert!(slot.block.as_ref().unwrap().heights().iter().all(|&h| h == 0));
        assert_eq!(handler.stats().corrupt, 1);
    }

    #[test]
    fn test_clamp_policy_bounds_samples() {
        let (mut store, id) = tracked_store(TileLayout::STANDARD);
        let mut handler = IngestionHandler::new(IngestPolicy {
            sample_policy: SamplePolicy::Clamp,
            ..IngestPolicy::default()
        });

        let mut fragment = data(0, 500);
        fragment.samples[0] = 0;
        fragment.samples[1] = 30_000;
        handler.ingest(&mut store, &fragment).unwrap();

        let block = store.slot(id).unwrap().block.as_ref().unwrap();
        assert_eq!(block.height(0, 0), 1);
        assert_eq!(block.height(0, 1), 20_000);
        assert_eq!(block.height(0, 2), 500);
        assert_eq!(handler.stats().clamped_samples, 2);
    }

    #[test]
    fn test_accept_policy_keeps_samples() {
        let (mut store, id) = tracked_store(TileLayout::STANDARD);
        let mut handler = IngestionHandler::new(IngestPolicy {
            sample_policy: SamplePolicy::Accept,
            ..IngestPolicy::default()
        });

        handler.ingest(&mut store, &data(0, 0)).unwrap();
        let block = store.slot(id).unwrap().block.as_ref().unwrap();
        assert_eq!(block.height(0, 0), 0);
    }

    #[test]
    fn test_duplicate_fragment_keeps_bitmap() {
        let (mut store, id) = tracked_store(TileLayout::STANDARD);
        let mut handler = IngestionHandler::default();

        handler.ingest(&mut store, &data(3, 500)).unwrap();
        handler.ingest(&mut store, &data(3, 600)).unwrap();

        let slot = store.slot(id).unwrap();
        assert_eq!(slot.bitmap(), 1 << 3);
        assert_eq!(slot.block.as_ref().unwrap().height(0, 12), 600);
    }

    #[test]
    fn test_sample_policy_parse() {
        assert_eq!("Reject".parse::<SamplePolicy>(), Ok(SamplePolicy::Reject));
        assert_eq!(" clamp ".parse::<SamplePolicy>(), Ok(SamplePolicy::Clamp));
        assert!("drop".parse::<SamplePolicy>().is_err());
        assert_eq!(SamplePolicy::Accept.to_string(), "accept");
    }
}
