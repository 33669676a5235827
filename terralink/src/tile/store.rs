//! Fixed-capacity tile store.
//!
//! The store owns every cached tile and its lifecycle state. Callers address
//! slots by [`SlotId`] and mutate tile contents only through
//! [`TileStore::apply_fragment`].
//!
//! # Recency
//!
//! [`MemoryTileStore`] keeps an explicit access counter. Every
//! [`TileStore::locate`] bumps the counter and stamps the slot, and
//! allocation evicts the slot with the oldest stamp. Callers wanting a tile
//! to survive longest simply locate it last.

use tracing::{debug, trace, warn};

use super::persistence::{TilePersistence, VolatileStorage};
use super::types::{CacheSlot, SlotId, SlotState, TileBlock};
use crate::grid::{TileKey, TileLayout, FRAGMENT_SAMPLES};

/// Default number of cache slots.
pub const DEFAULT_CACHE_SIZE: usize = 12;

/// Cache of terrain tiles addressed by slot index.
pub trait TileStore {
    /// Fragment layout shared by every tile in the store.
    fn layout(&self) -> TileLayout;

    /// All slots, in index order.
    fn slots(&self) -> &[CacheSlot];

    /// Find the slot holding `key`, allocating one if needed, and mark it
    /// as most recently used.
    fn locate(&mut self, key: &TileKey) -> SlotId;

    /// Copy a fragment into a slot's tile, set its bitmap bit and mark the
    /// slot dirty. Callers validate the fragment beforehand.
    fn apply_fragment(&mut self, id: SlotId, index: u8, samples: &[u16; FRAGMENT_SAMPLES]);

    /// Ask the persistence layer to make progress on pending loads and
    /// writes. Never blocks.
    fn request_persistence_scan(&mut self);

    fn slot(&self, id: SlotId) -> Option<&CacheSlot> {
        self.slots().get(id.0)
    }

    fn slot_state(&self, id: SlotId) -> SlotState {
        self.slot(id).map_or(SlotState::Invalid, |slot| slot.state)
    }

    /// Find the slot holding `key` without allocating or touching it.
    fn find(&self, key: &TileKey) -> Option<SlotId> {
        self.slots()
            .iter()
            .position(|slot| slot.holds(key))
            .map(SlotId)
    }
}

/// In-memory arena of tile slots with LRU replacement.
#[derive(Debug, Clone)]
pub struct MemoryTileStore<P: TilePersistence = VolatileStorage> {
    slots: Vec<CacheSlot>,
    layout: TileLayout,
    persistence: P,
    access_counter: u64,
}

impl MemoryTileStore<VolatileStorage> {
    /// Create a store without persistent storage.
    pub fn new(capacity: usize, layout: TileLayout) -> Self {
        Self::with_persistence(capacity, layout, VolatileStorage)
    }
}

impl<P: TilePersistence> MemoryTileStore<P> {
    /// Create a store backed by `persistence`.
    ///
    /// Capacity is raised to at least one slot.
    pub fn with_persistence(capacity: usize, layout: TileLayout, persistence: P) -> Self {
        Self {
            slots: vec![CacheSlot::default(); capacity.max(1)],
            layout,
            persistence,
            access_counter: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Put a slot into `state` directly.
    ///
    /// For persistence layers and tests that manage lifecycle themselves.
    pub fn set_state(&mut self, id: SlotId, state: SlotState) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.state = state;
        }
    }

    /// Slot to reuse for a new tile: first unused, else least recently used,
    /// preferring slots with nothing unsaved.
    fn victim(&self) -> SlotId {
        if let Some(free) = self
            .slots
            .iter()
            .position(|slot| slot.state == SlotState::Invalid)
        {
            return SlotId(free);
        }

        let oldest = |dirty_ok: bool| {
            self.slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| dirty_ok || slot.state != SlotState::Dirty)
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(i, _)| SlotId(i))
        };

        let keep_unsaved = self.persistence.is_available();
        oldest(!keep_unsaved)
            .or_else(|| oldest(true))
            .unwrap_or(SlotId(0))
    }

    fn resolve_disk_wait(&mut self) {
        let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| slot.state == SlotState::DiskWait)
        else {
            return;
        };
        let Some(block) = slot.block.as_mut() else {
            slot.state = SlotState::Invalid;
            return;
        };

        match self.persistence.load(&block.key) {
            Some(stored) if stored.key == block.key && stored.layout() == block.layout() => {
                debug!(
                    tile = %block.key,
                    fragments = stored.fragments_present(),
                    "Loaded tile from storage"
                );
                *block = stored;
            }
            Some(stored) => {
                warn!(
                    tile = %block.key,
                    stored = %stored.key,
                    "Ignoring stored tile with mismatched identity or layout"
                );
            }
            None => {
                trace!(tile = %block.key, "Tile not in storage");
            }
        }
        slot.state = SlotState::Valid;
    }

    fn write_dirty(&mut self) {
        let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| slot.state == SlotState::Dirty)
        else {
            return;
        };
        let Some(block) = slot.block.as_ref() else {
            return;
        };

        match self.persistence.store(block) {
            Ok(()) => {
                trace!(tile = %block.key, "Wrote tile to storage");
                slot.state = SlotState::Valid;
            }
            Err(e) => {
                warn!(tile = %block.key, error = %e, "Failed to write tile, will retry");
            }
        }
    }
}

impl<P: TilePersistence> TileStore for MemoryTileStore<P> {
    fn layout(&self) -> TileLayout {
        self.layout
    }

    fn slots(&self) -> &[CacheSlot] {
        &self.slots
    }

    fn locate(&mut self, key: &TileKey) -> SlotId {
        self.access_counter += 1;
        let now = self.access_counter;

        if let Some(id) = self.find(key) {
            self.slots[id.0].last_access = now;
            return id;
        }

        let id = self.victim();
        let waits_on_storage = self.persistence.is_available();
        let slot = &mut self.slots[id.0];

        if slot.state == SlotState::Dirty && waits_on_storage {
            if let Some(old) = slot.key() {
                warn!(tile = %old, "Evicting tile with unsaved fragments");
            }
        }

        *slot = CacheSlot {
            state: if waits_on_storage {
                SlotState::DiskWait
            } else {
                SlotState::Valid
            },
            block: Some(TileBlock::new(*key, self.layout)),
            last_access: now,
        };
        debug!(tile = %key, slot = id.0, state = %slot.state, "Allocated cache slot");
        id
    }

    fn apply_fragment(&mut self, id: SlotId, index: u8, samples: &[u16; FRAGMENT_SAMPLES]) {
        let Some(slot) = self.slots.get_mut(id.0) else {
            debug!(slot = id.0, "Fragment for nonexistent slot");
            return;
        };
        let Some(block) = slot.block.as_mut() else {
            return;
        };
        if block.write_fragment(index, samples) {
            slot.state = SlotState::Dirty;
        }
    }

    fn request_persistence_scan(&mut self) {
        if !self.persistence.is_available() {
            return;
        }
        self.resolve_disk_wait();
        self.write_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::MemoryPersistence;

    fn key(n: i32) -> TileKey {
        TileKey::new(100_000_000 + n, 200_000_000, 100)
    }

    #[test]
    fn test_locate_allocates_valid_without_storage() {
        let mut store = MemoryTileStore::new(4, TileLayout::STANDARD);
        let id = store.locate(&key(0));

        assert_eq!(store.slot_state(id), SlotState::Valid);
        assert_eq!(store.slot(id).unwrap().key(), Some(&key(0)));
        assert_eq!(store.find(&key(0)), Some(id));
    }

    #[test]
    fn test_locate_returns_existing_slot() {
        let mut store = MemoryTileStore::new(4, TileLayout::STANDARD);
        let first = store.locate(&key(0));
        store.locate(&key(1));
        let again = store.locate(&key(0));

        assert_eq!(first, again);
        assert_eq!(
            store.slots().iter().filter(|s| s.state != SlotState::Invalid).count(),
            2
        );
    }

    #[test]
    fn test_locate_evicts_least_recent() {
        let mut store = MemoryTileStore::new(2, TileLayout::STANDARD);
        let a = store.locate(&key(0));
        store.locate(&key(1));
        // Touch a so b becomes the oldest
        store.locate(&key(0));
        let c = store.locate(&key(2));

        assert_ne!(c, a);
        assert!(store.find(&key(1)).is_none());
        assert!(store.find(&key(0)).is_some());
        assert!(store.find(&key(2)).is_some());
    }

    #[test]
    fn test_find_does_not_touch() {
        let mut store = MemoryTileStore::new(2, TileLayout::STANDARD);
        let a = store.locate(&key(0));
        store.locate(&key(1));
        let stamp = store.slot(a).unwrap().last_access;

        store.find(&key(0));
        assert_eq!(store.slot(a).unwrap().last_access, stamp);
    }

    #[test]
    fn test_apply_fragment_marks_dirty() {
        let mut store = MemoryTileStore::new(2, TileLayout::STANDARD);
        let id = store.locate(&key(0));
        store.apply_fragment(id, 0, &[10; FRAGMENT_SAMPLES]);

        let slot = store.slot(id).unwrap();
        assert_eq!(slot.state, SlotState::Dirty);
        assert_eq!(slot.bitmap(), 1);
    }

    #[test]
    fn test_volatile_scan_leaves_dirty() {
        let mut store = MemoryTileStore::new(2, TileLayout::STANDARD);
        let id = store.locate(&key(0));
        store.apply_fragment(id, 3, &[10; FRAGMENT_SAMPLES]);
        store.request_persistence_scan();

        assert_eq!(store.slot_state(id), SlotState::Dirty);
    }

    #[test]
    fn test_disk_wait_resolves_from_storage() {
        let mut stored = TileBlock::new(key(0), TileLayout::STANDARD);
        stored.write_fragment(0, &[42; FRAGMENT_SAMPLES]);
        let persistence = MemoryPersistence::new().with_block(stored);

        let mut store = MemoryTileStore::with_persistence(2, TileLayout::STANDARD, persistence);
        let id = store.locate(&key(0));
        assert_eq!(store.slot_state(id), SlotState::DiskWait);

        store.request_persistence_scan();
        assert_eq!(store.slot_state(id), SlotState::Valid);
        assert_eq!(store.slot(id).unwrap().bitmap(), 1);
    }

    #[test]
    fn test_disk_wait_resolves_empty_when_not_stored() {
        let mut store =
            MemoryTileStore::with_persistence(2, TileLayout::STANDARD, MemoryPersistence::new());
        let id = store.locate(&key(0));
        store.request_persistence_scan();

        assert_eq!(store.slot_state(id), SlotState::Valid);
        assert_eq!(store.slot(id).unwrap().bitmap(), 0);
    }

    #[test]
    fn test_scan_writes_dirty_tile() {
        let mut store =
            MemoryTileStore::with_persistence(2, TileLayout::STANDARD, MemoryPersistence::new());
        let id = store.locate(&key(0));
        store.request_persistence_scan();
        store.apply_fragment(id, 1, &[7; FRAGMENT_SAMPLES]);
        assert_eq!(store.slot_state(id), SlotState::Dirty);

        store.request_persistence_scan();
        assert_eq!(store.slot_state(id), SlotState::Valid);
        assert_eq!(store.persistence().writes(), 1);
        assert_eq!(store.persistence().get(&key(0)).unwrap().bitmap, 0b10);
    }

    #[test]
    fn test_eviction_prefers_saved_tiles_with_storage() {
        let mut store =
            MemoryTileStore::with_persistence(2, TileLayout::STANDARD, MemoryPersistence::new());
        let a = store.locate(&key(0));
        let b = store.locate(&key(1));
        store.set_state(a, SlotState::Dirty);
        store.set_state(b, SlotState::Valid);

        // a is older but unsaved, so b goes
        let c = store.locate(&key(2));
        assert_eq!(c, b);
        assert!(store.find(&key(0)).is_some());
    }

    #[test]
    fn test_zero_capacity_raised_to_one() {
        let mut store = MemoryTileStore::new(0, TileLayout::STANDARD);
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.locate(&key(0)), SlotId(0));
    }
}
