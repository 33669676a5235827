//! Persistent storage seam for the tile store.
//!
//! The store consults a [`TilePersistence`] when a tile is first cached and
//! hands dirty tiles back to it for writing. Real disk backends live outside
//! this crate; the implementations here cover the volatile case and tests.

use std::collections::HashMap;

use thiserror::Error;

use super::types::TileBlock;
use crate::grid::TileKey;

/// Errors reported by a persistence backend.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Backend cannot accept writes right now
    #[error("Persistent storage unavailable")]
    Unavailable,

    /// Underlying I/O failed
    #[error("Failed to write tile {key}: {source}")]
    Io {
        key: TileKey,
        source: std::io::Error,
    },
}

/// Backing storage consulted by the tile store.
pub trait TilePersistence {
    /// Whether newly cached tiles should wait on a storage lookup.
    fn is_available(&self) -> bool;

    /// Load a previously stored tile.
    fn load(&mut self, key: &TileKey) -> Option<TileBlock>;

    /// Write a tile.
    fn store(&mut self, block: &TileBlock) -> Result<(), PersistenceError>;
}

/// No backing storage. Tiles start valid and stay dirty once modified.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatileStorage;

impl TilePersistence for VolatileStorage {
    fn is_available(&self) -> bool {
        false
    }

    fn load(&mut self, _key: &TileKey) -> Option<TileBlock> {
        None
    }

    fn store(&mut self, _block: &TileBlock) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable)
    }
}

/// In-process storage keeping written tiles in a map.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    blocks: HashMap<TileKey, TileBlock>,
    writes: u64,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed storage with a tile, as if written in an earlier session.
    pub fn with_block(mut self, block: TileBlock) -> Self {
        self.blocks.insert(block.key, block);
        self
    }

    /// Stored copy of a tile.
    pub fn get(&self, key: &TileKey) -> Option<&TileBlock> {
        self.blocks.get(key)
    }

    /// Number of successful writes.
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl TilePersistence for MemoryPersistence {
    fn is_available(&self) -> bool {
        true
    }

    fn load(&mut self, key: &TileKey) -> Option<TileBlock> {
        self.blocks.get(key).cloned()
    }

    fn store(&mut self, block: &TileBlock) -> Result<(), PersistenceError> {
        self.blocks.insert(block.key, block.clone());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileLayout;

    #[test]
    fn test_volatile_storage_has_nothing() {
        let mut storage = VolatileStorage;
        let key = TileKey::new(1, 2, 100);

        assert!(!storage.is_available());
        assert!(storage.load(&key).is_none());
        assert!(matches!(
            storage.store(&TileBlock::new(key, TileLayout::STANDARD)),
            Err(PersistenceError::Unavailable)
        ));
    }

    #[test]
    fn test_memory_persistence_round_trip() {
        let key = TileKey::new(1, 2, 100);
        let mut block = TileBlock::new(key, TileLayout::STANDARD);
        block.bitmap = 0b101;

        let mut storage = MemoryPersistence::new();
        storage.store(&block).unwrap();

        assert_eq!(storage.writes(), 1);
        assert_eq!(storage.load(&key), Some(block));
        assert!(storage.load(&TileKey::new(1, 2, 30)).is_none());
    }
}
