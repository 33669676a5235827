//! Terrain tile cache.
//!
//! Fixed-capacity storage of elevation tiles with per-slot lifecycle state
//! and a seam to persistent storage.

mod cache;
mod persistence;
mod store;
mod types;

pub use cache::TerrainCache;
pub use persistence::{MemoryPersistence, PersistenceError, TilePersistence, VolatileStorage};
pub use store::{MemoryTileStore, TileStore, DEFAULT_CACHE_SIZE};
pub use types::{CacheSlot, SlotId, SlotState, TileBlock};
