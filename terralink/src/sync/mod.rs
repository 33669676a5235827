//! Terrain synchronization with a ground station.
//!
//! [`TerrainSync`] ties the pieces together: a periodic driver calls
//! [`TerrainSync::send_request`], the transport hands each inbound message to
//! [`TerrainSync::handle_message`]. Both run to completion without blocking.
//!
//! ```ignore
//! let mut sync = TerrainSync::in_memory(TerrainConfig::default(), Arc::new(SystemClock::new()));
//! loop {
//!     sync.send_request(&position, &mut link);
//!     for msg in inbound.drain(..) {
//!         sync.handle_message(&msg, &mut link);
//!     }
//! }
//! ```

mod completion;
mod config;
mod ingest;
mod report;
mod scheduler;

pub use completion::{CacheStatistics, CompletionTracker};
pub use config::TerrainConfig;
pub use ingest::{
    IngestPolicy, IngestRejection, IngestStats, IngestionHandler, SamplePolicy,
    DEFAULT_MAX_ELEVATION, DEFAULT_MIN_ELEVATION,
};
pub use report::ReportBuilder;
pub use scheduler::{RequestScheduler, TickOutcome, DEFAULT_REQUEST_INTERVAL};

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::grid::{LayoutError, Location};
use crate::position::PositionSource;
use crate::protocol::{GcsLink, InboundMessage, StatusQuery, StatusReport, TileData};
use crate::tile::{MemoryTileStore, SlotId, TerrainCache, TileStore};
use crate::time::Clock;

/// Vehicle side of the terrain protocol.
pub struct TerrainSync<S> {
    cache: TerrainCache<S>,
    scheduler: RequestScheduler,
    ingest: IngestionHandler,
    reporter: ReportBuilder,
    clock: Arc<dyn Clock>,
}

impl TerrainSync<MemoryTileStore> {
    /// In-memory cache sized and laid out by `config`, without persistence.
    pub fn in_memory(config: TerrainConfig, clock: Arc<dyn Clock>) -> Self {
        let store = MemoryTileStore::new(config.cache_size, config.layout);
        let cache = TerrainCache::from_matching(store, config.geometry());
        Self::assemble(&config, cache, clock)
    }
}

impl<S: TileStore> TerrainSync<S> {
    /// Sync over a caller-supplied store, which must use `config.layout`.
    pub fn new(config: TerrainConfig, store: S, clock: Arc<dyn Clock>) -> Result<Self, LayoutError> {
        let cache = TerrainCache::new(store, config.geometry())?;
        Ok(Self::assemble(&config, cache, clock))
    }

    fn assemble(config: &TerrainConfig, cache: TerrainCache<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache,
            scheduler: RequestScheduler::new(config.enabled, config.request_interval),
            ingest: IngestionHandler::new(config.ingest),
            reporter: ReportBuilder::new(),
            clock,
        }
    }

    pub fn cache(&self) -> &TerrainCache<S> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut TerrainCache<S> {
        &mut self.cache
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    pub fn reporter(&self) -> &ReportBuilder {
        &self.reporter
    }

    pub fn ingest_stats(&self) -> &IngestStats {
        self.ingest.stats()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.scheduler.set_enabled(enabled);
    }

    /// Pending and loaded fragment totals over the whole cache.
    pub fn statistics(&self) -> CacheStatistics {
        let store = self.cache.store();
        CompletionTracker::new(store.layout()).statistics(store.slots())
    }

    /// One scheduling tick: request missing terrain, or report status.
    pub fn send_request(
        &mut self,
        position: &dyn PositionSource,
        link: &mut dyn GcsLink,
    ) -> TickOutcome {
        let now_ms = self.clock.monotonic_millis();
        self.scheduler
            .tick(&mut self.cache, &mut self.reporter, position, now_ms, link)
    }

    /// Route one inbound message.
    pub fn handle_message(&mut self, message: &InboundMessage, link: &mut dyn GcsLink) {
        match message {
            InboundMessage::TileData(data) => {
                // Rejections are logged inside; nothing goes back to the GCS
                let _ = self.handle_terrain_data(data);
            }
            InboundMessage::StatusQuery(query) => {
                self.handle_status_query(query, link);
            }
            InboundMessage::Unknown { msg_id } => {
                trace!(msg_id, "Ignoring non-terrain message");
            }
        }
    }

    /// Apply a fragment from the GCS.
    pub fn handle_terrain_data(&mut self, data: &TileData) -> Result<SlotId, IngestRejection> {
        let result = self.ingest.ingest(self.cache.store_mut(), data);
        if let Err(rejection) = &result {
            match rejection {
                IngestRejection::UnknownTile { .. } | IngestRejection::SlotNotReady { .. } => {
                    trace!(
                        fragment = data.fragment_index,
                        reason = %rejection,
                        "Discarded terrain fragment"
                    );
                }
                IngestRejection::FragmentOutOfRange { .. }
                | IngestRejection::PlacementOutOfBounds { .. } => {
                    debug!(
                        tile = %data.key(),
                        reason = %rejection,
                        "Discarded malformed terrain fragment"
                    );
                }
                IngestRejection::CorruptSample { .. } => {
                    warn!(
                        tile = %data.key(),
                        fragment = data.fragment_index,
                        reason = %rejection,
                        "Discarded corrupt terrain fragment"
                    );
                }
            }
        }
        result
    }

    /// Answer a status query for an arbitrary location.
    pub fn handle_status_query(
        &mut self,
        query: &StatusQuery,
        link: &mut dyn GcsLink,
    ) -> Option<StatusReport> {
        self.send_terrain_report(query.location(), link)
    }

    /// Send a status report for `loc` if the link has room.
    pub fn send_terrain_report(
        &mut self,
        loc: Location,
        link: &mut dyn GcsLink,
    ) -> Option<StatusReport> {
        self.reporter.send_report(&mut self.cache, loc, link)
    }

    /// Terrain height at `loc` from cached data.
    pub fn height_amsl(&mut self, loc: &Location) -> Option<f32> {
        self.cache.height_amsl(loc)
    }
}
