//! Choosing the next tile request.
//!
//! Each tick emits at most one request. Candidates are tried in a fixed
//! order and the first tile with missing fragments wins:
//!
//! 1. the tile under the vehicle
//! 2. the eight tiles around it, sampled at 0.7 tile extents
//! 3. every tile already cached, in slot order
//! 4. the tile under the vehicle again
//!
//! Step 4 never finds anything new; it exists so the current tile is the
//! most recently touched slot when the tick ends, keeping it last in line
//! for eviction. When no candidate needs data, a status report goes out
//! instead.

use std::time::Duration;

use tracing::{debug, trace};

use super::completion::CompletionTracker;
use super::report::ReportBuilder;
use crate::grid::{offset, Location};
use crate::position::PositionSource;
use crate::protocol::{GcsLink, OutboundMessage, StatusReport, TileRequest};
use crate::tile::{SlotId, SlotState, TerrainCache, TileStore};

/// Minimum time between two tile requests.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(2000);

/// What a scheduling tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Terrain sync switched off
    Disabled,
    /// Too soon after the previous request
    Throttled,
    /// Vehicle position unknown
    NoPosition,
    /// One request sent
    Requested(TileRequest),
    /// Nothing to request; the report, if it fit on the link
    Reported(Option<StatusReport>),
}

/// Rate-limited selector of the next tile request.
#[derive(Debug, Clone)]
pub struct RequestScheduler {
    enabled: bool,
    interval_ms: u64,
    /// Time of the last emitted request; `None` until the first one
    last_request_ms: Option<u64>,
    requests_sent: u64,
}

impl RequestScheduler {
    pub fn new(enabled: bool, interval: Duration) -> Self {
        Self {
            enabled,
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            last_request_ms: None,
            requests_sent: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn last_request_ms(&self) -> Option<u64> {
        self.last_request_ms
    }

    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    fn throttled(&self, now_ms: u64) -> bool {
        self.last_request_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.interval_ms)
    }

    /// Run one scheduling tick.
    pub fn tick<S: TileStore>(
        &mut self,
        cache: &mut TerrainCache<S>,
        reporter: &mut ReportBuilder,
        position: &dyn PositionSource,
        now_ms: u64,
        link: &mut dyn GcsLink,
    ) -> TickOutcome {
        if !self.enabled {
            return TickOutcome::Disabled;
        }

        cache.store_mut().request_persistence_scan();

        if self.throttled(now_ms) {
            return TickOutcome::Throttled;
        }

        let Some(here) = position.current_position() else {
            trace!("No position, skipping terrain request");
            return TickOutcome::NoPosition;
        };

        match self.select(cache, here, now_ms, link) {
            Some(request) => TickOutcome::Requested(request),
            None => TickOutcome::Reported(reporter.send_report(cache, here, link)),
        }
    }

    fn select<S: TileStore>(
        &mut self,
        cache: &mut TerrainCache<S>,
        here: Location,
        now_ms: u64,
        link: &mut dyn GcsLink,
    ) -> Option<TileRequest> {
        let current = cache.locate(&here);
        if let Some(request) = self.request_missing(cache, current, now_ms, link) {
            return Some(request);
        }

        let offsets: Vec<(f64, f64)> = cache.geometry().neighbour_offsets().collect();
        for (north, east) in offsets {
            let neighbour = offset(here, north, east);
            let id = cache.locate(&neighbour);
            if let Some(request) = self.request_missing(cache, id, now_ms, link) {
                return Some(request);
            }
        }

        // Tiles seeded by status queries or earlier flight
        for index in 0..cache.store().slots().len() {
            let id = SlotId(index);
            if !cache.store().slot_state(id).is_trustworthy() {
                continue;
            }
            if let Some(request) = self.request_missing(cache, id, now_ms, link) {
                return Some(request);
            }
        }

        let current = cache.locate(&here);
        self.request_missing(cache, current, now_ms, link)
    }

    /// Request the missing fragments of one slot, if it has any.
    fn request_missing<S: TileStore>(
        &mut self,
        cache: &TerrainCache<S>,
        id: SlotId,
        now_ms: u64,
        link: &mut dyn GcsLink,
    ) -> Option<TileRequest> {
        let store = cache.store();
        let slot = store.slot(id)?;
        if slot.state == SlotState::DiskWait {
            // Storage may already hold it
            return None;
        }
        let block = slot.block.as_ref()?;

        let missing = CompletionTracker::new(store.layout()).missing_fragments(block.bitmap);
        if missing == 0 {
            return None;
        }

        let request = TileRequest {
            lat: block.key.lat,
            lon: block.key.lon,
            spacing: block.key.spacing,
            mask: missing,
        };
        link.send(OutboundMessage::TileRequest(request));
        self.last_request_ms = Some(now_ms);
        self.requests_sent += 1;

        debug!(
            tile = %block.key,
            slot = id.index(),
            missing = missing.count_ones(),
            mask = format_args!("{:#016x}", missing),
            "Requested terrain fragments"
        );
        Some(request)
    }
}

impl Default for RequestScheduler {
    fn default() -> Self {
        Self::new(true, DEFAULT_REQUEST_INTERVAL)
    }
}
