//! Terrain status reports.

use tracing::trace;

use super::completion::CompletionTracker;
use crate::grid::Location;
use crate::protocol::{GcsLink, OutboundMessage, StatusReport, REPORT_FRAME_LEN};
use crate::tile::{TerrainCache, TileStore};

/// Builds and sends [`StatusReport`]s.
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    sent: u64,
    dropped: u64,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports sent so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Reports skipped for lack of transmit space.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Build the report for `loc` without sending it.
    pub fn build<S: TileStore>(&self, cache: &mut TerrainCache<S>, loc: Location) -> StatusReport {
        let (spacing, elevation) = match cache.height_amsl(&loc) {
            Some(height) => (cache.geometry().spacing(), height),
            None => (0, 0.0),
        };
        let stats = CompletionTracker::new(cache.store().layout()).statistics(cache.store().slots());

        StatusReport {
            lat: loc.lat,
            lon: loc.lon,
            spacing,
            elevation,
            pending: stats.pending,
            loaded: stats.loaded,
        }
    }

    /// Send a report for `loc` if the link has room for a whole one.
    ///
    /// Returns the report sent, or `None` when it was dropped this time.
    pub fn send_report<S: TileStore>(
        &mut self,
        cache: &mut TerrainCache<S>,
        loc: Location,
        link: &mut dyn GcsLink,
    ) -> Option<StatusReport> {
        let report = self.build(cache, loc);

        let space = link.remaining_transmit_capacity();
        if space < REPORT_FRAME_LEN {
            trace!(space, needed = REPORT_FRAME_LEN, "No room for terrain report");
            self.dropped += 1;
            return None;
        }

        link.send(OutboundMessage::StatusReport(report));
        self.sent += 1;
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridGeometry, TileLayout, FRAGMENT_SAMPLES};
    use crate::protocol::BufferedLink;
    use crate::tile::MemoryTileStore;

    fn cache() -> TerrainCache<MemoryTileStore> {
        TerrainCache::new(
            MemoryTileStore::new(4, TileLayout::STANDARD),
            GridGeometry::default(),
        )
        .unwrap()
    }

    const HERE: Location = Location::new(100_000_000, 200_000_000);

    #[test]
    fn test_unknown_terrain_reports_zero_spacing() {
        let mut cache = cache();
        let mut link = BufferedLink::new(256);
        let report = ReportBuilder::new()
            .send_report(&mut cache, HERE, &mut link)
            .unwrap();

        assert_eq!(report.spacing, 0);
        assert_eq!(report.lat, HERE.lat);
        assert_eq!(report.lon, HERE.lon);
        // The lookup queued the covering tile, which counts as pending
        assert_eq!(report.pending, 56);
        assert_eq!(report.loaded, 0);
        assert_eq!(link.len(), 1);
    }

    #[test]
    fn test_known_terrain_reports_spacing_and_height() {
        let mut cache = cache();
        let id = cache.locate(&HERE);
        cache.store_mut().apply_fragment(id, 0, &[321; FRAGMENT_SAMPLES]);

        let mut link = BufferedLink::new(256);
        let report = ReportBuilder::new()
            .send_report(&mut cache, HERE, &mut link)
            .unwrap();

        assert_eq!(report.spacing, 100);
        assert!((report.elevation - 321.0).abs() < 1e-3);
        assert_eq!(report.loaded, 1);
        assert_eq!(report.pending, 55);
    }

    #[test]
    fn test_insufficient_capacity_sends_nothing() {
        let mut cache = cache();
        let mut link = BufferedLink::new(REPORT_FRAME_LEN - 1);
        let mut builder = ReportBuilder::new();

        assert!(builder.send_report(&mut cache, HERE, &mut link).is_none());
        assert!(link.is_empty());
        assert_eq!(builder.dropped(), 1);
        assert_eq!(builder.sent(), 0);
    }
}
