//! Simulated ground station.
//!
//! Answers tile requests from a deterministic synthetic terrain so the
//! vehicle side can be exercised without a real GCS. Used by the CLI's
//! `simulate` command and the integration tests.

use std::f64::consts::TAU;

use tracing::{debug, trace};

use crate::grid::{offset, Location, TileLayout, FRAGMENT_EDGE, FRAGMENT_SAMPLES};
use crate::protocol::{InboundMessage, OutboundMessage, StatusQuery, StatusReport, TileData, TileRequest};

/// Smooth, deterministic elevation field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticTerrain {
    /// Mean elevation, meters
    pub base_m: f64,
    /// Amplitude of the main undulation, meters
    pub relief_m: f64,
}

impl SyntheticTerrain {
    pub fn new(base_m: f64, relief_m: f64) -> Self {
        Self { base_m, relief_m }
    }

    /// Elevation at `loc`, meters, kept inside `[1, 20000]`.
    pub fn elevation(&self, loc: &Location) -> u16 {
        let lat = loc.lat_degrees();
        let lon = loc.lon_degrees();

        // Ridges every quarter degree plus a finer diagonal ripple
        let ridges = (lat * 4.0 * TAU).sin() * (lon * 4.0 * TAU).cos();
        let ripple = ((lat * 17.0 + lon * 9.0) * TAU).sin();
        let height = self.base_m + self.relief_m * ridges + self.relief_m * 0.25 * ripple;

        height.round().clamp(1.0, 20_000.0) as u16
    }

    /// The sixteen samples of one fragment of a tile.
    pub fn fragment(
        &self,
        origin: Location,
        spacing: u16,
        layout: TileLayout,
        index: u8,
    ) -> [u16; FRAGMENT_SAMPLES] {
        let (x0, y0) = layout.fragment_origin(index);
        let spacing = f64::from(spacing);

        let mut samples = [0u16; FRAGMENT_SAMPLES];
        for (i, sample) in samples.iter_mut().enumerate() {
            let x = x0 + i / FRAGMENT_EDGE;
            let y = y0 + i % FRAGMENT_EDGE;
            let loc = offset(origin, x as f64 * spacing, y as f64 * spacing);
            *sample = self.elevation(&loc);
        }
        samples
    }
}

impl Default for SyntheticTerrain {
    fn default() -> Self {
        Self::new(1000.0, 600.0)
    }
}

/// Ground station answering requests from [`SyntheticTerrain`].
#[derive(Debug, Clone)]
pub struct SimulatedGcs {
    terrain: SyntheticTerrain,
    layout: TileLayout,
    /// Drop every Nth fragment; 0 never drops
    drop_every: u32,
    fragments_generated: u64,
    fragments_dropped: u64,
    requests_seen: u64,
    reports_received: u64,
    last_report: Option<StatusReport>,
}

impl SimulatedGcs {
    pub fn new(terrain: SyntheticTerrain, layout: TileLayout) -> Self {
        Self {
            terrain,
            layout,
            drop_every: 0,
            fragments_generated: 0,
            fragments_dropped: 0,
            requests_seen: 0,
            reports_received: 0,
            last_report: None,
        }
    }

    /// Drop every `n`th fragment before it reaches the vehicle.
    pub fn with_drop_every(mut self, n: u32) -> Self {
        self.drop_every = n;
        self
    }

    pub fn terrain(&self) -> &SyntheticTerrain {
        &self.terrain
    }

    pub fn requests_seen(&self) -> u64 {
        self.requests_seen
    }

    pub fn fragments_sent(&self) -> u64 {
        self.fragments_generated - self.fragments_dropped
    }

    pub fn fragments_dropped(&self) -> u64 {
        self.fragments_dropped
    }

    pub fn reports_received(&self) -> u64 {
        self.reports_received
    }

    /// Most recent status report; earlier ones are only counted.
    pub fn last_report(&self) -> Option<&StatusReport> {
        self.last_report.as_ref()
    }

    /// Handle one message from the vehicle, returning the replies.
    pub fn handle(&mut self, message: &OutboundMessage) -> Vec<InboundMessage> {
        match message {
            OutboundMessage::TileRequest(request) => self
                .respond(request)
                .into_iter()
                .map(InboundMessage::TileData)
                .collect(),
            OutboundMessage::StatusReport(report) => {
                trace!(
                    lat = report.lat,
                    lon = report.lon,
                    spacing = report.spacing,
                    pending = report.pending,
                    loaded = report.loaded,
                    "GCS received terrain report"
                );
                self.reports_received += 1;
                self.last_report = Some(*report);
                Vec::new()
            }
        }
    }

    /// One [`TileData`] per requested fragment, minus any dropped.
    pub fn respond(&mut self, request: &TileRequest) -> Vec<TileData> {
        self.requests_seen += 1;
        let origin = Location::new(request.lat, request.lon);

        let mut replies = Vec::with_capacity(request.mask.count_ones() as usize);
        for index in 0..self.layout.fragment_count() {
            if request.mask & (1u64 << index) == 0 {
                continue;
            }
            self.fragments_generated += 1;
            if self.drop_every > 0 && self.fragments_generated % u64::from(self.drop_every) == 0 {
                self.fragments_dropped += 1;
                continue;
            }
            replies.push(TileData {
                lat: request.lat,
                lon: request.lon,
                spacing: request.spacing,
                fragment_index: index,
                samples: self.terrain.fragment(origin, request.spacing, self.layout, index),
            });
        }

        debug!(
            tile = %request.key(),
            requested = request.mask.count_ones(),
            sent = replies.len(),
            "GCS answered terrain request"
        );
        replies
    }

    /// A status query for `loc`, as the GCS would send it.
    pub fn query(&self, loc: Location) -> InboundMessage {
        InboundMessage::StatusQuery(StatusQuery {
            lat: loc.lat,
            lon: loc.lon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HERE: Location = Location::new(-353_632_610, 1_491_652_300);

    fn request(mask: u64) -> TileRequest {
        TileRequest {
            lat: HERE.lat,
            lon: HERE.lon,
            spacing: 100,
            mask,
        }
    }

    #[test]
    fn test_elevation_deterministic_and_in_band() {
        let terrain = SyntheticTerrain::default();
        let a = terrain.elevation(&HERE);
        assert_eq!(a, terrain.elevation(&HERE));
        assert!((1..=20_000).contains(&a));
    }

    #[test]
    fn test_flat_terrain_never_below_one() {
        let terrain = SyntheticTerrain::new(-50.0, 0.0);
        assert_eq!(terrain.elevation(&HERE), 1);
    }

    #[test]
    fn test_fragment_matches_sample_positions() {
        let terrain = SyntheticTerrain::default();
        let layout = TileLayout::STANDARD;
        let samples = terrain.fragment(HERE, 100, layout, 9);

        // Fragment 9 starts at sample (4, 4); its sample 5 is (5, 5)
        let expected = terrain.elevation(&offset(HERE, 500.0, 500.0));
        assert_eq!(samples[5], expected);
    }

    #[test]
    fn test_one_reply_per_requested_fragment() {
        let mut gcs = SimulatedGcs::new(SyntheticTerrain::default(), TileLayout::STANDARD);
        let replies = gcs.respond(&request(0b1011));

        let indices: Vec<u8> = replies.iter().map(|d| d.fragment_index).collect();
        assert_eq!(indices, vec![0, 1, 3]);
        assert!(replies.iter().all(|d| d.key() == request(0).key()));
        assert_eq!(gcs.requests_seen(), 1);
    }

    #[test]
    fn test_bits_beyond_layout_ignored() {
        let layout = TileLayout::new(2, 2).unwrap();
        let mut gcs = SimulatedGcs::new(SyntheticTerrain::default(), layout);
        assert_eq!(gcs.respond(&request(u64::MAX)).len(), 4);
    }

    #[test]
    fn test_drop_every_nth() {
        let mut gcs =
            SimulatedGcs::new(SyntheticTerrain::default(), TileLayout::STANDARD).with_drop_every(4);
        let replies = gcs.respond(&request(TileLayout::STANDARD.full_mask()));

        assert_eq!(replies.len(), 56 - 14);
        assert_eq!(gcs.fragments_dropped(), 14);
        assert_eq!(gcs.fragments_sent(), 42);
        assert!(replies.iter().all(|d| (d.fragment_index + 1) % 4 != 0));
    }

    #[test]
    fn test_reports_recorded() {
        let mut gcs = SimulatedGcs::new(SyntheticTerrain::default(), TileLayout::STANDARD);
        let report = StatusReport {
            lat: 1,
            lon: 2,
            spacing: 0,
            elevation: 0.0,
            pending: 56,
            loaded: 0,
        };
        assert!(gcs.handle(&OutboundMessage::StatusReport(report)).is_empty());
        assert_eq!(gcs.last_report(), Some(&report));
        assert_eq!(gcs.reports_received(), 1);
    }

    #[test]
    fn test_only_latest_report_kept() {
        let mut gcs = SimulatedGcs::new(SyntheticTerrain::default(), TileLayout::STANDARD);
        let mut report = StatusReport {
            lat: 1,
            lon: 2,
            spacing: 100,
            elevation: 640.0,
            pending: 56,
            loaded: 0,
        };
        for loaded in 0..500u16 {
            report.loaded = loaded;
            gcs.handle(&OutboundMessage::StatusReport(report));
        }

        assert_eq!(gcs.reports_received(), 500);
        assert_eq!(gcs.last_report().map(|r| r.loaded), Some(499));
    }
}
