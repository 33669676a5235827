//! Simulate command - fly a vehicle and sync terrain from a simulated GCS.
//!
//! A tokio interval drives the scheduling tick. In the default fast mode
//! simulated time advances one tick per iteration, so a long flight finishes
//! in seconds; `--realtime` follows the wall clock instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use terralink::grid::{offset, Location};
use terralink::position::PositionSource;
use terralink::protocol::BufferedLink;
use terralink::sim::{SimulatedGcs, SyntheticTerrain};
use terralink::sync::{TerrainSync, TickOutcome};
use terralink::tile::MemoryTileStore;
use terralink::time::{Clock, ManualClock, SystemClock};

use crate::error::CliError;
use crate::runner::CliRunner;

/// How far ahead of the vehicle the simulated GCS asks about, meters.
const QUERY_LOOKAHEAD_M: f64 = 2000.0;

/// Ticks between status queries from the simulated GCS.
const QUERY_EVERY_TICKS: u64 = 10;

/// Arguments for the simulate command.
#[derive(Debug, Clone)]
pub struct SimulateArgs {
    pub lat: f64,
    pub lon: f64,
    pub heading_deg: f64,
    pub speed_mps: f64,
    pub duration_secs: u64,
    pub realtime: bool,
    pub drop_every: Option<u32>,
}

/// Straight-line flight at constant speed.
struct FlightPath {
    start: Location,
    heading_rad: f64,
    speed_mps: f64,
    clock: Arc<dyn Clock>,
}

impl FlightPath {
    /// Position `ahead_m` meters further along the track.
    fn project(&self, ahead_m: f64) -> Location {
        let elapsed_s = self.clock.monotonic_millis() as f64 / 1000.0;
        let distance = self.speed_mps * elapsed_s + ahead_m;
        offset(
            self.start,
            distance * self.heading_rad.cos(),
            distance * self.heading_rad.sin(),
        )
    }
}

impl PositionSource for FlightPath {
    fn current_position(&self) -> Option<Location> {
        Some(self.project(0.0))
    }
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    validate(&args)?;

    let runner = CliRunner::new()?;
    runner.log_startup("simulate");

    let config = runner.config();
    let terrain_config = config.to_terrain_config()?;
    let settings = config.simulation.clone();
    let drop_every = args.drop_every.unwrap_or(settings.drop_every);

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    let mut summary = runtime.block_on(async {
        let manual = (!args.realtime).then(|| Arc::new(ManualClock::new(0)));
        let clock: Arc<dyn Clock> = match &manual {
            Some(manual) => manual.clone() as Arc<dyn Clock>,
            None => Arc::new(SystemClock::new()),
        };

        let layout = terrain_config.layout;
        let sync = TerrainSync::in_memory(terrain_config, clock.clone());
        let gcs = SimulatedGcs::new(SyntheticTerrain::default(), layout).with_drop_every(drop_every);
        let flight = FlightPath {
            start: Location::from_degrees(args.lat, args.lon),
            heading_rad: args.heading_deg.to_radians(),
            speed_mps: args.speed_mps,
            clock: clock.clone(),
        };

        let mut sim = Simulation {
            sync,
            gcs,
            flight,
            link_capacity: settings.link_capacity,
            ticks: 0,
            requests: 0,
        };

        let cancellation = CancellationToken::new();
        spawn_interrupt_handler(cancellation.clone());

        let tick = Duration::from_millis(settings.tick_ms);
        let period = if args.realtime { tick } else { Duration::from_millis(1) };
        let end_ms = args.duration_secs * 1000;

        sim.run(period, cancellation, || {
            if let Some(manual) = &manual {
                manual.advance(tick);
            }
            clock.monotonic_millis() >= end_ms
        })
        .await;
        sim
    });

    summary.print();
    Ok(())
}

fn validate(args: &SimulateArgs) -> Result<(), CliError> {
    if !(-90.0..=90.0).contains(&args.lat) {
        return Err(CliError::InvalidArgument(format!(
            "latitude {} outside [-90, 90]",
            args.lat
        )));
    }
    if !(-180.0..=180.0).contains(&args.lon) {
        return Err(CliError::InvalidArgument(format!(
            "longitude {} outside [-180, 180]",
            args.lon
        )));
    }
    if args.speed_mps < 0.0 {
        return Err(CliError::InvalidArgument(
            "speed must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn spawn_interrupt_handler(cancellation: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping simulation");
            cancellation.cancel();
        }
    });
}

struct Simulation {
    sync: TerrainSync<MemoryTileStore>,
    gcs: SimulatedGcs,
    flight: FlightPath,
    link_capacity: usize,
    ticks: u64,
    requests: u64,
}

impl Simulation {
    /// Tick until cancelled or `after_tick` reports the flight is over.
    async fn run(
        &mut self,
        period: Duration,
        cancellation: CancellationToken,
        mut after_tick: impl FnMut() -> bool,
    ) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => break,
                _ = interval.tick() => {}
            }

            self.tick();
            if after_tick() {
                info!(ticks = self.ticks, "Flight complete");
                break;
            }
        }
    }

    fn tick(&mut self) {
        self.ticks += 1;
        let mut link = BufferedLink::new(self.link_capacity);

        match self.sync.send_request(&self.flight, &mut link) {
            TickOutcome::Requested(request) => {
                self.requests += 1;
                debug!(tile = %request.key(), missing = request.mask.count_ones(), "Tick requested tile");
            }
            TickOutcome::Reported(Some(report)) => {
                debug!(
                    spacing = report.spacing,
                    elevation = report.elevation,
                    pending = report.pending,
                    loaded = report.loaded,
                    "Tick reported status"
                );
            }
            other => debug!(outcome = ?other, "Tick idle"),
        }

        if self.ticks % QUERY_EVERY_TICKS == 0 {
            let ahead = self.flight.project(QUERY_LOOKAHEAD_M);
            let query = self.gcs.query(ahead);
            self.sync.handle_message(&query, &mut link);
        }

        self.exchange(&mut link);
    }

    /// Deliver queued messages both ways until the link is quiet.
    fn exchange(&mut self, link: &mut BufferedLink) {
        let mut outbound = link.drain();
        while !outbound.is_empty() {
            for message in &outbound {
                for reply in self.gcs.handle(message) {
                    self.sync.handle_message(&reply, link);
                }
            }
            outbound = link.drain();
        }
    }

    fn print(&mut self) {
        let stats = self.sync.statistics();
        let ingest = *self.sync.ingest_stats();
        let position = self.flight.project(0.0);
        let height = self.sync.height_amsl(&position);

        println!("Simulation finished");
        println!("  Ticks:            {}", self.ticks);
        println!("  Requests sent:    {}", self.requests);
        println!("  Fragments sent:   {}", self.gcs.fragments_sent());
        println!("  Fragments lost:   {}", self.gcs.fragments_dropped());
        println!("  Fragments stored: {}", ingest.applied);
        println!("  Rejected:         {}", ingest.rejected());
        println!("  Reports received: {}", self.gcs.reports_received());
        println!("  Cache loaded:     {}", stats.loaded);
        println!("  Cache pending:    {}", stats.pending);
        println!("  Final position:   {}", position);
        match height {
            Some(h) => println!("  Terrain height:   {:.1} m", h),
            None => println!("  Terrain height:   unknown"),
        }
    }
}
