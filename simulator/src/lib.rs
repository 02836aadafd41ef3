#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative mission simulation for the crop mission workspace.
//!
//! A [`MissionSimulator`] owns one synthetic mission timeline. Drivers feed it
//! [`Command`] values through [`MissionSimulator::apply`]; every accepted step
//! is written to the configured [`MissionChannel`] key and reported back as
//! [`Event`] values.

use std::time::Duration;

use crop_mission_channel::MissionChannel;
use crop_mission_core::{
    progress_fraction, scanning_status, spraying_status, Command, Drone, Event, GeoPoint,
    MissionPhase, MissionState, Plot, RunId, StreamPoint, StressClassifier, DEFAULT_PLOT_ACRES,
    STATUS_COMPLETE, STATUS_RESET, STATUS_SCAN_COMPLETE, STATUS_STARTING,
};
use crop_mission_system_point_generation::{
    derive_spray_points, PointGenerator, ScoreSource, DEFAULT_IMAGE_BASE,
};
use tracing::{debug, info, warn};

/// Interval between simulator steps when none is configured.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Number of scan readings generated per mission when none is configured.
pub const DEFAULT_POINT_COUNT: usize = 50;

/// Tunable parameters of a mission run.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Simulated time between two published steps. A zero interval never steps.
    pub tick_interval: Duration,
    /// Number of scan readings generated at mission start.
    pub point_count: usize,
    /// Surveyed area in acres.
    pub area_acres: f64,
    /// Logical timestamp of the simulator clock origin, in milliseconds.
    pub base_timestamp_ms: u64,
    /// Prefix used for synthesized frame references.
    pub image_base: String,
    /// Classifier deciding which readings the spray drone revisits.
    pub classifier: StressClassifier,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            point_count: DEFAULT_POINT_COUNT,
            area_acres: DEFAULT_PLOT_ACRES,
            base_timestamp_ms: 0,
            image_base: DEFAULT_IMAGE_BASE.to_owned(),
            classifier: StressClassifier::default(),
        }
    }
}

#[derive(Debug)]
struct Ticker {
    run: RunId,
    interval: Duration,
    accumulator: Duration,
}

impl Ticker {
    fn new(run: RunId, interval: Duration) -> Self {
        Self {
            run,
            interval,
            accumulator: Duration::ZERO,
        }
    }

    fn accumulate(&mut self, dt: Duration) {
        self.accumulator = self.accumulator.saturating_add(dt);
    }

    fn take_step(&mut self) -> bool {
        if self.interval.is_zero() || self.accumulator < self.interval {
            return false;
        }
        self.accumulator -= self.interval;
        true
    }
}

/// Tick-driven state machine that reveals scan readings, then spray points.
///
/// The tick timer is an owned resource: it is released on pause, reset and
/// completion, and always released before a new one is armed, so a step
/// scheduled for one run can never publish into another.
#[derive(Debug)]
pub struct MissionSimulator<C, S> {
    channel: C,
    key: String,
    config: SimulatorConfig,
    generator: PointGenerator,
    scores: S,
    phase: MissionPhase,
    paused: bool,
    run: RunId,
    ticker: Option<Ticker>,
    scan_points: Vec<StreamPoint>,
    spray_points: Vec<StreamPoint>,
    scan_cursor: usize,
    spray_cursor: usize,
    clock: Duration,
}

impl<C, S> MissionSimulator<C, S>
where
    C: MissionChannel,
    S: ScoreSource,
{
    /// Creates an idle simulator publishing under `key`.
    #[must_use]
    pub fn new(channel: C, key: impl Into<String>, config: SimulatorConfig, scores: S) -> Self {
        let generator = PointGenerator::new(config.image_base.clone());
        Self {
            channel,
            key: key.into(),
            config,
            generator,
            scores,
            phase: MissionPhase::Idle,
            paused: false,
            run: RunId::default(),
            ticker: None,
            scan_points: Vec::new(),
            spray_points: Vec::new(),
            scan_cursor: 0,
            spray_cursor: 0,
            clock: Duration::ZERO,
        }
    }

    /// Applies the provided command, publishing state and recording events.
    pub fn apply(&mut self, command: Command, out_events: &mut Vec<Event>) {
        match command {
            Command::Start { center } => self.handle_start(center, out_events),
            Command::Pause => self.handle_pause(out_events),
            Command::Resume => self.handle_resume(out_events),
            Command::Reset => self.handle_reset(out_events),
            Command::Tick { dt } => self.handle_tick(dt, out_events),
        }
    }

    /// Starts a mission around `center`, or resumes a paused one.
    pub fn start(&mut self, center: GeoPoint) -> Vec<Event> {
        self.apply_one(Command::Start { center })
    }

    /// Freezes tick progression.
    pub fn pause(&mut self) -> Vec<Event> {
        self.apply_one(Command::Pause)
    }

    /// Continues a paused mission from its current cursor.
    pub fn resume(&mut self) -> Vec<Event> {
        self.apply_one(Command::Resume)
    }

    /// Cancels the mission and publishes an empty stream.
    pub fn reset(&mut self) -> Vec<Event> {
        self.apply_one(Command::Reset)
    }

    /// Advances the simulator clock by `dt`.
    pub fn advance(&mut self, dt: Duration) -> Vec<Event> {
        self.apply_one(Command::Tick { dt })
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> MissionPhase {
        self.phase
    }

    /// Identifier of the current run.
    #[must_use]
    pub const fn run(&self) -> RunId {
        self.run
    }

    /// Reports whether a tick timer is armed.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Reports whether the mission is paused mid-run.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Channel key the simulator publishes under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Channel the simulator publishes to.
    #[must_use]
    pub const fn channel(&self) -> &C {
        &self.channel
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Scan readings generated for the current run.
    #[must_use]
    pub fn scan_points(&self) -> &[StreamPoint] {
        &self.scan_points
    }

    /// Spray points derived for the current run.
    #[must_use]
    pub fn spray_points(&self) -> &[StreamPoint] {
        &self.spray_points
    }

    /// Number of scan readings revealed so far.
    #[must_use]
    pub const fn scan_cursor(&self) -> usize {
        self.scan_cursor
    }

    /// Number of spray points revealed so far.
    #[must_use]
    pub const fn spray_cursor(&self) -> usize {
        self.spray_cursor
    }

    /// Fraction of all readings revealed, zero when nothing was generated.
    #[must_use]
    pub fn progress(&self) -> f64 {
        progress_fraction(
            self.scan_cursor + self.spray_cursor,
            self.scan_points.len() + self.spray_points.len(),
        )
    }

    fn apply_one(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        self.apply(command, &mut events);
        events
    }

    fn handle_start(&mut self, center: GeoPoint, out_events: &mut Vec<Event>) {
        if self.paused {
            self.handle_resume(out_events);
            return;
        }

        if self.ticker.is_some() {
            warn!(run = self.run.get(), phase = ?self.phase, "start ignored while mission is running");
            out_events.push(Event::StartIgnored { phase: self.phase });
            return;
        }

        let plot = match Plot::around(center, self.config.area_acres) {
            Ok(plot) => plot,
            Err(reason) => {
                warn!(%reason, "start rejected");
                out_events.push(Event::StartRejected { reason });
                return;
            }
        };

        self.release_ticker(out_events);
        self.run = self.run.next();

        let base_time = self.now_ms();
        self.scan_points = self.generator.generate(
            &plot,
            self.config.point_count,
            base_time,
            &mut self.scores,
        );
        self.spray_points = derive_spray_points(&self.scan_points, &self.config.classifier);
        self.scan_cursor = 0;
        self.spray_cursor = 0;

        info!(
            run = self.run.get(),
            scan = self.scan_points.len(),
            spray = self.spray_points.len(),
            "mission generated"
        );

        self.set_phase(MissionPhase::Scanning, out_events);
        self.publish(Drone::Scan, Vec::new(), STATUS_STARTING.to_owned(), out_events);
        self.arm_ticker(out_events);
    }

    fn handle_pause(&mut self, out_events: &mut Vec<Event>) {
        if self.ticker.is_none() {
            debug!(phase = ?self.phase, "pause ignored; no mission is running");
            return;
        }

        self.release_ticker(out_events);
        self.paused = true;
        info!(run = self.run.get(), cursor = self.scan_cursor, "mission paused");
    }

    fn handle_resume(&mut self, out_events: &mut Vec<Event>) {
        if !self.paused {
            debug!(phase = ?self.phase, "resume ignored; mission is not paused");
            return;
        }

        self.paused = false;
        self.arm_ticker(out_events);
        info!(run = self.run.get(), cursor = self.scan_cursor, "mission resumed");
    }

    fn handle_reset(&mut self, out_events: &mut Vec<Event>) {
        self.release_ticker(out_events);
        self.paused = false;
        self.run = self.run.next();
        self.scan_points.clear();
        self.spray_points.clear();
        self.scan_cursor = 0;
        self.spray_cursor = 0;

        self.set_phase(MissionPhase::Idle, out_events);
        self.publish(Drone::Scan, Vec::new(), STATUS_RESET.to_owned(), out_events);
    }

    fn handle_tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.clock = self.clock.saturating_add(dt);

        if let Some(ticker) = self.ticker.as_mut() {
            ticker.accumulate(dt);
        }

        while self.ticker.as_mut().map_or(false, Ticker::take_step) {
            self.step(out_events);
        }
    }

    fn step(&mut self, out_events: &mut Vec<Event>) {
        match self.phase {
            MissionPhase::Scanning => {
                if self.scan_cursor < self.scan_points.len() {
                    self.scan_cursor += 1;
                    let stream = self.scan_points[..self.scan_cursor].to_vec();
                    let status = scanning_status(self.scan_cursor, self.scan_points.len());
                    self.publish(Drone::Scan, stream, status, out_events);
                } else {
                    self.set_phase(MissionPhase::Transitioning, out_events);
                    let stream = self.scan_points.clone();
                    self.publish(
                        Drone::Spray,
                        stream,
                        STATUS_SCAN_COMPLETE.to_owned(),
                        out_events,
                    );
                    self.set_phase(MissionPhase::Spraying, out_events);
                }
            }
            MissionPhase::Transitioning | MissionPhase::Spraying => {
                if self.spray_cursor < self.spray_points.len() {
                    self.spray_cursor += 1;
                    let stream = self.revealed_stream();
                    let status = spraying_status(self.spray_cursor, self.spray_points.len());
                    self.publish(Drone::Spray, stream, status, out_events);
                } else {
                    self.set_phase(MissionPhase::Complete, out_events);
                    let stream = self.revealed_stream();
                    self.publish(Drone::Scan, stream, STATUS_COMPLETE.to_owned(), out_events);
                    self.release_ticker(out_events);
                }
            }
            MissionPhase::Idle | MissionPhase::Complete => self.release_ticker(out_events),
        }
    }

    fn revealed_stream(&self) -> Vec<StreamPoint> {
        let mut stream = Vec::with_capacity(self.scan_points.len() + self.spray_cursor);
        stream.extend_from_slice(&self.scan_points);
        stream.extend_from_slice(&self.spray_points[..self.spray_cursor]);
        stream
    }

    fn publish(
        &self,
        drone: Drone,
        stream: Vec<StreamPoint>,
        status: String,
        out_events: &mut Vec<Event>,
    ) {
        let stream_len = stream.len();
        let state = MissionState::simulated(drone, stream, status);
        self.channel.publish(&self.key, &state);
        debug!(
            run = self.run.get(),
            key = %self.key,
            ?drone,
            stream_len,
            status = %state.status,
            "mission state published"
        );
        out_events.push(Event::Published {
            run: self.run,
            drone,
            stream_len,
        });
    }

    fn set_phase(&mut self, phase: MissionPhase, out_events: &mut Vec<Event>) {
        if self.phase == phase {
            return;
        }
        self.phase = phase;
        info!(run = self.run.get(), ?phase, "mission phase changed");
        out_events.push(Event::PhaseChanged {
            run: self.run,
            phase,
        });
    }

    fn arm_ticker(&mut self, out_events: &mut Vec<Event>) {
        self.release_ticker(out_events);
        if self.config.tick_interval.is_zero() {
            warn!("tick interval is zero; mission will not advance");
        }
        self.ticker = Some(Ticker::new(self.run, self.config.tick_interval));
        out_events.push(Event::TickerArmed { run: self.run });
    }

    fn release_ticker(&mut self, out_events: &mut Vec<Event>) {
        if let Some(ticker) = self.ticker.take() {
            out_events.push(Event::TickerReleased { run: ticker.run });
        }
    }

    fn now_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.clock.as_millis()).unwrap_or(u64::MAX);
        self.config.base_timestamp_ms.saturating_add(elapsed)
    }
}
