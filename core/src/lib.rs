#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the crop mission workspace.
//!
//! This crate defines the message surface that connects the mission
//! simulator, the state channel and the playback adapters. Drivers submit
//! [`Command`] values to the simulator, the simulator executes them via its
//! `apply` entry point, publishes [`MissionState`] snapshots to the channel
//! and reports what happened through [`Event`] values. Renderers consume the
//! published snapshots and never talk to the simulator directly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod classify;
mod plot;

pub use classify::{
    BandColor, StressBand, StressClassifier, HIGH_STRESS_THRESHOLD, MEDIUM_STRESS_THRESHOLD,
    SPRAY_ELIGIBILITY_THRESHOLD,
};
pub use plot::{
    GeoPoint, Plot, PlotError, DEFAULT_PLOT_ACRES, METERS_PER_DEGREE_LATITUDE,
    SQUARE_METERS_PER_ACRE,
};

/// Channel key used when no explicit key is configured.
pub const DEFAULT_CHANNEL_KEY: &str = "missions/current";

/// Logical spacing between consecutive scan readings.
pub const SCAN_TIMESTAMP_SPACING_MS: u64 = 1_000;

/// Logical delay between scanning a point and spraying it.
pub const SPRAY_TIMESTAMP_OFFSET_MS: u64 = 5_000;

/// Stress score assigned to a point after it has been treated.
pub const TREATED_STRESS_SCORE: f64 = 0.1;

/// Status published when a new mission begins.
pub const STATUS_STARTING: &str = "Starting scan mission...";

/// Status published when every scan point has been revealed.
pub const STATUS_SCAN_COMPLETE: &str = "Scan complete. Preparing for spray mission...";

/// Status published once the spray drone has treated every point.
pub const STATUS_COMPLETE: &str = "Mission complete! All areas treated.";

/// Status published after the mission has been reset.
pub const STATUS_RESET: &str = "Mission reset";

/// Formats the progress status emitted while scanning.
#[must_use]
pub fn scanning_status(revealed: usize, total: usize) -> String {
    format!("Scanning point {revealed}/{total}")
}

/// Formats the progress status emitted while spraying.
#[must_use]
pub fn spraying_status(sprayed: usize, total: usize) -> String {
    format!("Spraying point {sprayed}/{total}")
}

/// Fraction of `total` covered by `done`, clamped to `0.0..=1.0`.
///
/// An empty total reports zero progress rather than NaN.
#[must_use]
pub fn progress_fraction(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (done as f64 / total as f64).clamp(0.0, 1.0)
}

/// Single geo-tagged crop stress reading.
///
/// Missing fields decode to their defaults so that partially written
/// payloads never abort decoding of an otherwise valid stream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamPoint {
    /// Logical capture time in milliseconds; doubles as identity.
    pub timestamp: u64,
    /// Latitude of the reading in degrees.
    pub lat: f64,
    /// Longitude of the reading in degrees.
    pub lng: f64,
    /// Normalized stress score in the range 0.0..=1.0.
    pub stress_score: f64,
    /// Opaque reference to the captured frame.
    pub image_url: String,
}

impl StreamPoint {
    /// Creates a new stream point.
    #[must_use]
    pub fn new(
        timestamp: u64,
        lat: f64,
        lng: f64,
        stress_score: f64,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            lat,
            lng,
            stress_score,
            image_url: image_url.into(),
        }
    }

    /// Returns the reading's location.
    #[must_use]
    pub const fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Selects whether mission data is simulated or fed by real drones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionMode {
    /// Simulated mission produced by the local simulator.
    #[default]
    Test,
    /// Externally fed mission data.
    Live,
}

/// Identifies which drone overlay is currently active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Drone {
    /// Scan drone collecting stress readings.
    #[default]
    Scan,
    /// Spray drone treating high-stress points.
    Spray,
}

/// Snapshot of a mission as carried by the state channel.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionState {
    /// Whether the mission is simulated or live.
    pub mode: MissionMode,
    /// Drone whose overlay is active.
    pub drone: Drone,
    /// Cumulative readings revealed so far.
    pub stream: Vec<StreamPoint>,
    /// Informational progress text.
    pub status: String,
}

impl MissionState {
    /// Creates a simulated mission snapshot.
    #[must_use]
    pub fn simulated(drone: Drone, stream: Vec<StreamPoint>, status: impl Into<String>) -> Self {
        Self {
            mode: MissionMode::Test,
            drone,
            stream,
            status: status.into(),
        }
    }

    /// Reports whether any reading has been revealed yet.
    #[must_use]
    pub fn is_started(&self) -> bool {
        !self.stream.is_empty()
    }
}

/// Lifecycle phase of the mission simulator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MissionPhase {
    /// No mission is loaded.
    #[default]
    Idle,
    /// Scan readings are being revealed one per tick.
    Scanning,
    /// Every scan reading is revealed; the spray drone is taking over.
    Transitioning,
    /// Spray points are being revealed one per tick.
    Spraying,
    /// Every scan and spray point has been published.
    Complete,
}

/// Identifier of a single start-to-reset mission run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(u64);

impl RunId {
    /// Creates a new run identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Returns the identifier that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Commands that express all permissible simulator mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Starts a new mission centred on the provided coordinate, or resumes a
    /// paused one.
    Start {
        /// Center of the plot to survey.
        center: GeoPoint,
    },
    /// Freezes tick progression without losing position.
    Pause,
    /// Continues a paused mission from its current cursor.
    Resume,
    /// Cancels the mission and publishes an empty stream.
    Reset,
    /// Advances the simulator clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Events reported by the simulator after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulator entered a new phase.
    PhaseChanged {
        /// Run that owns the transition.
        run: RunId,
        /// Phase that became active.
        phase: MissionPhase,
    },
    /// Confirms that a snapshot was written to the channel.
    Published {
        /// Run that produced the snapshot.
        run: RunId,
        /// Drone overlay carried by the snapshot.
        drone: Drone,
        /// Number of points carried by the snapshot.
        stream_len: usize,
    },
    /// Reports that a start request arrived while a mission was running.
    StartIgnored {
        /// Phase the simulator was in when the request arrived.
        phase: MissionPhase,
    },
    /// Reports that a start request carried an unusable plot center.
    StartRejected {
        /// Reason the plot could not be built.
        reason: PlotError,
    },
    /// Confirms that the tick timer was armed for a run.
    TickerArmed {
        /// Run that owns the timer.
        run: RunId,
    },
    /// Confirms that the tick timer of a run was released.
    TickerReleased {
        /// Run that owned the timer.
        run: RunId,
    },
}

#[cfg(test)]
mod tests {
    use super::{progress_fraction, Drone, MissionMode, MissionState, RunId, StreamPoint};

    #[test]
    fn progress_guards_empty_totals() {
        assert_eq!(progress_fraction(0, 0), 0.0);
        assert_eq!(progress_fraction(3, 0), 0.0);
        assert_eq!(progress_fraction(1, 4), 0.25);
        assert_eq!(progress_fraction(9, 4), 1.0);
    }

    #[test]
    fn partial_payload_decodes_with_defaults() {
        let state: MissionState =
            serde_json::from_str(r#"{"drone":"spray"}"#).expect("partial payload decodes");

        assert_eq!(state.mode, MissionMode::Test);
        assert_eq!(state.drone, Drone::Spray);
        assert!(state.stream.is_empty());
        assert!(state.status.is_empty());
    }

    #[test]
    fn stream_points_use_camel_case_on_the_wire() {
        let point = StreamPoint::new(7, 1.5, 2.5, 0.25, "frame.png");
        let json = serde_json::to_value(&point).expect("serialize");

        assert_eq!(json["stressScore"], 0.25);
        assert_eq!(json["imageUrl"], "frame.png");
    }

    #[test]
    fn legacy_payload_without_status_is_accepted() {
        let state: MissionState = serde_json::from_str(
            r#"{"mode":"test","drone":"scan","stream":[{"timestamp":1,"lat":0.5,"lng":0.25,"stressScore":0.9}]}"#,
        )
        .expect("legacy payload decodes");

        assert!(state.is_started());
        assert_eq!(state.stream[0].image_url, "");
        assert_eq!(state.status, "");
    }

    #[test]
    fn run_ids_advance_monotonically() {
        let first = RunId::default();
        assert_eq!(first.next().get(), 1);
        assert!(first.next() > first);
    }
}
