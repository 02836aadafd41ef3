//! Progressive replay of a published mission stream.

use std::{
    cmp::Ordering,
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
    time::Duration,
};

use crop_mission_core::{
    progress_fraction, Drone, GeoPoint, MissionMode, MissionState, StreamPoint, StressBand,
    StressClassifier,
};

use crate::{image_feed, live_log, Dashboard, StatusTimeline, IMAGE_FEED_LEN};

/// Interval between two reveal steps when none is configured.
pub const DEFAULT_RENDER_TICK: Duration = Duration::from_millis(150);

/// Map zoom used while the scan overlay is active.
pub const SCAN_ZOOM: u8 = 15;

/// Map zoom used while the spray overlay is active.
pub const SPRAY_ZOOM: u8 = 14;

/// Circle marker for a revealed low-stress reading.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    /// Identity of the reading.
    pub timestamp: u64,
    /// Position of the reading.
    pub location: GeoPoint,
    /// Raw stress score.
    pub stress_score: f64,
    /// Band used to color the marker.
    pub band: StressBand,
}

/// Weighted heatmap sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeatPoint {
    /// Position of the sample.
    pub location: GeoPoint,
    /// Heat intensity, equal to the stress score.
    pub intensity: f64,
    /// Band of the stress score under the renderer's classifier.
    pub band: StressBand,
}

/// Marker styling that depends on the active overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerStyle {
    /// Marker radius in screen pixels.
    pub radius: u8,
    /// Fill opacity in the range 0.0..=1.0.
    pub fill_opacity: f32,
}

impl MarkerStyle {
    /// Styling applied for the provided drone overlay.
    #[must_use]
    pub const fn for_drone(drone: Drone) -> Self {
        match drone {
            Drone::Scan => Self {
                radius: 8,
                fill_opacity: 0.7,
            },
            Drone::Spray => Self {
                radius: 6,
                fill_opacity: 0.5,
            },
        }
    }
}

/// Everything a map front-end needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackFrame {
    /// Mission mode carried by the last snapshot.
    pub mode: MissionMode,
    /// Active drone overlay.
    pub drone: Drone,
    /// Status text carried by the last snapshot.
    pub status: String,
    /// Revealed readings at or below the spray threshold.
    pub scan_markers: Vec<Marker>,
    /// Heatmap source samples.
    pub heatmap: Vec<HeatPoint>,
    /// Revealed spray-eligible readings in reveal order.
    pub spray_path: Vec<GeoPoint>,
    /// Number of revealed readings.
    pub revealed: usize,
    /// Number of readings known to the renderer.
    pub total: usize,
    /// `revealed / total`, zero when nothing is known.
    pub progress: f64,
    /// Suggested map zoom level.
    pub zoom: u8,
    /// Marker styling for the active overlay.
    pub marker_style: MarkerStyle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PointKey {
    timestamp: u64,
    lat: u64,
    lng: u64,
    stress: u64,
}

impl PointKey {
    fn of(point: &StreamPoint) -> Self {
        Self {
            timestamp: point.timestamp,
            lat: point.lat.to_bits(),
            lng: point.lng.to_bits(),
            stress: point.stress_score.to_bits(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct StreamKey {
    len: usize,
    fingerprint: u64,
}

impl StreamKey {
    fn of(stream: &[StreamPoint]) -> Self {
        let fingerprint = stream.iter().fold(0_u64, |acc, point| {
            let mut hasher = DefaultHasher::new();
            PointKey::of(point).hash(&mut hasher);
            acc.wrapping_add(hasher.finish())
        });
        Self {
            len: stream.len(),
            fingerprint,
        }
    }
}

/// Replays a mission stream at its own pace.
///
/// Points are revealed in `(lng, lat)` order regardless of the order the
/// channel delivered them in. Once a point has been revealed its position in
/// the replay order is pinned; later snapshots only reorder the unrevealed
/// remainder.
#[derive(Clone, Debug)]
pub struct PlaybackRenderer {
    classifier: StressClassifier,
    tick_interval: Duration,
    accumulator: Duration,
    mode: MissionMode,
    drone: Drone,
    status: String,
    received: Vec<StreamPoint>,
    sorted: Vec<StreamPoint>,
    stream_key: StreamKey,
    scan_cursor: usize,
    spray_cursor: usize,
}

impl Default for PlaybackRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_TICK, StressClassifier::default())
    }
}

impl PlaybackRenderer {
    /// Creates a renderer revealing one point per `tick_interval`.
    #[must_use]
    pub fn new(tick_interval: Duration, classifier: StressClassifier) -> Self {
        Self {
            classifier,
            tick_interval,
            accumulator: Duration::ZERO,
            mode: MissionMode::Test,
            drone: Drone::Scan,
            status: String::new(),
            received: Vec::new(),
            sorted: Vec::new(),
            stream_key: StreamKey::default(),
            scan_cursor: 0,
            spray_cursor: 0,
        }
    }

    /// Absorbs a snapshot received from the channel.
    ///
    /// A stream shorter than the one already known starts a new run and
    /// rewinds both cursors, as does a snapshot that no longer contains
    /// every revealed point.
    pub fn ingest(&mut self, state: &MissionState) {
        self.mode = state.mode;
        self.drone = state.drone;
        self.status.clone_from(&state.status);

        let key = StreamKey::of(&state.stream);
        if key == self.stream_key {
            return;
        }

        if state.stream.len() < self.sorted.len() {
            self.rewind();
        }

        let incoming = occurrences(&state.stream);
        let mut pinned_counts = occurrences(&self.sorted[..self.pinned_len()]);
        if pinned_counts
            .iter()
            .any(|(key, count)| incoming.get(key).copied().unwrap_or(0) < *count)
        {
            self.rewind();
            pinned_counts.clear();
        }
        let pinned = self.pinned_len();

        let mut remainder: Vec<StreamPoint> = state
            .stream
            .iter()
            .filter(|point| match pinned_counts.get_mut(&PointKey::of(point)) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    false
                }
                _ => true,
            })
            .cloned()
            .collect();
        remainder.sort_by(replay_order);

        self.sorted.truncate(pinned);
        self.sorted.extend(remainder);
        self.received.clone_from(&state.stream);
        self.stream_key = key;
    }

    /// Absorbs an optional snapshot; `None` is treated as an empty mission.
    pub fn ingest_optional(&mut self, state: Option<&MissionState>) {
        match state {
            Some(state) => self.ingest(state),
            None => self.ingest(&MissionState::default()),
        }
    }

    /// Advances the local clock, revealing one point per elapsed interval.
    ///
    /// Returns the number of reveal steps taken.
    pub fn advance(&mut self, dt: Duration) -> usize {
        if self.tick_interval.is_zero() {
            return 0;
        }

        self.accumulator = self.accumulator.saturating_add(dt);
        let mut steps = 0;
        while self.accumulator >= self.tick_interval {
            self.accumulator -= self.tick_interval;
            self.tick();
            steps += 1;
        }
        steps
    }

    /// Reveals one more point for the active drone, stopping at the end.
    pub fn tick(&mut self) {
        let total = self.sorted.len();
        let cursor = match self.drone {
            Drone::Scan => &mut self.scan_cursor,
            Drone::Spray => &mut self.spray_cursor,
        };
        *cursor = (*cursor + 1).min(total);
    }

    /// Reveals every known point for the active drone.
    pub fn reveal_all(&mut self) {
        let total = self.sorted.len();
        match self.drone {
            Drone::Scan => self.scan_cursor = total,
            Drone::Spray => self.spray_cursor = total,
        }
    }

    /// Known points in replay order.
    #[must_use]
    pub fn sorted_points(&self) -> &[StreamPoint] {
        &self.sorted
    }

    /// Reveal cursor of the scan overlay.
    #[must_use]
    pub const fn scan_cursor(&self) -> usize {
        self.scan_cursor
    }

    /// Reveal cursor of the spray overlay.
    #[must_use]
    pub const fn spray_cursor(&self) -> usize {
        self.spray_cursor
    }

    /// Points revealed for the active drone.
    #[must_use]
    pub fn revealed(&self) -> &[StreamPoint] {
        &self.sorted[..self.active_cursor()]
    }

    /// Builds the map layers for the current reveal state.
    #[must_use]
    pub fn frame(&self) -> PlaybackFrame {
        let cursor = self.active_cursor();
        let revealed = &self.sorted[..cursor];

        let scan_markers = revealed
            .iter()
            .filter(|point| !self.classifier.is_spray_eligible(point.stress_score))
            .map(|point| Marker {
                timestamp: point.timestamp,
                location: point.location(),
                stress_score: point.stress_score,
                band: self.classifier.classify(point.stress_score),
            })
            .collect();

        let spray_path = revealed
            .iter()
            .filter(|point| self.classifier.is_spray_eligible(point.stress_score))
            .map(StreamPoint::location)
            .collect();

        let heat_source = match self.drone {
            Drone::Scan => revealed,
            Drone::Spray => &self.sorted[cursor..],
        };
        let heatmap = heat_source
            .iter()
            .map(|point| HeatPoint {
                location: point.location(),
                intensity: point.stress_score,
                band: self.classifier.classify(point.stress_score),
            })
            .collect();

        PlaybackFrame {
            mode: self.mode,
            drone: self.drone,
            status: self.status.clone(),
            scan_markers,
            heatmap,
            spray_path,
            revealed: cursor,
            total: self.sorted.len(),
            progress: progress_fraction(cursor, self.sorted.len()),
            zoom: match self.drone {
                Drone::Scan => SCAN_ZOOM,
                Drone::Spray => SPRAY_ZOOM,
            },
            marker_style: MarkerStyle::for_drone(self.drone),
        }
    }

    /// Builds the frame together with the side-panel widgets.
    #[must_use]
    pub fn dashboard(&self) -> Dashboard {
        Dashboard {
            frame: self.frame(),
            timeline: StatusTimeline::for_stream(self.received.len(), self.drone),
            log: live_log(&self.received, &self.classifier),
            images: image_feed(&self.received, &self.classifier, IMAGE_FEED_LEN),
        }
    }

    fn active_cursor(&self) -> usize {
        let cursor = match self.drone {
            Drone::Scan => self.scan_cursor,
            Drone::Spray => self.spray_cursor,
        };
        cursor.min(self.sorted.len())
    }

    fn pinned_len(&self) -> usize {
        self.scan_cursor
            .max(self.spray_cursor)
            .min(self.sorted.len())
    }

    fn rewind(&mut self) {
        self.sorted.clear();
        self.scan_cursor = 0;
        self.spray_cursor = 0;
        self.accumulator = Duration::ZERO;
    }
}

fn occurrences(points: &[StreamPoint]) -> HashMap<PointKey, usize> {
    let mut counts = HashMap::new();
    for point in points {
        *counts.entry(PointKey::of(point)).or_insert(0) += 1;
    }
    counts
}

fn replay_order(a: &StreamPoint, b: &StreamPoint) -> Ordering {
    a.lng
        .total_cmp(&b.lng)
        .then_with(|| a.lat.total_cmp(&b.lat))
        .then_with(|| a.timestamp.cmp(&b.timestamp))
        .then_with(|| a.stress_score.total_cmp(&b.stress_score))
        .then_with(|| a.image_url.cmp(&b.image_url))
}
