//! Mission step timeline shown beside the map.

use crop_mission_core::Drone;

/// Ordered mission steps.
pub const MISSION_STEPS: [&str; 6] = [
    "Connect to Scan Drone",
    "Receive Multispectral Frames",
    "Run ML Stress Detection",
    "Plot Geo-tags on Map",
    "Switch to Spray Drone",
    "Execute Spray Mission",
];

const READINGS_PER_STEP: usize = 5;
const LAST_SCAN_STEP: usize = 4;
const SPRAY_STEP: usize = 5;

/// Completion state of a timeline step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepState {
    /// The step has finished.
    Done,
    /// The step is in progress.
    Current,
    /// The step has not started.
    Pending,
}

/// Position of the mission along [`MISSION_STEPS`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusTimeline {
    current: usize,
}

impl StatusTimeline {
    /// Derives the current step from the received stream length and drone.
    ///
    /// An empty stream sits on the first step, the spray overlay on the last,
    /// and scanning advances one step per five readings up to the hand-over
    /// step.
    #[must_use]
    pub fn for_stream(stream_len: usize, drone: Drone) -> Self {
        let current = if stream_len == 0 {
            0
        } else if drone == Drone::Spray {
            SPRAY_STEP
        } else {
            (stream_len / READINGS_PER_STEP).min(LAST_SCAN_STEP)
        };
        Self { current }
    }

    /// Index of the step in progress.
    #[must_use]
    pub const fn current_step(&self) -> usize {
        self.current
    }

    /// Every step with its completion state.
    pub fn steps(&self) -> impl Iterator<Item = (&'static str, StepState)> + '_ {
        MISSION_STEPS
            .iter()
            .enumerate()
            .map(move |(index, label)| {
                let state = match index.cmp(&self.current) {
                    std::cmp::Ordering::Less => StepState::Done,
                    std::cmp::Ordering::Equal => StepState::Current,
                    std::cmp::Ordering::Greater => StepState::Pending,
                };
                (*label, state)
            })
    }
}
