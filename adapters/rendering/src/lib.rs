#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Playback renderer and presentation contracts for crop mission adapters.
//!
//! The renderer consumes mission states from a channel and reveals the
//! received readings progressively in a deterministic geographic order.
//! Presentation backends draw the resulting [`Dashboard`].

mod feed;
mod images;
mod log;
mod playback;
mod timeline;
mod viewport;

use anyhow::Result as AnyResult;
use std::{error::Error, fmt};

pub use feed::MissionFeed;
pub use images::{image_feed, ImageCard, IMAGE_FEED_LEN};
pub use log::{clock_label, live_log, LogEntry};
pub use playback::{
    HeatPoint, Marker, MarkerStyle, PlaybackFrame, PlaybackRenderer, DEFAULT_RENDER_TICK,
    SCAN_ZOOM, SPRAY_ZOOM,
};
pub use timeline::{StatusTimeline, StepState, MISSION_STEPS};
pub use viewport::Viewport;

/// Everything a presentation backend draws for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Dashboard {
    /// Map overlay content.
    pub frame: PlaybackFrame,
    /// Mission step timeline.
    pub timeline: StatusTimeline,
    /// One line per received reading, in arrival order.
    pub log: Vec<LogEntry>,
    /// Capture cards for the most recent readings.
    pub images: Vec<ImageCard>,
}

/// Trait implemented by adapters that present dashboards to the user.
pub trait PresentationBackend {
    /// Draws the provided dashboard.
    fn present(&mut self, dashboard: &Dashboard) -> AnyResult<()>;

    /// Called once when the presentation loop ends.
    fn finish(&mut self) -> AnyResult<()> {
        Ok(())
    }
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// Grids must have at least one column and one row.
    InvalidGrid {
        /// Provided column count.
        columns: u32,
        /// Provided row count.
        rows: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGrid { columns, rows } => {
                write!(
                    f,
                    "grid must have positive dimensions (received {columns}x{rows})"
                )
            }
        }
    }
}

impl Error for RenderingError {}
