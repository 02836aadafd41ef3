//! Strip of the most recent frame captures.

use crop_mission_core::{StreamPoint, StressBand, StressClassifier};

use crate::clock_label;

/// Number of captures shown in the strip.
pub const IMAGE_FEED_LEN: usize = 6;

/// One capture card in the image strip.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageCard {
    /// Identity of the reading the capture belongs to.
    pub timestamp: u64,
    /// Band of the reading.
    pub band: StressBand,
    /// Band label printed on the card.
    pub label: &'static str,
    /// Card tint, a `#rrggbb` token.
    pub tint: String,
    /// Capture time as `HH:MM:SS`.
    pub clock: String,
    /// Frame reference carried by the reading.
    pub image_url: String,
}

/// Cards for the last `limit` readings, oldest first.
#[must_use]
pub fn image_feed(
    stream: &[StreamPoint],
    classifier: &StressClassifier,
    limit: usize,
) -> Vec<ImageCard> {
    let start = stream.len().saturating_sub(limit);
    stream[start..]
        .iter()
        .map(|point| {
            let band = classifier.classify(point.stress_score);
            ImageCard {
                timestamp: point.timestamp,
                band,
                label: band.label(),
                tint: band.color().hex(),
                clock: clock_label(point.timestamp),
                image_url: point.image_url.clone(),
            }
        })
        .collect()
}
