#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Synthesizes geo-tagged stress readings for a simulated scan pass and
//! derives the spray subset from them.

use crop_mission_core::{
    Plot, StreamPoint, StressClassifier, SCAN_TIMESTAMP_SPACING_MS, SPRAY_TIMESTAMP_OFFSET_MS,
    TREATED_STRESS_SCORE,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Image reference prefix used when none is configured.
pub const DEFAULT_IMAGE_BASE: &str = "https://demo.storage/farm";

/// Supplies stress scores to the generator, one per point.
pub trait ScoreSource {
    /// Returns the next raw score.
    fn next_score(&mut self) -> f64;
}

impl<S: ScoreSource + ?Sized> ScoreSource for &mut S {
    fn next_score(&mut self) -> f64 {
        (**self).next_score()
    }
}

impl<S: ScoreSource + ?Sized> ScoreSource for Box<S> {
    fn next_score(&mut self) -> f64 {
        (**self).next_score()
    }
}

/// Uniform scores in `[0, 1)` drawn from a seeded ChaCha stream.
#[derive(Clone, Debug)]
pub struct SeededScores {
    rng: ChaCha8Rng,
}

impl SeededScores {
    /// Creates a reproducible score stream from the provided seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl ScoreSource for SeededScores {
    fn next_score(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a scripted list of scores, cycling when exhausted.
#[derive(Clone, Debug, Default)]
pub struct FixedScores {
    scores: Vec<f64>,
    index: usize,
}

impl FixedScores {
    /// Creates a source that yields `scores` in order.
    #[must_use]
    pub fn new(scores: Vec<f64>) -> Self {
        Self { scores, index: 0 }
    }
}

impl ScoreSource for FixedScores {
    fn next_score(&mut self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }

        let score = self.scores[self.index % self.scores.len()];
        self.index = (self.index + 1) % self.scores.len();
        score
    }
}

/// Lays scan readings out on a square grid spanning a plot.
#[derive(Clone, Debug)]
pub struct PointGenerator {
    image_base: String,
}

impl Default for PointGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_BASE)
    }
}

impl PointGenerator {
    /// Creates a generator that references frames under `image_base`.
    #[must_use]
    pub fn new(image_base: impl Into<String>) -> Self {
        let mut image_base = image_base.into();
        while image_base.ends_with('/') {
            let _ = image_base.pop();
        }
        Self { image_base }
    }

    /// Generates `count` readings inside `plot`.
    ///
    /// Point `i` sits at the centre of grid cell `(i / size, i % size)` where
    /// `size = ceil(sqrt(count))`, so positions depend only on the index and
    /// the plot while scores come from `scores`. Timestamps are spaced one
    /// logical second apart starting at `base_time`.
    pub fn generate<S>(
        &self,
        plot: &Plot,
        count: usize,
        base_time: u64,
        scores: &mut S,
    ) -> Vec<StreamPoint>
    where
        S: ScoreSource + ?Sized,
    {
        let size = grid_size(count);
        if size == 0 {
            return Vec::new();
        }

        let lat_step = plot.lat_span() / size as f64;
        let lng_step = plot.lng_span() / size as f64;

        (0..count)
            .map(|index| {
                let row = index / size;
                let column = index % size;
                let lat = plot.south() + (row as f64 + 0.5) * lat_step;
                let lng = plot.west() + (column as f64 + 0.5) * lng_step;
                let offset = (index as u64).saturating_mul(SCAN_TIMESTAMP_SPACING_MS);

                StreamPoint::new(
                    base_time.saturating_add(offset),
                    lat.clamp(plot.south(), plot.north()),
                    lng.clamp(plot.west(), plot.east()),
                    sanitize_score(scores.next_score()),
                    format!("{}/image{}.png", self.image_base, index + 1),
                )
            })
            .collect()
    }
}

/// Side length of the square grid that holds `count` points.
#[must_use]
pub fn grid_size(count: usize) -> usize {
    if count == 0 {
        return 0;
    }

    let mut size = (count as f64).sqrt().ceil() as usize;
    while size.saturating_mul(size) < count {
        size += 1;
    }
    while size > 1 && (size - 1) * (size - 1) >= count {
        size -= 1;
    }
    size
}

/// Derives treated copies of every spray-eligible scan point.
///
/// Relative order is preserved. Each copy is shifted by
/// [`SPRAY_TIMESTAMP_OFFSET_MS`] and carries [`TREATED_STRESS_SCORE`].
#[must_use]
pub fn derive_spray_points(
    scan_points: &[StreamPoint],
    classifier: &StressClassifier,
) -> Vec<StreamPoint> {
    scan_points
        .iter()
        .filter(|point| classifier.is_spray_eligible(point.stress_score))
        .map(|point| StreamPoint {
            timestamp: point.timestamp.saturating_add(SPRAY_TIMESTAMP_OFFSET_MS),
            stress_score: TREATED_STRESS_SCORE,
            ..point.clone()
        })
        .collect()
}

/// Largest score the generator emits; generated scores stay below 1.
const MAX_SCORE: f64 = 1.0 - f64::EPSILON;

fn sanitize_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, MAX_SCORE)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_size_is_ceiling_of_square_root() {
        assert_eq!(grid_size(0), 0);
        assert_eq!(grid_size(1), 1);
        assert_eq!(grid_size(4), 2);
        assert_eq!(grid_size(5), 3);
        assert_eq!(grid_size(50), 8);
    }

    #[test]
    fn fixed_scores_cycle() {
        let mut scores = FixedScores::new(vec![0.1, 0.9]);
        let drawn: Vec<f64> = (0..3).map(|_| scores.next_score()).collect();

        assert_eq!(drawn, vec![0.1, 0.9, 0.1]);
        assert_eq!(FixedScores::default().next_score(), 0.0);
    }

    #[test]
    fn scores_are_sanitized() {
        assert_eq!(sanitize_score(f64::NAN), 0.0);
        assert_eq!(sanitize_score(-0.5), 0.0);
        assert_eq!(sanitize_score(0.25), 0.25);
        assert!(sanitize_score(1.0) < 1.0);
        assert!(sanitize_score(1.5) < 1.0);
        assert!(sanitize_score(f64::INFINITY) < 1.0);
    }

    #[test]
    fn trailing_slashes_are_trimmed_from_image_base() {
        let generator = PointGenerator::new("https://frames.example//");
        let plot = Plot::from_bounds(0.0, 1.0, 0.0, 1.0);
        let points = generator.generate(&plot, 1, 0, &mut FixedScores::new(vec![0.4]));

        assert_eq!(points[0].image_url, "https://frames.example/image1.png");
    }
}
