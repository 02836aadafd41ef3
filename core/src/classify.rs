//! Stress score classification shared by producers and renderers.

/// Scores strictly above this value are at least [`StressBand::Medium`].
pub const MEDIUM_STRESS_THRESHOLD: f64 = 0.3;

/// Scores strictly above this value are [`StressBand::High`].
pub const HIGH_STRESS_THRESHOLD: f64 = 0.7;

/// Scores strictly above this value are revisited by the spray drone.
///
/// Independent from the band thresholds above.
pub const SPRAY_ELIGIBILITY_THRESHOLD: f64 = 0.5;

/// Severity band assigned to a stress score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StressBand {
    /// Healthy crop.
    Low,
    /// Moderately stressed crop.
    Medium,
    /// Highly stressed crop.
    High,
}

impl StressBand {
    /// Human readable label for the band.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Healthy",
            Self::Medium => "Moderate",
            Self::High => "High Stress",
        }
    }

    /// Display color associated with the band.
    #[must_use]
    pub const fn color(self) -> BandColor {
        match self {
            Self::Low => BandColor::from_rgb(0x22, 0xc5, 0x5e),
            Self::Medium => BandColor::from_rgb(0xf9, 0x73, 0x16),
            Self::High => BandColor::from_rgb(0xef, 0x44, 0x44),
        }
    }
}

/// Opaque RGB color token attached to a band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BandColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl BandColor {
    /// Creates a new color from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// CSS-style hex token, e.g. `#22c55e`.
    #[must_use]
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

/// Maps stress scores to bands and decides spray eligibility.
///
/// Band thresholds and the spray threshold are stored separately; adjusting
/// one never moves the other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StressClassifier {
    medium_above: f64,
    high_above: f64,
    spray_above: f64,
}

impl Default for StressClassifier {
    fn default() -> Self {
        Self::new(
            MEDIUM_STRESS_THRESHOLD,
            HIGH_STRESS_THRESHOLD,
            SPRAY_ELIGIBILITY_THRESHOLD,
        )
    }
}

impl StressClassifier {
    /// Creates a classifier with explicit thresholds. All comparisons are
    /// strict: a score equal to a threshold stays in the lower band.
    #[must_use]
    pub const fn new(medium_above: f64, high_above: f64, spray_above: f64) -> Self {
        Self {
            medium_above,
            high_above,
            spray_above,
        }
    }

    /// Returns a copy using new band thresholds and the current spray threshold.
    #[must_use]
    pub const fn with_band_thresholds(self, medium_above: f64, high_above: f64) -> Self {
        Self::new(medium_above, high_above, self.spray_above)
    }

    /// Returns a copy using a new spray threshold and the current band thresholds.
    #[must_use]
    pub const fn with_spray_threshold(self, spray_above: f64) -> Self {
        Self::new(self.medium_above, self.high_above, spray_above)
    }

    /// Lower exclusive bound of the medium band.
    #[must_use]
    pub const fn medium_above(&self) -> f64 {
        self.medium_above
    }

    /// Lower exclusive bound of the high band.
    #[must_use]
    pub const fn high_above(&self) -> f64 {
        self.high_above
    }

    /// Lower exclusive bound of spray eligibility.
    #[must_use]
    pub const fn spray_above(&self) -> f64 {
        self.spray_above
    }

    /// Classifies a score. Non-finite scores fall into the low band.
    #[must_use]
    pub fn classify(&self, score: f64) -> StressBand {
        if score > self.high_above {
            StressBand::High
        } else if score > self.medium_above {
            StressBand::Medium
        } else {
            StressBand::Low
        }
    }

    /// Reports whether the spray drone should revisit a point with this score.
    #[must_use]
    pub fn is_spray_eligible(&self, score: f64) -> bool {
        score > self.spray_above
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries_are_exclusive_low() {
        let classifier = StressClassifier::default();

        assert_eq!(classifier.classify(0.0), StressBand::Low);
        assert_eq!(classifier.classify(0.30), StressBand::Low);
        assert_eq!(classifier.classify(0.31), StressBand::Medium);
        assert_eq!(classifier.classify(0.70), StressBand::Medium);
        assert_eq!(classifier.classify(0.71), StressBand::High);
        assert_eq!(classifier.classify(1.0), StressBand::High);
    }

    #[test]
    fn spray_threshold_is_exclusive() {
        let classifier = StressClassifier::default();

        assert!(!classifier.is_spray_eligible(0.5));
        assert!(classifier.is_spray_eligible(0.51));
        assert!(!classifier.is_spray_eligible(f64::NAN));
    }

    #[test]
    fn thresholds_are_independently_configurable() {
        let base = StressClassifier::default();

        let spray_moved = base.with_spray_threshold(0.8);
        assert_eq!(spray_moved.medium_above(), MEDIUM_STRESS_THRESHOLD);
        assert_eq!(spray_moved.high_above(), HIGH_STRESS_THRESHOLD);
        assert!(!spray_moved.is_spray_eligible(0.75));
        assert_eq!(spray_moved.classify(0.75), StressBand::High);

        let bands_moved = base.with_band_thresholds(0.1, 0.2);
        assert_eq!(bands_moved.spray_above(), SPRAY_ELIGIBILITY_THRESHOLD);
        assert_eq!(bands_moved.classify(0.25), StressBand::High);
        assert!(!bands_moved.is_spray_eligible(0.25));
    }

    #[test]
    fn band_colors_render_as_hex_tokens() {
        assert_eq!(StressBand::Low.color().hex(), "#22c55e");
        assert_eq!(StressBand::Medium.color().hex(), "#f97316");
        assert_eq!(StressBand::High.color().hex(), "#ef4444");
    }
}
