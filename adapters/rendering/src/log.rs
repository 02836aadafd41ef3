//! Human readable log of received readings.

use crop_mission_core::{StreamPoint, StressBand, StressClassifier};

/// One line of the live log.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    /// Identity of the reading the line describes.
    pub timestamp: u64,
    /// Band of the reading, used to tint the line.
    pub band: StressBand,
    /// Rendered message.
    pub message: String,
}

/// Builds one log line per reading, in the order the channel delivered them.
#[must_use]
pub fn live_log(stream: &[StreamPoint], classifier: &StressClassifier) -> Vec<LogEntry> {
    stream
        .iter()
        .enumerate()
        .map(|(index, point)| {
            let band = classifier.classify(point.stress_score);
            let finding = match band {
                StressBand::High => "High stress detected",
                StressBand::Medium => "Moderate stress detected",
                StressBand::Low => "Healthy area detected",
            };
            LogEntry {
                timestamp: point.timestamp,
                band,
                message: format!(
                    "[{}] {finding} at point {} ({:.2})",
                    clock_label(point.timestamp),
                    index + 1,
                    point.stress_score
                ),
            }
        })
        .collect()
}

/// Formats a millisecond timestamp as a UTC wall-clock time, `HH:MM:SS`.
#[must_use]
pub fn clock_label(timestamp_ms: u64) -> String {
    let seconds = timestamp_ms / 1_000;
    let hours = (seconds / 3_600) % 24;
    let minutes = (seconds / 60) % 60;
    let seconds = seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_follow_the_band_of_each_reading() {
        let stream = vec![
            StreamPoint::new(0, 0.0, 0.0, 0.85, ""),
            StreamPoint::new(61_000, 0.0, 0.0, 0.5, ""),
            StreamPoint::new(3_723_000, 0.0, 0.0, 0.3, ""),
        ];

        let log = live_log(&stream, &StressClassifier::default());

        assert_eq!(log[0].message, "[00:00:00] High stress detected at point 1 (0.85)");
        assert_eq!(log[1].message, "[00:01:01] Moderate stress detected at point 2 (0.50)");
        assert_eq!(log[2].message, "[01:02:03] Healthy area detected at point 3 (0.30)");
        assert_eq!(log[2].band, StressBand::Low);
    }

    #[test]
    fn clock_label_wraps_at_midnight() {
        assert_eq!(clock_label(86_400_000 + 5_000), "00:00:05");
    }
}
