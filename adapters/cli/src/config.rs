use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Args;
use crop_mission_core::{GeoPoint, DEFAULT_CHANNEL_KEY, DEFAULT_PLOT_ACRES};
use crop_mission_rendering::DEFAULT_RENDER_TICK;
use crop_mission_simulator::{SimulatorConfig, DEFAULT_POINT_COUNT, DEFAULT_TICK_INTERVAL};
use crop_mission_system_point_generation::DEFAULT_IMAGE_BASE;
use serde::Deserialize;

const DEFAULT_CENTER: GeoPoint = GeoPoint::new(12.35, 78.91);
const DEFAULT_SEED: u64 = 0x5eed;

/// Mission parameters loaded from a TOML file.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct MissionConfig {
    /// Channel key the mission is published under.
    pub(crate) channel_key: String,
    /// Latitude of the plot center.
    pub(crate) center_lat: f64,
    /// Longitude of the plot center.
    pub(crate) center_lng: f64,
    /// Surveyed area in acres.
    pub(crate) area_acres: f64,
    /// Number of scan readings.
    pub(crate) point_count: usize,
    /// Seed for the stress score generator.
    pub(crate) seed: u64,
    /// Simulator step interval in milliseconds.
    pub(crate) tick_ms: u64,
    /// Renderer reveal interval in milliseconds.
    pub(crate) render_tick_ms: u64,
    /// Prefix of synthesized frame references.
    pub(crate) image_base: String,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            channel_key: DEFAULT_CHANNEL_KEY.to_owned(),
            center_lat: DEFAULT_CENTER.lat,
            center_lng: DEFAULT_CENTER.lng,
            area_acres: DEFAULT_PLOT_ACRES,
            point_count: DEFAULT_POINT_COUNT,
            seed: DEFAULT_SEED,
            tick_ms: duration_ms(DEFAULT_TICK_INTERVAL),
            render_tick_ms: duration_ms(DEFAULT_RENDER_TICK),
            image_base: DEFAULT_IMAGE_BASE.to_owned(),
        }
    }
}

/// Command-line flags that take precedence over the configuration file.
#[derive(Args, Clone, Debug, Default)]
pub(crate) struct ConfigOverrides {
    /// Number of scan readings to generate.
    #[arg(long = "points")]
    pub(crate) point_count: Option<usize>,
    /// Seed for the stress score generator.
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Simulator step interval in milliseconds.
    #[arg(long)]
    pub(crate) tick_ms: Option<u64>,
    /// Renderer reveal interval in milliseconds.
    #[arg(long)]
    pub(crate) render_tick_ms: Option<u64>,
}

impl MissionConfig {
    /// Loads the configuration from `path`, or the defaults when absent.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parses a TOML document.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("failed to parse mission config toml contents")
    }

    /// Applies command-line overrides.
    pub(crate) fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(point_count) = overrides.point_count {
            self.point_count = point_count;
        }
        if let Some(seed) = overrides.seed {
            self.seed = seed;
        }
        if let Some(tick_ms) = overrides.tick_ms {
            self.tick_ms = tick_ms;
        }
        if let Some(render_tick_ms) = overrides.render_tick_ms {
            self.render_tick_ms = render_tick_ms;
        }
    }

    /// Rejects intervals that would stall the mission or the playback.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            bail!("tick_ms must be positive");
        }
        if self.render_tick_ms == 0 {
            bail!("render_tick_ms must be positive");
        }
        Ok(())
    }

    /// Plot center.
    pub(crate) const fn center(&self) -> GeoPoint {
        GeoPoint::new(self.center_lat, self.center_lng)
    }

    /// Renderer reveal interval.
    pub(crate) const fn render_tick(&self) -> Duration {
        Duration::from_millis(self.render_tick_ms)
    }

    /// Simulator parameters, with the clock origin at `base_timestamp_ms`.
    pub(crate) fn simulator(&self, base_timestamp_ms: u64) -> SimulatorConfig {
        SimulatorConfig {
            tick_interval: Duration::from_millis(self.tick_ms),
            point_count: self.point_count,
            area_acres: self.area_acres,
            base_timestamp_ms,
            image_base: self.image_base.clone(),
            ..SimulatorConfig::default()
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
