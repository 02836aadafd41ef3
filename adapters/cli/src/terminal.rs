use std::io::Write;

use anyhow::{Context, Result};
use crop_mission_core::{Drone, GeoPoint, Plot, StreamPoint, StressBand};
use crop_mission_rendering::{Dashboard, PresentationBackend, StepState, Viewport};

const MAP_COLUMNS: u32 = 48;
const MAP_ROWS: u32 = 16;
const LOG_LINES: usize = 6;
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Draws dashboards as a character map followed by the side panels.
pub(crate) struct TerminalPresenter<W: Write> {
    out: W,
    viewport: Viewport,
    clear: bool,
    frames: u64,
}

impl<W: Write> TerminalPresenter<W> {
    /// Creates a presenter drawing `plot` into `out`.
    ///
    /// When `clear` is set every frame starts by clearing the terminal.
    pub(crate) fn new(out: W, plot: Plot, clear: bool) -> Result<Self> {
        let viewport = Viewport::new(plot, MAP_COLUMNS, MAP_ROWS)?;
        Ok(Self {
            out,
            viewport,
            clear,
            frames: 0,
        })
    }

    /// Number of frames presented so far.
    pub(crate) const fn frames(&self) -> u64 {
        self.frames
    }

    /// Consumes the presenter and returns its writer.
    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }

    fn map_rows(&self, dashboard: &Dashboard) -> Vec<String> {
        let columns = self.viewport.columns() as usize;
        let mut grid = vec![vec!['.'; columns]; self.viewport.rows() as usize];
        let mut put = |location: GeoPoint, glyph: char| {
            if let Some((column, row)) = self.viewport.cell(location) {
                grid[row as usize][column as usize] = glyph;
            }
        };

        let frame = &dashboard.frame;
        for heat in &frame.heatmap {
            put(heat.location, heat_glyph(heat.band));
        }
        for marker in &frame.scan_markers {
            put(marker.location, marker_glyph(marker.band));
        }
        for location in &frame.spray_path {
            put(*location, 'X');
        }

        grid.into_iter().map(|row| row.into_iter().collect()).collect()
    }
}

impl<W: Write> PresentationBackend for TerminalPresenter<W> {
    fn present(&mut self, dashboard: &Dashboard) -> Result<()> {
        let rows = self.map_rows(dashboard);
        let frame = &dashboard.frame;
        let out = &mut self.out;

        if self.clear {
            write!(out, "{CLEAR_SCREEN}")?;
        }
        let overlay = match frame.drone {
            Drone::Scan => "scan",
            Drone::Spray => "spray",
        };
        writeln!(
            out,
            "{} | {overlay} overlay, zoom {} | {}/{} revealed ({:.0}%)",
            frame.status,
            frame.zoom,
            frame.revealed,
            frame.total,
            frame.progress * 100.0
        )?;
        for row in rows {
            writeln!(out, "  {row}")?;
        }
        for (label, state) in dashboard.timeline.steps() {
            let mark = match state {
                StepState::Done => "[x]",
                StepState::Current => "[>]",
                StepState::Pending => "[ ]",
            };
            writeln!(out, "{mark} {label}")?;
        }
        for card in &dashboard.images {
            writeln!(
                out,
                "  {} {:<11} {} {}",
                card.clock, card.label, card.tint, card.image_url
            )?;
        }
        let skip = dashboard.log.len().saturating_sub(LOG_LINES);
        for entry in &dashboard.log[skip..] {
            writeln!(out, "{}", entry.message)?;
        }
        out.flush().context("failed to flush terminal output")?;

        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        writeln!(self.out, "{} frames presented", self.frames)?;
        Ok(())
    }
}

/// Smallest plot containing every point of `stream`.
pub(crate) fn plot_covering(stream: &[StreamPoint]) -> Plot {
    let Some(first) = stream.first() else {
        return Plot::from_bounds(0.0, 0.0, 0.0, 0.0);
    };
    let (mut south, mut north, mut west, mut east) = (first.lat, first.lat, first.lng, first.lng);
    for point in &stream[1..] {
        south = south.min(point.lat);
        north = north.max(point.lat);
        west = west.min(point.lng);
        east = east.max(point.lng);
    }
    Plot::from_bounds(south, north, west, east)
}

fn heat_glyph(band: StressBand) -> char {
    match band {
        StressBand::Low => '-',
        StressBand::Medium => '+',
        StressBand::High => '%',
    }
}

fn marker_glyph(band: StressBand) -> char {
    match band {
        StressBand::Low => 'o',
        StressBand::Medium => '*',
        StressBand::High => '#',
    }
}
