//! Projection from geographic coordinates onto a character grid.

use crop_mission_core::{GeoPoint, Plot};
use glam::DVec2;

use crate::RenderingError;

/// Maps positions inside a plot onto a `columns` by `rows` grid.
///
/// North is at the top of the grid and west on the left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    plot: Plot,
    columns: u32,
    rows: u32,
}

impl Viewport {
    /// Creates a viewport covering `plot`.
    pub fn new(plot: Plot, columns: u32, rows: u32) -> Result<Self, RenderingError> {
        if columns == 0 || rows == 0 {
            return Err(RenderingError::InvalidGrid { columns, rows });
        }
        Ok(Self {
            plot,
            columns,
            rows,
        })
    }

    /// Plot covered by the viewport.
    #[must_use]
    pub const fn plot(&self) -> Plot {
        self.plot
    }

    /// Number of grid columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of grid rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Projects a location into grid space, with both axes in `0.0..=1.0`
    /// scaled by the grid dimensions.
    ///
    /// Returns `None` for locations outside the plot. A plot collapsed to a
    /// line or a point projects onto the middle of the collapsed axis.
    #[must_use]
    pub fn project(&self, location: GeoPoint) -> Option<DVec2> {
        if !self.plot.contains(location.lat, location.lng) {
            return None;
        }
        let x = unit_offset(location.lng - self.plot.west(), self.plot.lng_span());
        let y = unit_offset(self.plot.north() - location.lat, self.plot.lat_span());
        Some(DVec2::new(x, y) * DVec2::new(f64::from(self.columns), f64::from(self.rows)))
    }

    /// Grid cell containing `location`, as `(column, row)`.
    #[must_use]
    pub fn cell(&self, location: GeoPoint) -> Option<(u32, u32)> {
        let projected = self.project(location)?.floor();
        let column = (projected.x as u32).min(self.columns - 1);
        let row = (projected.y as u32).min(self.rows - 1);
        Some((column, row))
    }
}

fn unit_offset(offset: f64, span: f64) -> f64 {
    if span > 0.0 {
        (offset / span).clamp(0.0, 1.0)
    } else {
        0.5
    }
}
