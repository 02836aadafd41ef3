//! Plot geometry built from a center coordinate and a target area.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Area of one acre in square meters.
pub const SQUARE_METERS_PER_ACRE: f64 = 4_046.856_422_4;

/// Equirectangular approximation of one degree of latitude in meters.
pub const METERS_PER_DEGREE_LATITUDE: f64 = 111_320.0;

/// Area surveyed by a mission when none is configured.
pub const DEFAULT_PLOT_ACRES: f64 = 2.0;

/// Latitude/longitude pair expressed in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a new coordinate.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Reasons a plot cannot be built.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum PlotError {
    /// The center contained NaN or infinite components.
    #[error("plot center ({lat}, {lng}) is not finite")]
    NonFiniteCenter {
        /// Provided latitude.
        lat: f64,
        /// Provided longitude.
        lng: f64,
    },
    /// The center latitude lies on or beyond a pole.
    #[error("plot latitude {lat} must lie strictly between -90 and 90")]
    LatitudeOutOfRange {
        /// Provided latitude.
        lat: f64,
    },
    /// The requested area was zero, negative or not finite.
    #[error("plot area must be positive (received {acres} acres)")]
    InvalidArea {
        /// Provided area in acres.
        acres: f64,
    },
}

/// Axis-aligned survey rectangle expressed in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plot {
    south: f64,
    north: f64,
    west: f64,
    east: f64,
}

impl Plot {
    /// Builds a square plot of `area_acres` centred on `center`.
    ///
    /// Meters are converted to degrees with the equirectangular
    /// approximation, so longitude spans widen with latitude.
    pub fn around(center: GeoPoint, area_acres: f64) -> Result<Self, PlotError> {
        if !center.lat.is_finite() || !center.lng.is_finite() {
            return Err(PlotError::NonFiniteCenter {
                lat: center.lat,
                lng: center.lng,
            });
        }
        if center.lat <= -90.0 || center.lat >= 90.0 {
            return Err(PlotError::LatitudeOutOfRange { lat: center.lat });
        }
        if !area_acres.is_finite() || area_acres <= 0.0 {
            return Err(PlotError::InvalidArea { acres: area_acres });
        }

        let half_side = (area_acres * SQUARE_METERS_PER_ACRE).sqrt() / 2.0;
        let half_lat = half_side / METERS_PER_DEGREE_LATITUDE;
        let half_lng = half_side / (METERS_PER_DEGREE_LATITUDE * center.lat.to_radians().cos());

        Ok(Self {
            south: center.lat - half_lat,
            north: center.lat + half_lat,
            west: center.lng - half_lng,
            east: center.lng + half_lng,
        })
    }

    /// Creates a plot from explicit bounds, normalizing swapped edges.
    #[must_use]
    pub fn from_bounds(south: f64, north: f64, west: f64, east: f64) -> Self {
        Self {
            south: south.min(north),
            north: south.max(north),
            west: west.min(east),
            east: west.max(east),
        }
    }

    /// Southern latitude bound.
    #[must_use]
    pub const fn south(&self) -> f64 {
        self.south
    }

    /// Northern latitude bound.
    #[must_use]
    pub const fn north(&self) -> f64 {
        self.north
    }

    /// Western longitude bound.
    #[must_use]
    pub const fn west(&self) -> f64 {
        self.west
    }

    /// Eastern longitude bound.
    #[must_use]
    pub const fn east(&self) -> f64 {
        self.east
    }

    /// Height of the plot in degrees of latitude.
    #[must_use]
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Width of the plot in degrees of longitude.
    #[must_use]
    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    /// Midpoint of the plot.
    #[must_use]
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Reports whether the coordinate lies inside the plot, edges included.
    #[must_use]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.south..=self.north).contains(&lat) && (self.west..=self.east).contains(&lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_acre_plot_is_roughly_ninety_meters_square() {
        let plot = Plot::around(GeoPoint::new(0.0, 0.0), DEFAULT_PLOT_ACRES).expect("valid plot");
        let side_meters = plot.lat_span() * METERS_PER_DEGREE_LATITUDE;

        assert!((side_meters - 89.96).abs() < 0.05, "side was {side_meters}");
        assert!((plot.lng_span() - plot.lat_span()).abs() < 1e-12);
    }

    #[test]
    fn longitude_span_widens_away_from_equator() {
        let plot = Plot::around(GeoPoint::new(60.0, 10.0), DEFAULT_PLOT_ACRES).expect("valid plot");

        assert!((plot.lng_span() / plot.lat_span() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn plot_contains_its_center_and_edges() {
        let center = GeoPoint::new(12.35, 78.91);
        let plot = Plot::around(center, DEFAULT_PLOT_ACRES).expect("valid plot");

        assert!(plot.contains(center.lat, center.lng));
        assert!(plot.contains(plot.south(), plot.west()));
        assert!(plot.contains(plot.north(), plot.east()));
        assert!(!plot.contains(plot.north() + 1e-6, center.lng));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(matches!(
            Plot::around(GeoPoint::new(f64::NAN, 0.0), 2.0),
            Err(PlotError::NonFiniteCenter { .. })
        ));
        assert!(matches!(
            Plot::around(GeoPoint::new(90.0, 0.0), 2.0),
            Err(PlotError::LatitudeOutOfRange { .. })
        ));
        assert!(matches!(
            Plot::around(GeoPoint::new(0.0, 0.0), 0.0),
            Err(PlotError::InvalidArea { .. })
        ));
    }

    #[test]
    fn swapped_bounds_are_normalized() {
        let plot = Plot::from_bounds(1.0, -1.0, 2.0, -2.0);

        assert_eq!(plot.south(), -1.0);
        assert_eq!(plot.east(), 2.0);
    }
}
