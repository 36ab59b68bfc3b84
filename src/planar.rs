//! Planar distance approximation used for clustering and travel estimates.
//!
//! Degrees are converted to miles with fixed per-degree factors instead of a
//! great-circle formula. The error grows with latitude and with distance, so
//! this is only suitable for a bounded service territory.

use crate::traits::{Coordinates, TravelModel};

/// Miles per degree of latitude.
pub const MILES_PER_DEGREE_LAT: f64 = 69.0;

/// Miles per degree of longitude (fixed, latitude-insensitive).
pub const MILES_PER_DEGREE_LON: f64 = 54.6;

/// Average crew travel speed assumption.
pub const DEFAULT_SPEED_MPH: f64 = 35.0;

/// Project coordinates onto the planar mile grid as (x, y).
pub fn planar_point(coordinates: Coordinates) -> (f64, f64) {
    let (lat, lon) = coordinates;
    (lon * MILES_PER_DEGREE_LON, lat * MILES_PER_DEGREE_LAT)
}

/// Approximate distance in miles between two coordinates.
pub fn distance_miles(from: Coordinates, to: Coordinates) -> f64 {
    let (x1, y1) = planar_point(from);
    let (x2, y2) = planar_point(to);
    ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
}

/// Travel model based on planar distance and an assumed average speed.
#[derive(Debug, Clone)]
pub struct PlanarTravel {
    /// Assumed average driving speed in miles per hour.
    pub speed_mph: f64,
}

impl Default for PlanarTravel {
    fn default() -> Self {
        Self {
            speed_mph: DEFAULT_SPEED_MPH,
        }
    }
}

impl PlanarTravel {
    pub fn new(speed_mph: f64) -> Self {
        Self { speed_mph }
    }

    /// Convert a distance in miles to hours of travel.
    pub fn miles_to_hours(&self, miles: f64) -> f64 {
        if self.speed_mph <= 0.0 {
            return 0.0;
        }
        miles / self.speed_mph
    }
}

impl TravelModel for PlanarTravel {
    fn route_hours(&self, stops: &[Coordinates]) -> f64 {
        let miles: f64 = stops
            .windows(2)
            .map(|leg| distance_miles(leg[0], leg[1]))
            .sum();
        self.miles_to_hours(miles)
    }
}
