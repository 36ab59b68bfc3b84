//! Core seams for the bundle planner.
//!
//! The scheduling core only needs to know how long a crew spends driving
//! between consecutive jobs. In-memory travel models implement
//! [`TravelModel`]. External sources such as a road-network router implement
//! [`TravelMatrixProvider`] and are queried once before the day loop.

/// Geographic position as (latitude, longitude) in degrees.
pub type Coordinates = (f64, f64);

/// Estimates travel time over an ordered sequence of stops.
pub trait TravelModel {
    /// Total hours needed to visit `stops` in the given order.
    ///
    /// Fewer than two stops means no travel.
    fn route_hours(&self, stops: &[Coordinates]) -> f64;
}

impl<T> TravelModel for &T
where
    T: TravelModel + ?Sized,
{
    fn route_hours(&self, stops: &[Coordinates]) -> f64 {
        (**self).route_hours(stops)
    }
}

/// Supplies point-to-point travel times for a set of locations.
///
/// Called once per run, before scheduling starts, so implementations may
/// block on I/O.
pub trait TravelMatrixProvider {
    /// Hours from `locations[i]` to `locations[j]` at `[i][j]`.
    ///
    /// An empty or misshapen matrix means no data is available.
    fn matrix_for(&self, locations: &[Coordinates]) -> Vec<Vec<f64>>;
}
