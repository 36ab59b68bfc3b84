//! Precomputed travel matrix over the distinct job locations of one run.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::planar::PlanarTravel;
use crate::traits::{Coordinates, TravelMatrixProvider, TravelModel};

type LocationKey = (u64, u64);

fn location_key(coordinates: Coordinates) -> LocationKey {
    (coordinates.0.to_bits(), coordinates.1.to_bits())
}

/// Travel hours between known locations, looked up in memory.
///
/// Legs touching a location outside the matrix use the planar estimate.
#[derive(Debug, Clone)]
pub struct TravelMatrix {
    index: HashMap<LocationKey, usize>,
    hours: Vec<Vec<f64>>,
    fallback: PlanarTravel,
}

impl TravelMatrix {
    /// Query `provider` once for the distinct `locations`.
    ///
    /// A matrix that does not match the location count, or that holds
    /// negative or non-finite values, is discarded in favor of `fallback`.
    pub fn from_provider<P>(provider: &P, locations: &[Coordinates], fallback: PlanarTravel) -> Self
    where
        P: TravelMatrixProvider + ?Sized,
    {
        let locations = distinct_locations(locations);
        if locations.len() < 2 {
            return Self::planar(fallback);
        }

        let hours = provider.matrix_for(&locations);
        let size = locations.len();
        let valid = hours.len() == size
            && hours.iter().all(|row| {
                row.len() == size && row.iter().all(|h| h.is_finite() && *h >= 0.0)
            });
        if !valid {
            warn!(
                locations = size,
                rows = hours.len(),
                "travel matrix unavailable, using planar travel estimate"
            );
            return Self::planar(fallback);
        }

        debug!(locations = size, "travel matrix loaded");
        let index = locations
            .iter()
            .enumerate()
            .map(|(i, &location)| (location_key(location), i))
            .collect();

        Self {
            index,
            hours,
            fallback,
        }
    }

    /// A matrix with no entries: every leg is estimated by `fallback`.
    pub fn planar(fallback: PlanarTravel) -> Self {
        Self {
            index: HashMap::new(),
            hours: Vec::new(),
            fallback,
        }
    }

    /// Number of locations covered.
    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    fn leg_hours(&self, from: Coordinates, to: Coordinates) -> f64 {
        let from_index = self.index.get(&location_key(from));
        let to_index = self.index.get(&location_key(to));
        match (from_index, to_index) {
            (Some(&i), Some(&j)) => self.hours[i][j],
            _ => self.fallback.route_hours(&[from, to]),
        }
    }
}

impl TravelModel for TravelMatrix {
    fn route_hours(&self, stops: &[Coordinates]) -> f64 {
        stops
            .windows(2)
            .map(|leg| self.leg_hours(leg[0], leg[1]))
            .sum()
    }
}

/// Locations in first-seen order without repeats.
pub fn distinct_locations(locations: &[Coordinates]) -> Vec<Coordinates> {
    let mut seen = HashSet::with_capacity(locations.len());
    locations
        .iter()
        .copied()
        .filter(|&location| seen.insert(location_key(location)))
        .collect()
}
