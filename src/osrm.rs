//! OSRM HTTP adapter for road-network travel times.
//!
//! Fetches one duration matrix from the OSRM table service for all job
//! locations of a run. The request happens before scheduling starts; a
//! transport or shape failure yields an empty matrix and the run falls back
//! to planar estimates.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::traits::{Coordinates, TravelMatrixProvider};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

impl OsrmConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Fetch the duration matrix (seconds) for `locations`.
    pub fn table_durations(
        &self,
        locations: &[Coordinates],
    ) -> Result<Vec<Vec<f64>>, reqwest::Error> {
        let coords = locations
            .iter()
            .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
            .collect::<Vec<_>>()
            .join(";");

        let url = format!(
            "{}/table/v1/{}/{}?annotations=duration",
            self.config.base_url, self.config.profile, coords
        );

        let body = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmTableResponse>())?;

        Ok(body.durations.unwrap_or_default())
    }
}

impl TravelMatrixProvider for OsrmClient {
    fn matrix_for(&self, locations: &[Coordinates]) -> Vec<Vec<f64>> {
        if locations.is_empty() {
            return Vec::new();
        }

        match self.table_durations(locations) {
            Ok(seconds) => {
                debug!(locations = locations.len(), "OSRM table received");
                seconds
                    .into_iter()
                    .map(|row| row.into_iter().map(|value| value / 3600.0).collect())
                    .collect()
            }
            Err(err) => {
                warn!(error = %err, "OSRM table request failed");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    durations: Option<Vec<Vec<f64>>>,
}
