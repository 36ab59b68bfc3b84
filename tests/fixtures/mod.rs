//! Test fixtures for bundle-planner.
//!
//! Provides:
//! - Work sites in a compact service territory
//! - Builders for job records, estimates and synthetic bundles

#![allow(dead_code)]

pub mod territory;

pub use territory::*;

use std::collections::HashMap;

use bundle_planner::model::{Estimate, RawJob};

/// Job records plus estimates, keyed by job id.
pub struct Bundle {
    pub jobs: Vec<RawJob>,
    pub estimates: HashMap<String, Estimate>,
}

impl Bundle {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            estimates: HashMap::new(),
        }
    }

    pub fn job(mut self, id: &str, tag: &str, site: &Site, hours: f64, profit: f64) -> Self {
        let (lat, lon) = site.coords();
        self.jobs.push(RawJob::new(id, tag).at(lat, lon));
        self.estimates.insert(id.to_string(), Estimate::new(hours, profit));
        self
    }
}

/// Pole, crossarm and transformer work at each of `sites`, plus an anchor
/// job with no prerequisites. Durations and profits vary deterministically.
pub fn site_chains(sites: &[Site]) -> Bundle {
    let mut bundle = Bundle::new();
    for (i, site) in sites.iter().enumerate() {
        let spread = (i % 4) as f64;
        let offset = i as f64;
        let name = site.name;
        bundle = bundle
            .job(&format!("{}-pole", name), "07D", site, 4.0 + spread, 900.0 + 10.0 * offset)
            .job(&format!("{}-arm", name), "KAA", site, 2.0 + spread / 2.0, 400.0 + 5.0 * offset)
            .job(&format!("{}-xfmr", name), "TRX", site, 3.0, 650.0 - 3.0 * offset)
            .job(&format!("{}-anchor", name), "2AA", site, 1.5, 150.0);
    }
    bundle
}
