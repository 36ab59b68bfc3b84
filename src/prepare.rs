//! Job preparation: turns raw records and estimates into [`Job`]s.
//!
//! Preparation never fails on an individual record. Malformed coordinates
//! degrade to `(0, 0)`, missing estimates fall back to the configured
//! defaults, and records without any identity are skipped.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{DependencyRules, JobDefaults};
use crate::model::{Estimate, Job, RawJob};
use crate::traits::Coordinates;

/// Prepare all usable records in input order.
///
/// Job ids are unique in the output. A repeated id keeps its first record and
/// later ones are skipped. Records without an id get `job-<position>`, or a
/// suffixed variant when a real record already uses that id.
pub fn prepare_jobs(
    raw_jobs: &[RawJob],
    estimates: &HashMap<String, Estimate>,
    rules: &DependencyRules,
    defaults: &JobDefaults,
) -> Vec<Job> {
    let explicit: HashSet<&str> = raw_jobs.iter().filter_map(|raw| raw.id.as_deref()).collect();
    let mut taken: HashSet<String> = HashSet::with_capacity(raw_jobs.len());
    let mut jobs = Vec::with_capacity(raw_jobs.len());

    for (position, raw) in raw_jobs.iter().enumerate() {
        if !raw.is_usable() {
            warn!(position, "skipping job record with neither id nor tag");
            continue;
        }
        let id = match &raw.id {
            Some(id) if taken.contains(id) => {
                warn!(position, job_id = %id, "skipping job record with duplicate id");
                continue;
            }
            Some(id) => id.clone(),
            None => fallback_id(position, &explicit, &taken),
        };
        taken.insert(id.clone());
        jobs.push(prepare_job(id, raw, estimates, rules, defaults));
    }

    jobs
}

fn fallback_id(position: usize, explicit: &HashSet<&str>, taken: &HashSet<String>) -> String {
    let base = format!("job-{}", position + 1);
    let is_free = |id: &str| !explicit.contains(id) && !taken.contains(id);
    if is_free(base.as_str()) {
        return base;
    }
    let mut suffix = 1;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if is_free(candidate.as_str()) {
            return candidate;
        }
        suffix += 1;
    }
}

fn prepare_job(
    id: String,
    raw: &RawJob,
    estimates: &HashMap<String, Estimate>,
    rules: &DependencyRules,
    defaults: &JobDefaults,
) -> Job {
    let tag = raw.tag.clone().unwrap_or_default();

    let coordinates = match raw.coordinates.as_ref().and_then(parse_coordinates) {
        Some(coordinates) => coordinates,
        None => {
            debug!(
                job_id = %id,
                raw = ?raw.coordinates,
                "unusable coordinates, defaulting to (0, 0)"
            );
            (0.0, 0.0)
        }
    };

    let estimate = estimates.get(&id);
    if estimate.is_none() {
        debug!(job_id = %id, "no estimate, using default duration and profit");
    }

    let duration = estimate
        .and_then(|e| e.labor_hours)
        .filter(|hours| hours.is_finite() && *hours > 0.0)
        .unwrap_or(defaults.duration_hours);
    let profit = estimate
        .and_then(|e| e.profit)
        .filter(|p| p.is_finite())
        .unwrap_or(defaults.profit);
    let equipment_hours = estimate
        .and_then(|e| e.equipment_hours)
        .filter(|hours| hours.is_finite() && *hours >= 0.0)
        .unwrap_or(0.0);
    let compliance_score = estimate
        .and_then(|e| e.compliance_score)
        .or(raw.compliance_score)
        .filter(|score| score.is_finite())
        .unwrap_or(defaults.compliance_score)
        .clamp(0.0, 1.0);

    let dependency_tags = match &raw.dependency_tags {
        Some(tags) => tags.iter().cloned().collect(),
        None => rules.prerequisites(&tag).cloned().unwrap_or_default(),
    };

    Job {
        id,
        tag,
        coordinates,
        duration,
        dependency_tags,
        compliance_score,
        profit,
        priority: raw.priority.unwrap_or(defaults.priority),
        equipment_hours,
    }
}

/// Parse a location value into (lat, lon).
///
/// Accepts `[lat, lon]`, `{"lat": .., "lon"|"lng": ..}` and `"lat,lon"`.
/// Returns `None` for anything else, including out-of-range values.
pub fn parse_coordinates(value: &Value) -> Option<Coordinates> {
    let (lat, lon) = match value {
        Value::Array(items) if items.len() == 2 => {
            (as_degrees(&items[0])?, as_degrees(&items[1])?)
        }
        Value::Object(map) => {
            let lat = map.get("lat").or_else(|| map.get("latitude"))?;
            let lon = map
                .get("lon")
                .or_else(|| map.get("lng"))
                .or_else(|| map.get("longitude"))?;
            (as_degrees(lat)?, as_degrees(lon)?)
        }
        Value::String(text) => {
            let (lat, lon) = text.split_once(',')?;
            (lat.trim().parse::<f64>().ok()?, lon.trim().parse::<f64>().ok()?)
        }
        _ => return None,
    };

    let valid = lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon);
    valid.then_some((lat, lon))
}

fn as_degrees(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
