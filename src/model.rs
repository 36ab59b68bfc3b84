//! Domain records: raw inbound jobs, prepared jobs, estimates and crews.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::CrewType;
use crate::traits::Coordinates;

/// A job record as delivered by the upstream normalizer.
///
/// Every field is optional. Deserialization never fails on a JSON object:
/// unknown shapes are kept as raw values and repaired during preparation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct RawJob {
    pub id: Option<String>,
    pub tag: Option<String>,
    /// Unparsed location value (array, object or "lat,lon" string).
    pub coordinates: Option<Value>,
    pub dependency_tags: Option<Vec<String>>,
    pub compliance_score: Option<f64>,
    pub priority: Option<i64>,
}

impl RawJob {
    pub fn new(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.coordinates = Some(serde_json::json!([lat, lon]));
        self
    }

    pub fn with_raw_coordinates(mut self, value: Value) -> Self {
        self.coordinates = Some(value);
        self
    }

    pub fn with_dependency_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependency_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_compliance(mut self, score: f64) -> Self {
        self.compliance_score = Some(score);
        self
    }

    /// Whether the record carries enough identity to become a job.
    pub fn is_usable(&self) -> bool {
        self.id.is_some() || self.tag.is_some()
    }
}

impl From<Value> for RawJob {
    fn from(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };

        let id = field(&map, &["id", "job_id"]).and_then(|v| scalar_string(&v));
        let tag = field(&map, &["tag", "work_type"]).and_then(|v| scalar_string(&v));

        let coordinates = field(&map, &["coordinates", "location", "coords"]).or_else(|| {
            let lat = map.get("lat")?;
            let lon = map.get("lon").or_else(|| map.get("lng"))?;
            Some(serde_json::json!({ "lat": lat, "lon": lon }))
        });

        let dependency_tags: Option<Vec<String>> = field(&map, &["dependency_tags", "dependencies"])
            .and_then(|v| match v {
                Value::Array(items) => Some(items.iter().filter_map(scalar_string).collect()),
                Value::String(text) => Some(
                    text.split(',')
                        .map(str::trim)
                        .filter(|tag| !tag.is_empty())
                        .map(str::to_string)
                        .collect(),
                ),
                _ => None,
            });

        let compliance_score =
            field(&map, &["compliance_score", "compliance"]).and_then(|v| number(&v));
        let priority = field(&map, &["priority"])
            .and_then(|v| number(&v))
            .map(|p| p.round() as i64);

        Self {
            id,
            tag,
            coordinates,
            dependency_tags,
            compliance_score,
            priority,
        }
    }
}

fn field(map: &Map<String, Value>, names: &[&str]) -> Option<Value> {
    names.iter().find_map(|name| map.get(*name)).cloned()
}

fn numeric_field(map: &Map<String, Value>, names: &[&str]) -> Option<f64> {
    field(map, names).and_then(|v| number(&v))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Per-job output of the cost/compliance estimator.
///
/// Decoding is lenient like [`RawJob`]: numeric strings are accepted and
/// anything unreadable is left as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Estimate {
    pub labor_hours: Option<f64>,
    pub equipment_hours: Option<f64>,
    pub compliance_score: Option<f64>,
    pub profit: Option<f64>,
}

impl Estimate {
    pub fn new(labor_hours: f64, profit: f64) -> Self {
        Self {
            labor_hours: Some(labor_hours),
            profit: Some(profit),
            ..Self::default()
        }
    }

    pub fn with_equipment_hours(mut self, hours: f64) -> Self {
        self.equipment_hours = Some(hours);
        self
    }

    pub fn with_compliance(mut self, score: f64) -> Self {
        self.compliance_score = Some(score);
        self
    }
}

impl From<Value> for Estimate {
    fn from(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };
        Self {
            labor_hours: numeric_field(&map, &["labor_hours", "hours"]),
            equipment_hours: numeric_field(&map, &["equipment_hours"]),
            compliance_score: numeric_field(&map, &["compliance_score", "compliance"]),
            profit: numeric_field(&map, &["profit"]),
        }
    }
}

/// A prepared, immutable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: String,
    pub tag: String,
    pub coordinates: Coordinates,
    /// Estimated labor hours.
    pub duration: f64,
    pub dependency_tags: BTreeSet<String>,
    pub compliance_score: f64,
    pub profit: f64,
    /// Lower is more urgent.
    pub priority: i64,
    pub equipment_hours: f64,
}

/// A schedulable crew instantiated for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Crew {
    pub id: String,
    pub crew_type: String,
    pub skills: BTreeSet<String>,
    pub daily_capacity_hours: f64,
    pub cost_per_hour: f64,
}

impl Crew {
    /// Build the crew at 0-based `index` from its type definition.
    pub fn from_type(index: usize, crew_type: &CrewType) -> Self {
        Self {
            id: format!("crew-{}", index + 1),
            crew_type: crew_type.name.clone(),
            skills: crew_type.skills.clone(),
            daily_capacity_hours: crew_type.daily_capacity_hours,
            cost_per_hour: crew_type.cost_per_hour,
        }
    }

    pub fn can_perform(&self, tag: &str) -> bool {
        self.skills.contains(tag)
    }
}

/// Instantiate `count` crews by round-robin over the crew-type table.
pub fn instantiate_crews(count: usize, crew_types: &[CrewType]) -> Vec<Crew> {
    if crew_types.is_empty() {
        return Vec::new();
    }
    (0..count)
        .map(|index| Crew::from_type(index, &crew_types[index % crew_types.len()]))
        .collect()
}
