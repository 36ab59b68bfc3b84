//! Per-run configuration tables.
//!
//! Crew types, tag dependency rules, defaults and tuning knobs are plain
//! values owned by each run. Every section has a `Default` matching the
//! production tables and can be overridden from a JSON file.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterOptions;
use crate::metrics::CostRates;
use crate::solver::SolveOptions;

/// A crew type: the work tags it may perform and its daily economics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewType {
    pub name: String,
    pub skills: BTreeSet<String>,
    pub daily_capacity_hours: f64,
    pub cost_per_hour: f64,
}

impl CrewType {
    pub fn new<I, S>(
        name: impl Into<String>,
        skills: I,
        daily_capacity_hours: f64,
        cost_per_hour: f64,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            skills: skills.into_iter().map(Into::into).collect(),
            daily_capacity_hours,
            cost_per_hour,
        }
    }
}

/// Default crew-type table, in round-robin order.
pub fn default_crew_types() -> Vec<CrewType> {
    vec![
        CrewType::new(
            "line_crew",
            ["07D", "07R", "KAA", "TRX", "2AA", "4AA", "6AA"],
            12.0,
            225.0,
        ),
        CrewType::new("pole_crew", ["07D", "07R", "2AA", "4AA"], 12.0, 275.0),
        CrewType::new("service_crew", ["TRX", "SVC", "MTR", "2AA"], 10.0, 150.0),
    ]
}

/// Tag → prerequisite tags that must be completed first at the same site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyRules(BTreeMap<String, BTreeSet<String>>);

impl DependencyRules {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with_rule<I, S>(mut self, tag: impl Into<String>, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(tag.into(), prerequisites.into_iter().map(Into::into).collect());
        self
    }

    pub fn prerequisites(&self, tag: &str) -> Option<&BTreeSet<String>> {
        self.0.get(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for DependencyRules {
    fn default() -> Self {
        Self::empty()
            .with_rule("KAA", ["07D"])
            .with_rule("TRX", ["07D"])
            .with_rule("6AA", ["KAA"])
            .with_rule("4AA", ["07D"])
    }
}

/// Values substituted for missing job fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobDefaults {
    pub duration_hours: f64,
    pub compliance_score: f64,
    pub priority: i64,
    pub profit: f64,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            duration_hours: 8.0,
            compliance_score: 0.8,
            priority: 3,
            profit: 0.0,
        }
    }
}

/// Complete configuration for a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub crew_types: Vec<CrewType>,
    pub dependency_rules: DependencyRules,
    pub job_defaults: JobDefaults,
    pub clustering: ClusterOptions,
    pub solve: SolveOptions,
    pub costs: CostRates,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            crew_types: default_crew_types(),
            dependency_rules: DependencyRules::default(),
            job_defaults: JobDefaults::default(),
            clustering: ClusterOptions::default(),
            solve: SolveOptions::default(),
            costs: CostRates::default(),
        }
    }
}

impl PlannerConfig {
    /// Load and validate a JSON configuration file.
    ///
    /// Sections missing from the file keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: Some(path.to_path_buf()),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|source| ConfigError::Json { path: None, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crew_types.is_empty() {
            return Err(ConfigError::Invalid("at least one crew type is required".to_string()));
        }
        for crew_type in &self.crew_types {
            if crew_type.skills.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "crew type '{}' has no skills",
                    crew_type.name
                )));
            }
            if !(crew_type.daily_capacity_hours > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "crew type '{}' must have positive daily capacity",
                    crew_type.name
                )));
            }
        }
        if !(self.job_defaults.duration_hours > 0.0) {
            return Err(ConfigError::Invalid("default duration must be positive".to_string()));
        }
        if !(self.clustering.eps_miles > 0.0) || self.clustering.min_samples == 0 {
            return Err(ConfigError::Invalid(
                "clustering needs positive eps_miles and min_samples".to_string(),
            ));
        }
        if !(self.solve.travel_speed_mph > 0.0) {
            return Err(ConfigError::Invalid("travel speed must be positive".to_string()));
        }
        if self.solve.buffer_hours < 0.0 || self.solve.max_days == 0 {
            return Err(ConfigError::Invalid(
                "buffer must be non-negative and max_days positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Json { path: Option<PathBuf>, source: serde_json::Error },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, .. } => write!(f, "unable to read config {}", path.display()),
            ConfigError::Json { path: Some(path), source } => {
                write!(f, "invalid config {}: {}", path.display(), source)
            }
            ConfigError::Json { path: None, source } => write!(f, "invalid config: {}", source),
            ConfigError::Invalid(reason) => write!(f, "invalid config: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Json { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}
