//! Input errors surfaced to callers as `{"error": ...}` results.

use std::fmt;

use crate::config::ConfigError;
use crate::prioritize::UnknownStrategy;

#[derive(Debug)]
pub enum PlanError {
    NoJobs,
    NoValidJobs,
    InvalidMaxDailyHours,
    NoCrews,
    UnknownStrategy(UnknownStrategy),
    Config(ConfigError),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::NoJobs => write!(f, "No jobs to schedule"),
            PlanError::NoValidJobs => write!(f, "No valid jobs to schedule"),
            PlanError::InvalidMaxDailyHours => write!(f, "max_daily_hours must be positive"),
            PlanError::NoCrews => write!(f, "num_crews must be positive"),
            PlanError::UnknownStrategy(err) => write!(f, "{}", err),
            PlanError::Config(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanError::UnknownStrategy(err) => Some(err),
            PlanError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UnknownStrategy> for PlanError {
    fn from(value: UnknownStrategy) -> Self {
        Self::UnknownStrategy(value)
    }
}

impl From<ConfigError> for PlanError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}
