//! bundle-planner: multi-day crew scheduling for large utility work bundles.
//!
//! Pipeline: raw job records and estimates are prepared into jobs, linked by
//! same-location dependencies, clustered geographically, ordered by a
//! strategy, packed into crew-days and summarized with cost metrics.

pub mod traits;
pub mod config;
pub mod error;
pub mod model;
pub mod prepare;
pub mod dependency;
pub mod cluster;
pub mod prioritize;
pub mod solver;
pub mod metrics;
pub mod optimize;
pub mod planar;
pub mod matrix;
pub mod osrm;
pub mod telemetry;

pub use optimize::{
    BundleRequest, OptimizeResponse, PlanRequest, Planner, optimize_batch, optimize_schedule,
};
