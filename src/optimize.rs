//! Run entry points: one bundle in, one structured result out.
//!
//! Nothing here panics or returns an error to the caller. Input problems
//! become `{"error": ...}` responses; partial schedules report their
//! unscheduled jobs in the summary.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::cluster::cluster_jobs;
use crate::config::PlannerConfig;
use crate::dependency::build_dependency_graph;
use crate::error::PlanError;
use crate::matrix::TravelMatrix;
use crate::metrics::{ScheduleMetrics, calculate_metrics};
use crate::model::{Estimate, Job, RawJob, instantiate_crews};
use crate::planar::PlanarTravel;
use crate::prepare::prepare_jobs;
use crate::prioritize::Strategy;
use crate::solver::{CancelToken, Schedule, SolveInput, solve};
use crate::traits::{Coordinates, TravelMatrixProvider, TravelModel};

/// Borrowed view of one bundle to plan.
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub jobs: &'a [RawJob],
    pub estimates: &'a HashMap<String, Estimate>,
    pub max_daily_hours: u32,
    /// `profit`, `compliance` or `schedule`.
    pub prioritize: &'a str,
    pub num_crews: usize,
}

/// Owned bundle, e.g. decoded from a queue message.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleRequest {
    pub jobs: Vec<RawJob>,
    #[serde(default)]
    pub estimates: HashMap<String, Estimate>,
    pub max_daily_hours: u32,
    pub prioritize: String,
    pub num_crews: usize,
}

impl BundleRequest {
    pub fn as_request(&self) -> PlanRequest<'_> {
        PlanRequest {
            jobs: &self.jobs,
            estimates: &self.estimates,
            max_daily_hours: self.max_daily_hours,
            prioritize: &self.prioritize,
            num_crews: self.num_crews,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizeResult {
    pub schedule: Schedule,
    pub metrics: ScheduleMetrics,
    /// Number of geographic clusters, singletons included.
    pub clusters: usize,
    pub optimization_method: Strategy,
    pub constraints: Vec<String>,
    pub dependency_edges: usize,
    /// Prerequisite job ids keyed by dependent job id.
    pub dependencies: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OptimizeResponse {
    Failed { error: String },
    Optimized(Box<OptimizeResult>),
}

impl OptimizeResponse {
    pub fn error(&self) -> Option<&str> {
        match self {
            OptimizeResponse::Failed { error } => Some(error),
            OptimizeResponse::Optimized(_) => None,
        }
    }

    pub fn result(&self) -> Option<&OptimizeResult> {
        match self {
            OptimizeResponse::Failed { .. } => None,
            OptimizeResponse::Optimized(result) => Some(result),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .unwrap_or_else(|err| serde_json::json!({ "error": err.to_string() }))
    }
}

impl From<Result<OptimizeResult, PlanError>> for OptimizeResponse {
    fn from(value: Result<OptimizeResult, PlanError>) -> Self {
        match value {
            Ok(result) => OptimizeResponse::Optimized(Box::new(result)),
            Err(err) => OptimizeResponse::Failed {
                error: err.to_string(),
            },
        }
    }
}

/// Plan a bundle with the default configuration.
pub fn optimize_schedule(
    jobs: &[RawJob],
    estimates: &HashMap<String, Estimate>,
    max_daily_hours: u32,
    prioritize: &str,
    num_crews: usize,
) -> OptimizeResponse {
    let request = PlanRequest {
        jobs,
        estimates,
        max_daily_hours,
        prioritize,
        num_crews,
    };
    Planner::default().optimize(&request, None)
}

/// Plan independent bundles concurrently, each on its own copy of the tables.
pub fn optimize_batch(
    bundles: &[BundleRequest],
    config: &PlannerConfig,
) -> Vec<OptimizeResponse> {
    bundles
        .par_iter()
        .map(|bundle| {
            Planner::from_config(config.clone()).optimize(&bundle.as_request(), None)
        })
        .collect()
}

/// A planner bound to one configuration.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    /// Configuration is validated when a bundle is planned.
    pub fn from_config(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn optimize(
        &self,
        request: &PlanRequest<'_>,
        cancel: Option<&CancelToken>,
    ) -> OptimizeResponse {
        let travel = PlanarTravel::new(self.config.solve.travel_speed_mph);
        self.plan_with(request, &travel, cancel).into()
    }

    pub fn optimize_with<M>(
        &self,
        request: &PlanRequest<'_>,
        travel: &M,
        cancel: Option<&CancelToken>,
    ) -> OptimizeResponse
    where
        M: TravelModel,
    {
        self.plan_with(request, travel, cancel).into()
    }

    /// Plan with travel times from `provider`, fetched once for all job
    /// locations before scheduling starts.
    pub fn optimize_with_matrix<P>(
        &self,
        request: &PlanRequest<'_>,
        provider: &P,
        cancel: Option<&CancelToken>,
    ) -> OptimizeResponse
    where
        P: TravelMatrixProvider + ?Sized,
    {
        self.plan_with_matrix(request, provider, cancel).into()
    }

    pub fn plan_with<M>(
        &self,
        request: &PlanRequest<'_>,
        travel: &M,
        cancel: Option<&CancelToken>,
    ) -> Result<OptimizeResult, PlanError>
    where
        M: TravelModel,
    {
        self.plan(request, cancel, |_| travel)
    }

    pub fn plan_with_matrix<P>(
        &self,
        request: &PlanRequest<'_>,
        provider: &P,
        cancel: Option<&CancelToken>,
    ) -> Result<OptimizeResult, PlanError>
    where
        P: TravelMatrixProvider + ?Sized,
    {
        let fallback = PlanarTravel::new(self.config.solve.travel_speed_mph);
        self.plan(request, cancel, |jobs| {
            let locations: Vec<Coordinates> = jobs.iter().map(|job| job.coordinates).collect();
            TravelMatrix::from_provider(provider, &locations, fallback)
        })
    }

    /// `travel_for` runs once, after preparation and before the day loop.
    #[instrument(skip_all, fields(jobs = request.jobs.len(), strategy = %request.prioritize))]
    fn plan<M, F>(
        &self,
        request: &PlanRequest<'_>,
        cancel: Option<&CancelToken>,
        travel_for: F,
    ) -> Result<OptimizeResult, PlanError>
    where
        M: TravelModel,
        F: FnOnce(&[Job]) -> M,
    {
        if request.jobs.is_empty() {
            return Err(PlanError::NoJobs);
        }
        if request.max_daily_hours == 0 {
            return Err(PlanError::InvalidMaxDailyHours);
        }
        if request.num_crews == 0 {
            return Err(PlanError::NoCrews);
        }
        let strategy: Strategy = request.prioritize.parse()?;
        self.config.validate()?;

        let config = &self.config;
        let jobs = prepare_jobs(
            request.jobs,
            request.estimates,
            &config.dependency_rules,
            &config.job_defaults,
        );
        if jobs.is_empty() {
            return Err(PlanError::NoValidJobs);
        }

        let graph = build_dependency_graph(&jobs);
        let clusters = cluster_jobs(&jobs, &config.clustering);
        let order = strategy.order(&jobs, &clusters);
        let crews = instantiate_crews(request.num_crews, &config.crew_types);
        let max_daily_hours = f64::from(request.max_daily_hours);

        info!(
            prepared = jobs.len(),
            clusters = clusters.len(),
            dependency_edges = graph.edge_count(),
            "bundle prepared"
        );

        let input = SolveInput {
            jobs: &jobs,
            order: &order,
            graph: &graph,
            clusters: &clusters,
            crews: &crews,
            max_daily_hours,
        };
        let travel = travel_for(&jobs);
        let schedule = solve(&input, &travel, &config.solve, cancel);
        let metrics = calculate_metrics(&schedule, &jobs, &config.costs);
        let constraints = describe_constraints(config, &schedule, graph.edge_count());

        Ok(OptimizeResult {
            schedule,
            metrics,
            clusters: clusters.len(),
            optimization_method: strategy,
            constraints,
            dependency_edges: graph.edge_count(),
            dependencies: graph.to_id_map(&jobs),
        })
    }
}

fn describe_constraints(config: &PlannerConfig, schedule: &Schedule, edges: usize) -> Vec<String> {
    let mut crew_mix: BTreeMap<&str, usize> = BTreeMap::new();
    for crew in &schedule.crews {
        *crew_mix.entry(crew.crew_type.as_str()).or_default() += 1;
    }
    let mix = crew_mix
        .iter()
        .map(|(name, count)| format!("{} {}", count, name))
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        format!(
            "Maximum {} hours per crew per day with a {} hour buffer",
            schedule.max_daily_hours, schedule.buffer_hours
        ),
        format!("{} crews ({})", schedule.crews.len(), mix),
        "Crews only perform work tags in their skill set".to_string(),
        format!(
            "{} same-location dependencies, each completed on an earlier day",
            edges
        ),
        format!(
            "Geographic clusters within {} miles (minimum {} jobs)",
            config.clustering.eps_miles, config.clustering.min_samples
        ),
        "Travel time is reported but not deducted from crew capacity".to_string(),
        format!("Scheduling horizon capped at {} days", config.solve.max_days),
    ]
}
