//! Day-by-day greedy crew scheduler.
//!
//! # Algorithm
//!
//! 1. Each day, every crew scans the prioritized job list and takes each job
//!    that is unscheduled, whose prerequisites are all completed and whose tag
//!    is in the crew's skills, as long as it still fits in the crew-day.
//! 2. Jobs scheduled on a day only count as completed once the day is over,
//!    so prerequisites are always on a strictly earlier day.
//! 3. A day without any new assignment ends the run (progress stall).
//!
//! Travel between a crew's consecutive jobs is estimated and reported, but it
//! is not charged against the crew-day capacity.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cluster::Cluster;
use crate::dependency::DependencyGraph;
use crate::model::{Crew, Job};
use crate::planar::DEFAULT_SPEED_MPH;
use crate::traits::{Coordinates, TravelModel};

/// Slack when comparing accumulated hours against a limit.
const HOURS_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Hours held back from every crew-day.
    pub buffer_hours: f64,
    /// Hard ceiling on the number of days simulated.
    pub max_days: u32,
    /// Average travel speed for the planar travel model.
    pub travel_speed_mph: f64,
    /// Also cap each crew-day at the crew type's `daily_capacity_hours`.
    pub cap_to_crew_capacity: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            buffer_hours: 2.0,
            max_days: 365,
            travel_speed_mph: DEFAULT_SPEED_MPH,
            cap_to_crew_capacity: false,
        }
    }
}

/// Cooperative cancellation flag, checked once per scheduled day.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything the scheduler reads for one run.
#[derive(Debug, Clone, Copy)]
pub struct SolveInput<'a> {
    pub jobs: &'a [Job],
    /// Prioritized job indices.
    pub order: &'a [usize],
    pub graph: &'a DependencyGraph,
    /// Used for zone labels only.
    pub clusters: &'a [Cluster],
    pub crews: &'a [Crew],
    pub max_daily_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub job_id: String,
    pub tag: String,
    pub day: u32,
    pub crew_id: String,
    /// Hours after the start of the crew-day.
    pub start_hour: f64,
    pub duration_hours: f64,
    pub zone: String,
    #[serde(skip)]
    pub job_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrewDay {
    pub crew_id: String,
    pub crew_type: String,
    pub assignments: Vec<Assignment>,
    pub scheduled_hours: f64,
    pub travel_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySchedule {
    pub day: u32,
    /// Crews with at least one job that day.
    pub crews: Vec<CrewDay>,
}

impl DaySchedule {
    pub fn job_count(&self) -> usize {
        self.crews.iter().map(|c| c.assignments.len()).sum()
    }
}

/// Why the day loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Completed,
    Stalled,
    DayLimit,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscheduledReason {
    /// No crew has the job's tag among its skills.
    NoCapableCrew,
    /// The job alone exceeds the crew-day limit of every capable crew.
    ExceedsDailyCapacity,
    /// The job sits on, or depends on, a dependency cycle.
    DependencyCycle,
    /// A prerequisite was never scheduled.
    BlockedByDependency,
    DayLimitReached,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnscheduledJob {
    pub job_id: String,
    pub reason: UnscheduledReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    pub days: Vec<DaySchedule>,
    pub total_days: u32,
    pub total_travel_hours: f64,
    pub jobs_scheduled: usize,
    pub jobs_unscheduled: usize,
    pub termination: Termination,
    pub unscheduled: Vec<UnscheduledJob>,
    pub crews: Vec<Crew>,
    pub max_daily_hours: f64,
    pub buffer_hours: f64,
    pub capped_to_crew_capacity: bool,
}

impl Schedule {
    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.days
            .iter()
            .flat_map(|day| day.crews.iter())
            .flat_map(|crew_day| crew_day.assignments.iter())
    }

    pub fn assignment_for(&self, job_id: &str) -> Option<&Assignment> {
        self.assignments().find(|a| a.job_id == job_id)
    }

    /// Hours available to `crew` on one day of this schedule.
    pub fn crew_day_limit(&self, crew: &Crew) -> f64 {
        usable_hours(
            crew,
            self.max_daily_hours,
            self.buffer_hours,
            self.capped_to_crew_capacity,
        )
    }
}

/// Usable hours for a crew-day: the requested day minus the buffer. With
/// `cap_to_crew_capacity` the crew type's own daily capacity also applies.
pub fn crew_day_limit(crew: &Crew, max_daily_hours: f64, options: &SolveOptions) -> f64 {
    usable_hours(
        crew,
        max_daily_hours,
        options.buffer_hours,
        options.cap_to_crew_capacity,
    )
}

fn usable_hours(crew: &Crew, max_daily_hours: f64, buffer_hours: f64, capped: bool) -> f64 {
    let limit = (max_daily_hours - buffer_hours).max(0.0);
    if capped {
        limit.min(crew.daily_capacity_hours)
    } else {
        limit
    }
}

#[derive(Debug, Clone)]
struct CrewDayState<'a> {
    crew: &'a Crew,
    limit: f64,
    hours: f64,
    assignments: Vec<Assignment>,
}

pub fn solve<M>(
    input: &SolveInput<'_>,
    travel: &M,
    options: &SolveOptions,
    cancel: Option<&CancelToken>,
) -> Schedule
where
    M: TravelModel,
{
    let jobs = input.jobs;
    let zones = zone_labels(jobs.len(), input.clusters);

    let mut scheduled = vec![false; jobs.len()];
    let mut completed = vec![false; jobs.len()];
    let mut remaining = input.order.len();
    let mut days: Vec<DaySchedule> = Vec::new();
    let mut total_travel_hours = 0.0;
    let mut termination: Option<Termination> = None;

    info!(
        jobs = jobs.len(),
        crews = input.crews.len(),
        max_daily_hours = input.max_daily_hours,
        "building schedule"
    );

    for day in 1..=options.max_days {
        if remaining == 0 {
            break;
        }
        if cancel.is_some_and(CancelToken::is_cancelled) {
            warn!(day, remaining, "schedule run cancelled");
            termination = Some(Termination::Cancelled);
            break;
        }

        let mut today: Vec<usize> = Vec::new();
        let mut crew_days = Vec::new();

        for crew in input.crews {
            let mut state = CrewDayState {
                crew,
                limit: crew_day_limit(crew, input.max_daily_hours, options),
                hours: 0.0,
                assignments: Vec::new(),
            };

            for &index in input.order {
                if state.hours + HOURS_EPSILON >= state.limit {
                    break;
                }
                if scheduled[index] {
                    continue;
                }
                let job = &jobs[index];
                if !crew.can_perform(&job.tag) {
                    continue;
                }
                if !input.graph.prerequisites_of(index).iter().all(|&p| completed[p]) {
                    continue;
                }
                if state.hours + job.duration > state.limit + HOURS_EPSILON {
                    continue;
                }

                state.assignments.push(Assignment {
                    job_id: job.id.clone(),
                    tag: job.tag.clone(),
                    day,
                    crew_id: crew.id.clone(),
                    start_hour: state.hours,
                    duration_hours: job.duration,
                    zone: zones[index].clone(),
                    job_index: index,
                });
                state.hours += job.duration;
                scheduled[index] = true;
                today.push(index);
            }

            if state.assignments.is_empty() {
                continue;
            }

            let stops: Vec<Coordinates> = state
                .assignments
                .iter()
                .map(|a| jobs[a.job_index].coordinates)
                .collect();
            let travel_hours = travel.route_hours(&stops);
            total_travel_hours += travel_hours;

            crew_days.push(CrewDay {
                crew_id: state.crew.id.clone(),
                crew_type: state.crew.crew_type.clone(),
                assignments: state.assignments,
                scheduled_hours: state.hours,
                travel_hours,
            });
        }

        if today.is_empty() {
            warn!(day, remaining, "no job could be scheduled, stopping early");
            termination = Some(Termination::Stalled);
            break;
        }

        for &index in &today {
            completed[index] = true;
        }
        remaining -= today.len();
        days.push(DaySchedule {
            day,
            crews: crew_days,
        });
    }

    let termination = termination.unwrap_or(if remaining == 0 {
        Termination::Completed
    } else {
        Termination::DayLimit
    });

    let unscheduled = diagnose_unscheduled(input, &scheduled, termination, options);
    let jobs_scheduled = scheduled.iter().filter(|&&s| s).count();

    info!(
        days = days.len(),
        scheduled = jobs_scheduled,
        unscheduled = unscheduled.len(),
        travel_hours = total_travel_hours,
        ?termination,
        "schedule built"
    );

    Schedule {
        total_days: days.len() as u32,
        days,
        total_travel_hours,
        jobs_scheduled,
        jobs_unscheduled: unscheduled.len(),
        termination,
        unscheduled,
        crews: input.crews.to_vec(),
        max_daily_hours: input.max_daily_hours,
        buffer_hours: options.buffer_hours,
        capped_to_crew_capacity: options.cap_to_crew_capacity,
    }
}

fn zone_labels(job_count: usize, clusters: &[Cluster]) -> Vec<String> {
    let mut zones = vec!["unzoned".to_string(); job_count];
    for (cluster_index, cluster) in clusters.iter().enumerate() {
        for &member in &cluster.members {
            if let Some(zone) = zones.get_mut(member) {
                *zone = format!("zone-{}", cluster_index + 1);
            }
        }
    }
    zones
}

fn diagnose_unscheduled(
    input: &SolveInput<'_>,
    scheduled: &[bool],
    termination: Termination,
    options: &SolveOptions,
) -> Vec<UnscheduledJob> {
    let mut pending = input
        .order
        .iter()
        .copied()
        .filter(|&i| !scheduled[i])
        .peekable();
    if pending.peek().is_none() {
        return Vec::new();
    }

    let unorderable = input.graph.unorderable();
    if let Some(cycle) = input.graph.find_cycle() {
        let ids: Vec<&str> = cycle.iter().map(|&i| input.jobs[i].id.as_str()).collect();
        warn!(cycle = ?ids, "dependency cycle prevents scheduling");
    }

    let mut unscheduled = Vec::new();
    for index in pending {
        let job = &input.jobs[index];
        let capable: Vec<&Crew> = input
            .crews
            .iter()
            .filter(|c| c.can_perform(&job.tag))
            .collect();
        let best_limit = capable
            .iter()
            .map(|crew| crew_day_limit(crew, input.max_daily_hours, options))
            .fold(0.0_f64, f64::max);

        let reason = if capable.is_empty() {
            UnscheduledReason::NoCapableCrew
        } else if job.duration > best_limit + HOURS_EPSILON {
            warn!(
                job_id = %job.id,
                duration = job.duration,
                limit = best_limit,
                "job exceeds daily crew capacity"
            );
            UnscheduledReason::ExceedsDailyCapacity
        } else if unorderable[index] {
            UnscheduledReason::DependencyCycle
        } else {
            match termination {
                Termination::Cancelled => UnscheduledReason::Cancelled,
                Termination::DayLimit => UnscheduledReason::DayLimitReached,
                // A feasible job is only left behind by a stall when some
                // prerequisite never got scheduled.
                Termination::Completed | Termination::Stalled => {
                    UnscheduledReason::BlockedByDependency
                }
            }
        };

        unscheduled.push(UnscheduledJob {
            job_id: job.id.clone(),
            reason,
        });
    }

    unscheduled
}
