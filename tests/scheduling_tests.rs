//! End-to-end scheduling properties
//!
//! Dependency ordering, crew-day capacity, uniqueness, stall handling and
//! determinism over realistic bundles.

mod fixtures;

use std::collections::{HashMap, HashSet};

use bundle_planner::config::{CrewType, PlannerConfig};
use bundle_planner::model::{Estimate, RawJob};
use bundle_planner::solver::SolveOptions;
use bundle_planner::optimize::OptimizeResult;
use bundle_planner::planar::PlanarTravel;
use bundle_planner::solver::{CancelToken, Termination, UnscheduledReason};
use bundle_planner::{PlanRequest, Planner};

use fixtures::{Bundle, MIDTOWN, all_sites, site_chains};

// ============================================================================
// Helpers
// ============================================================================

fn plan(
    planner: &Planner,
    bundle: &Bundle,
    max_daily_hours: u32,
    prioritize: &str,
    crews: usize,
) -> OptimizeResult {
    plan_cancellable(planner, bundle, max_daily_hours, prioritize, crews, None)
}

fn plan_cancellable(
    planner: &Planner,
    bundle: &Bundle,
    max_daily_hours: u32,
    prioritize: &str,
    crews: usize,
    cancel: Option<&CancelToken>,
) -> OptimizeResult {
    let request = PlanRequest {
        jobs: &bundle.jobs,
        estimates: &bundle.estimates,
        max_daily_hours,
        prioritize,
        num_crews: crews,
    };
    let travel = PlanarTravel::new(planner.config().solve.travel_speed_mph);
    planner
        .plan_with(&request, &travel, cancel)
        .expect("bundle should plan")
}

fn generalist_planner(skills: &[&str]) -> Planner {
    let config = PlannerConfig {
        crew_types: vec![CrewType::new("general", skills.iter().copied(), 24.0, 180.0)],
        ..PlannerConfig::default()
    };
    Planner::from_config(config)
}

fn day_of(result: &OptimizeResult, job_id: &str) -> Option<u32> {
    result.schedule.assignment_for(job_id).map(|a| a.day)
}

// ============================================================================
// Concrete scenarios
// ============================================================================

#[test]
fn test_dependency_chain_respects_buffer_and_day_granularity() {
    let site = &MIDTOWN[0];
    let bundle = Bundle::new()
        .job("pole", "07D", site, 8.0, 3000.0)
        .job("crossarm", "KAA", site, 6.0, 2000.0)
        .job("anchor", "2AA", site, 4.0, 1000.0);

    let result = plan(&generalist_planner(&["07D", "KAA", "2AA"]), &bundle, 12, "profit", 1);

    // 8 + 4 exceeds the 10 usable hours, so only the pole fits on day 1.
    assert_eq!(day_of(&result, "pole"), Some(1));
    assert_eq!(day_of(&result, "anchor"), Some(2));
    assert_eq!(day_of(&result, "crossarm"), Some(2));
    assert_eq!(result.schedule.total_days, 2);
    assert_eq!(result.schedule.termination, Termination::Completed);
    assert_eq!(result.dependency_edges, 1);
}

#[test]
fn test_oversized_job_stalls_after_first_day() {
    let bundle = Bundle::new().job("huge", "07D", &MIDTOWN[0], 20.0, 5000.0);

    let result = plan(&Planner::default(), &bundle, 12, "profit", 3);

    assert_eq!(result.schedule.termination, Termination::Stalled);
    assert_eq!(result.schedule.jobs_unscheduled, 1);
    assert_eq!(result.schedule.total_days, 0);
    assert_eq!(
        result.schedule.unscheduled[0].reason,
        UnscheduledReason::ExceedsDailyCapacity
    );
}

#[test]
fn test_unknown_tag_is_left_unscheduled_without_blocking_others() {
    let site = &MIDTOWN[1];
    let bundle = Bundle::new()
        .job("pole", "07D", site, 4.0, 800.0)
        .job("mystery", "QQQ", site, 2.0, 100.0);

    let result = plan(&Planner::default(), &bundle, 12, "profit", 2);

    assert_eq!(day_of(&result, "pole"), Some(1));
    assert_eq!(result.schedule.jobs_unscheduled, 1);
    assert_eq!(result.schedule.unscheduled[0].job_id, "mystery");
    assert_eq!(result.schedule.unscheduled[0].reason, UnscheduledReason::NoCapableCrew);
}

#[test]
fn test_blocked_dependent_reports_its_reason() {
    let site = &MIDTOWN[2];
    let bundle = Bundle::new()
        .job("pole", "07D", site, 20.0, 800.0)
        .job("crossarm", "KAA", site, 2.0, 100.0);

    let result = plan(&Planner::default(), &bundle, 12, "profit", 1);

    let reasons: HashMap<&str, UnscheduledReason> = result
        .schedule
        .unscheduled
        .iter()
        .map(|u| (u.job_id.as_str(), u.reason))
        .collect();
    assert_eq!(reasons["pole"], UnscheduledReason::ExceedsDailyCapacity);
    assert_eq!(reasons["crossarm"], UnscheduledReason::BlockedByDependency);
}

#[test]
fn test_degraded_records_still_schedule() {
    let mut estimates = HashMap::new();
    estimates.insert("no-location".to_string(), Estimate::new(3.0, 200.0));
    let bundle = Bundle {
        jobs: vec![
            RawJob::new("no-location", "07D"),
            RawJob::new("no-estimate", "2AA").at(38.57, -121.48),
        ],
        estimates,
    };

    let result = plan(&Planner::default(), &bundle, 12, "profit", 1);

    assert_eq!(result.schedule.jobs_scheduled, 2);
    let fallback = result
        .schedule
        .assignment_for("no-estimate")
        .expect("scheduled");
    assert_eq!(fallback.duration_hours, 8.0);
}

#[test]
fn test_job_longer_than_crew_type_capacity_fits_a_long_day() {
    // 13h exceeds every default crew type's capacity but fits in 16 - 2.
    let bundle = Bundle::new().job("big", "07D", &MIDTOWN[0], 13.0, 4000.0);

    let result = plan(&Planner::default(), &bundle, 16, "profit", 3);

    assert_eq!(result.schedule.jobs_scheduled, 1);
    assert_eq!(day_of(&result, "big"), Some(1));
    assert!(result.schedule.unscheduled.is_empty());
}

#[test]
fn test_crew_type_capacity_cap_is_opt_in() {
    let config = PlannerConfig {
        solve: SolveOptions {
            cap_to_crew_capacity: true,
            ..SolveOptions::default()
        },
        ..PlannerConfig::default()
    };
    let bundle = Bundle::new().job("big", "07D", &MIDTOWN[0], 13.0, 4000.0);

    let result = plan(&Planner::from_config(config), &bundle, 16, "profit", 3);

    assert_eq!(result.schedule.jobs_scheduled, 0);
    assert_eq!(
        result.schedule.unscheduled[0].reason,
        UnscheduledReason::ExceedsDailyCapacity
    );
}

// ============================================================================
// Job identity
// ============================================================================

fn assigned_ids(result: &OptimizeResult) -> Vec<&str> {
    result
        .schedule
        .assignments()
        .map(|a| a.job_id.as_str())
        .collect()
}

#[test]
fn test_duplicate_ids_are_assigned_once() {
    let bundle = Bundle {
        jobs: vec![
            RawJob::new("J1", "07D").at(38.57, -121.48),
            RawJob::new("J1", "2AA").at(38.57, -121.48),
            RawJob::new("J2", "2AA").at(38.57, -121.48),
        ],
        estimates: HashMap::new(),
    };

    let result = plan(&Planner::default(), &bundle, 12, "profit", 2);

    let ids = assigned_ids(&result);
    assert_eq!(ids.iter().filter(|&&id| id == "J1").count(), 1);
    assert_eq!(result.schedule.jobs_scheduled, 2);
    assert_eq!(result.schedule.jobs_unscheduled, 0);
    assert_eq!(
        result.schedule.assignment_for("J1").map(|a| a.tag.as_str()),
        Some("07D")
    );
}

#[test]
fn test_positional_id_does_not_clash_with_real_id() {
    let bundle = Bundle {
        jobs: vec![
            RawJob::new("job-2", "07D").at(38.57, -121.48),
            RawJob::from(serde_json::json!({ "tag": "2AA", "coordinates": [38.57, -121.48] })),
        ],
        estimates: HashMap::new(),
    };

    let result = plan(&Planner::default(), &bundle, 12, "profit", 2);

    let ids = assigned_ids(&result);
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(unique.len(), 2);
    assert!(unique.contains("job-2"));
}

// ============================================================================
// Properties over a full territory bundle
// ============================================================================

#[test]
fn test_prerequisites_always_finish_on_an_earlier_day() {
    let bundle = site_chains(&all_sites());
    for strategy in ["profit", "compliance", "schedule"] {
        let result = plan(&Planner::default(), &bundle, 12, strategy, 3);

        for site in all_sites() {
            let pole = day_of(&result, &format!("{}-pole", site.name)).expect("pole scheduled");
            for dependent in ["arm", "xfmr"] {
                let day = day_of(&result, &format!("{}-{}", site.name, dependent))
                    .expect("dependent scheduled");
                assert!(
                    day > pole,
                    "{} {} on day {} but pole on day {}",
                    strategy,
                    dependent,
                    day,
                    pole
                );
            }
        }
    }
}

#[test]
fn test_crew_days_never_exceed_usable_hours() {
    let bundle = site_chains(&all_sites());
    for (max_daily_hours, strategy) in [(8, "profit"), (12, "compliance"), (16, "schedule")] {
        let result = plan(&Planner::default(), &bundle, max_daily_hours, strategy, 4);
        let usable = f64::from(max_daily_hours) - 2.0;

        for day in &result.schedule.days {
            for crew_day in &day.crews {
                let hours: f64 = crew_day.assignments.iter().map(|a| a.duration_hours).sum();
                assert!(
                    hours <= usable + 1e-9,
                    "{} on day {} booked {}h of {}h",
                    crew_day.crew_id,
                    day.day,
                    hours,
                    usable
                );
            }
        }
    }
}

#[test]
fn test_every_job_is_assigned_at_most_once() {
    let bundle = site_chains(&all_sites());
    let result = plan(&Planner::default(), &bundle, 10, "schedule", 2);

    let mut seen = HashSet::new();
    for assignment in result.schedule.assignments() {
        assert!(
            seen.insert(assignment.job_id.clone()),
            "{} assigned twice",
            assignment.job_id
        );
    }
    assert_eq!(
        result.schedule.jobs_scheduled + result.schedule.jobs_unscheduled,
        bundle.jobs.len()
    );
    assert_eq!(seen.len(), result.schedule.jobs_scheduled);
}

#[test]
fn test_crews_only_receive_matching_tags() {
    let bundle = site_chains(&all_sites());
    let result = plan(&Planner::default(), &bundle, 12, "profit", 3);

    let skills: HashMap<&str, _> = result
        .schedule
        .crews
        .iter()
        .map(|crew| (crew.id.as_str(), &crew.skills))
        .collect();
    for assignment in result.schedule.assignments() {
        assert!(
            skills[assignment.crew_id.as_str()].contains(&assignment.tag),
            "{} cannot perform {}",
            assignment.crew_id,
            assignment.tag
        );
    }
}

#[test]
fn test_clusters_follow_neighborhoods() {
    let bundle = site_chains(&all_sites());
    let result = plan(&Planner::default(), &bundle, 12, "schedule", 3);

    // Midtown, east side, and one cluster per rural site (four jobs each).
    assert_eq!(result.clusters, 5);
}

#[test]
fn test_planning_is_deterministic() {
    let bundle = site_chains(&all_sites());
    let first = plan(&Planner::default(), &bundle, 12, "schedule", 3);
    let second = plan(&Planner::default(), &bundle, 12, "schedule", 3);

    assert_eq!(first.clusters, second.clusters);
    assert_eq!(first.schedule, second.schedule);
    assert_eq!(first.metrics, second.metrics);
}

#[test]
fn test_cancelled_run_returns_partial_result() {
    let token = CancelToken::new();
    token.cancel();
    let bundle = site_chains(MIDTOWN);

    let result = plan_cancellable(&Planner::default(), &bundle, 12, "profit", 2, Some(&token));

    assert_eq!(result.schedule.termination, Termination::Cancelled);
    assert_eq!(result.schedule.jobs_unscheduled, bundle.jobs.len());
    assert!(
        result
            .schedule
            .unscheduled
            .iter()
            .all(|u| u.reason == UnscheduledReason::Cancelled)
    );
}

#[test]
fn test_metrics_are_consistent_with_schedule() {
    let bundle = site_chains(&all_sites());
    let result = plan(&Planner::default(), &bundle, 12, "profit", 3);
    let metrics = &result.metrics;

    assert!(metrics.utilization > 0.0 && metrics.utilization <= 1.0);
    assert!(metrics.travel_efficiency_percent <= 100.0);
    assert!(metrics.peak_daily_jobs >= 1);
    assert_eq!(metrics.total_days, result.schedule.total_days);

    let costs = &metrics.cost_breakdown;
    let expected_overhead = (costs.labor + costs.travel) * 0.15;
    assert!((costs.overhead - expected_overhead).abs() < 1e-6);
    assert!((costs.travel - result.schedule.total_travel_hours * 50.0).abs() < 1e-6);
}
