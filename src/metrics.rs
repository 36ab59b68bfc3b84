//! Schedule metrics and the per-job cost model.
//!
//! Metrics are a read-only aggregation over a finished [`Schedule`]; no
//! scheduling decisions are made here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Job;
use crate::solver::Schedule;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostRates {
    /// Labor rate used by the per-job estimator, per hour.
    pub labor_rate: f64,
    /// Equipment rate, per hour.
    pub equipment_rate: f64,
    /// Crew travel cost, per hour.
    pub travel_cost_per_hour: f64,
    /// Overhead as a fraction (0.15 = 15%).
    pub overhead_percentage: f64,
}

impl Default for CostRates {
    fn default() -> Self {
        Self {
            labor_rate: 85.0,
            equipment_rate: 150.0,
            travel_cost_per_hour: 50.0,
            overhead_percentage: 0.15,
        }
    }
}

/// Cost of a single job as bid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub labor_cost: f64,
    pub equipment_cost: f64,
    pub material_cost: f64,
    pub subtotal: f64,
    pub overhead: f64,
    pub total_cost: f64,
}

impl CostEstimate {
    /// Profit if the job is billed at `revenue`.
    pub fn profit_for(&self, revenue: f64) -> f64 {
        revenue - self.total_cost
    }
}

/// Overhead is applied to labor, equipment and materials together.
pub fn estimate_job_cost(
    labor_hours: f64,
    equipment_hours: f64,
    material_cost: f64,
    rates: &CostRates,
) -> CostEstimate {
    let labor_cost = labor_hours * rates.labor_rate;
    let equipment_cost = equipment_hours * rates.equipment_rate;
    let subtotal = labor_cost + equipment_cost + material_cost;
    let overhead = subtotal * rates.overhead_percentage;

    CostEstimate {
        labor_cost,
        equipment_cost,
        material_cost,
        subtotal,
        overhead,
        total_cost: subtotal + overhead,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    /// Crew hours priced at each crew type's hourly cost.
    pub labor: f64,
    pub equipment: f64,
    pub travel: f64,
    /// Overhead on labor and travel.
    pub overhead: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleMetrics {
    pub total_days: u32,
    pub jobs_scheduled: usize,
    pub jobs_unscheduled: usize,
    pub total_profit: f64,
    pub average_daily_profit: f64,
    pub peak_daily_jobs: usize,
    pub scheduled_hours: f64,
    pub available_crew_hours: f64,
    /// Scheduled hours over available crew-day hours (0..1).
    pub utilization: f64,
    pub total_travel_hours: f64,
    /// (1 - travel hours / job hours) * 100.
    pub travel_efficiency_percent: f64,
    pub cost_breakdown: CostBreakdown,
}

pub fn calculate_metrics(schedule: &Schedule, jobs: &[Job], rates: &CostRates) -> ScheduleMetrics {
    let crew_rates: HashMap<&str, f64> = schedule
        .crews
        .iter()
        .map(|crew| (crew.id.as_str(), crew.cost_per_hour))
        .collect();

    let mut total_profit = 0.0;
    let mut scheduled_hours = 0.0;
    let mut labor = 0.0;
    let mut equipment_hours = 0.0;

    for crew_day in schedule.days.iter().flat_map(|day| day.crews.iter()) {
        scheduled_hours += crew_day.scheduled_hours;
        labor += crew_day.scheduled_hours
            * crew_rates.get(crew_day.crew_id.as_str()).copied().unwrap_or(0.0);

        for assignment in &crew_day.assignments {
            if let Some(job) = jobs.get(assignment.job_index) {
                total_profit += job.profit;
                equipment_hours += job.equipment_hours;
            }
        }
    }

    let peak_daily_jobs = schedule
        .days
        .iter()
        .map(|day| day.job_count())
        .max()
        .unwrap_or(0);

    let average_daily_profit = if schedule.total_days == 0 {
        0.0
    } else {
        total_profit / f64::from(schedule.total_days)
    };

    let daily_capacity: f64 = schedule
        .crews
        .iter()
        .map(|crew| schedule.crew_day_limit(crew))
        .sum();
    let available_crew_hours = daily_capacity * f64::from(schedule.total_days);
    let utilization = if available_crew_hours > 0.0 {
        scheduled_hours / available_crew_hours
    } else {
        0.0
    };

    let travel_efficiency_percent = if scheduled_hours > 0.0 {
        (1.0 - schedule.total_travel_hours / scheduled_hours) * 100.0
    } else {
        0.0
    };

    let equipment = equipment_hours * rates.equipment_rate;
    let travel = schedule.total_travel_hours * rates.travel_cost_per_hour;
    let overhead = (labor + travel) * rates.overhead_percentage;

    ScheduleMetrics {
        total_days: schedule.total_days,
        jobs_scheduled: schedule.jobs_scheduled,
        jobs_unscheduled: schedule.jobs_unscheduled,
        total_profit,
        average_daily_profit,
        peak_daily_jobs,
        scheduled_hours,
        available_crew_hours,
        utilization,
        total_travel_hours: schedule.total_travel_hours,
        travel_efficiency_percent,
        cost_breakdown: CostBreakdown {
            labor,
            equipment,
            travel,
            overhead,
            total: labor + equipment + travel + overhead,
        },
    }
}
