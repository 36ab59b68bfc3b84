//! Job ordering strategies.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::cluster::Cluster;
use crate::model::Job;

/// How the job list is ordered before scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Highest profit first.
    Profit,
    /// Highest compliance score first, then most urgent priority.
    Compliance,
    /// Largest geographic clusters first to keep crews close together.
    Efficiency,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Profit => "profit",
            Strategy::Compliance => "compliance",
            Strategy::Efficiency => "efficiency",
        }
    }

    /// Order jobs, returning indices into `jobs`.
    pub fn order(&self, jobs: &[Job], clusters: &[Cluster]) -> Vec<usize> {
        match self {
            Strategy::Profit => by_profit(jobs),
            Strategy::Compliance => by_compliance(jobs),
            Strategy::Efficiency => by_cluster(jobs, clusters),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStrategy(pub String);

impl fmt::Display for UnknownStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown prioritization '{}' (expected profit, schedule or compliance)",
            self.0
        )
    }
}

impl std::error::Error for UnknownStrategy {}

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "profit" => Ok(Strategy::Profit),
            "compliance" => Ok(Strategy::Compliance),
            "schedule" | "efficiency" => Ok(Strategy::Efficiency),
            _ => Err(UnknownStrategy(value.to_string())),
        }
    }
}

fn by_profit(jobs: &[Job]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..jobs.len()).collect();
    order.sort_by(|&a, &b| jobs[b].profit.total_cmp(&jobs[a].profit));
    order
}

fn by_compliance(jobs: &[Job]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..jobs.len()).collect();
    order.sort_by(|&a, &b| {
        jobs[b]
            .compliance_score
            .total_cmp(&jobs[a].compliance_score)
            .then(jobs[a].priority.cmp(&jobs[b].priority))
    });
    order
}

fn by_cluster(jobs: &[Job], clusters: &[Cluster]) -> Vec<usize> {
    let mut ranked: Vec<&Cluster> = clusters.iter().collect();
    ranked.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut placed = vec![false; jobs.len()];
    let mut order = Vec::with_capacity(jobs.len());
    for cluster in ranked {
        let mut members: Vec<usize> = cluster
            .members
            .iter()
            .copied()
            .filter(|&i| i < jobs.len() && !placed[i])
            .collect();
        members.sort_by_key(|&i| jobs[i].priority);
        for index in members {
            placed[index] = true;
            order.push(index);
        }
    }

    order.extend((0..jobs.len()).filter(|&i| !placed[i]));
    order
}
