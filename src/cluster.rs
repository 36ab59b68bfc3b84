//! Density-based geographic clustering (DBSCAN over planar miles).
//!
//! Every job ends up in exactly one cluster: points that do not belong to a
//! dense region become singleton clusters instead of being discarded.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Job;
use crate::planar::planar_point;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// Maximum distance between neighbors, in miles.
    pub eps_miles: f64,
    /// Minimum neighborhood size (the point itself included) for a core point.
    pub min_samples: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            eps_miles: 0.5,
            min_samples: 3,
        }
    }
}

/// A set of co-located jobs, as indices into the prepared job list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub members: Vec<usize>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[cfg(test)]
    pub fn job_ids<'a>(&self, jobs: &'a [Job]) -> Vec<&'a str> {
        self.members.iter().map(|&i| jobs[i].id.as_str()).collect()
    }
}

const UNVISITED: usize = usize::MAX;
const NOISE: usize = usize::MAX - 1;

/// Cluster jobs by location.
///
/// Dense clusters come first in discovery order (members in job order),
/// followed by one singleton per remaining job in job order.
pub fn cluster_jobs(jobs: &[Job], options: &ClusterOptions) -> Vec<Cluster> {
    let points: Vec<(f64, f64)> = jobs.iter().map(|job| planar_point(job.coordinates)).collect();
    let grid = SpatialGrid::new(&points, options.eps_miles);

    let mut labels = vec![UNVISITED; points.len()];
    let mut dense_count = 0;

    for index in 0..points.len() {
        if labels[index] != UNVISITED {
            continue;
        }
        let neighbors = grid.neighbors(&points, index);
        if neighbors.len() < options.min_samples {
            labels[index] = NOISE;
            continue;
        }

        let cluster_id = dense_count;
        dense_count += 1;
        labels[index] = cluster_id;

        let mut frontier = neighbors;
        let mut cursor = 0;
        while cursor < frontier.len() {
            let candidate = frontier[cursor];
            cursor += 1;

            if labels[candidate] == NOISE {
                // Border point: joins the cluster but does not expand it.
                labels[candidate] = cluster_id;
                continue;
            }
            if labels[candidate] != UNVISITED {
                continue;
            }
            labels[candidate] = cluster_id;

            let reach = grid.neighbors(&points, candidate);
            if reach.len() >= options.min_samples {
                frontier.extend(reach);
            }
        }
    }

    let mut clusters: Vec<Cluster> = (0..dense_count)
        .map(|_| Cluster { members: Vec::new() })
        .collect();
    let mut singletons = Vec::new();
    for (index, &label) in labels.iter().enumerate() {
        if label < dense_count {
            clusters[label].members.push(index);
        } else {
            singletons.push(Cluster {
                members: vec![index],
            });
        }
    }

    clusters.extend(singletons);
    clusters
}

/// Uniform grid of eps-sized cells for neighborhood queries.
struct SpatialGrid {
    eps: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl SpatialGrid {
    fn new(points: &[(f64, f64)], eps: f64) -> Self {
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (index, &point) in points.iter().enumerate() {
            cells.entry(cell_of(point, eps)).or_default().push(index);
        }
        Self { eps, cells }
    }

    /// Indices within `eps` of `points[index]`, itself included, ascending.
    fn neighbors(&self, points: &[(f64, f64)], index: usize) -> Vec<usize> {
        let origin = points[index];
        let (cx, cy) = cell_of(origin, self.eps);
        let mut found = Vec::new();

        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(bucket) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &other in bucket {
                    let (x, y) = points[other];
                    let dist = ((x - origin.0).powi(2) + (y - origin.1).powi(2)).sqrt();
                    if dist <= self.eps {
                        found.push(other);
                    }
                }
            }
        }

        found.sort_unstable();
        found
    }
}

fn cell_of(point: (f64, f64), eps: f64) -> (i64, i64) {
    ((point.0 / eps).floor() as i64, (point.1 / eps).floor() as i64)
}
