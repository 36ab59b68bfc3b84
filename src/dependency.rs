//! Same-location precedence graph between jobs.
//!
//! Jobs are stored in an index arena (the prepared job list) and edges are
//! index lists, so no reference cycles can form even when the input rules do.
//!
//! Edges only ever connect jobs at the same rounded coordinates. Jobs at
//! different sites are never interdependent; this is a simplifying
//! assumption about field work, not a property of real dependencies.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::model::Job;
use crate::traits::Coordinates;

/// Decimal places kept when matching job locations (~11 m).
const LOCATION_PRECISION: f64 = 10_000.0;

/// Job index → indices of the jobs that must be completed first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    prerequisites: Vec<Vec<usize>>,
}

/// Build the graph from the prepared jobs.
///
/// Each job's `dependency_tags` (seeded from the rule table during
/// preparation) are matched against the tags of the other jobs at its site.
pub fn build_dependency_graph(jobs: &[Job]) -> DependencyGraph {
    let mut sites: HashMap<(i64, i64), HashMap<&str, Vec<usize>>> = HashMap::new();
    for (index, job) in jobs.iter().enumerate() {
        sites
            .entry(location_key(job.coordinates))
            .or_default()
            .entry(job.tag.as_str())
            .or_default()
            .push(index);
    }

    let mut prerequisites = vec![Vec::new(); jobs.len()];
    for (index, job) in jobs.iter().enumerate() {
        if job.dependency_tags.is_empty() {
            continue;
        }
        let Some(site) = sites.get(&location_key(job.coordinates)) else {
            continue;
        };

        let edges: &mut Vec<usize> = &mut prerequisites[index];
        for tag in &job.dependency_tags {
            if let Some(matches) = site.get(tag.as_str()) {
                edges.extend(matches.iter().copied().filter(|&other| other != index));
            }
        }
        edges.sort_unstable();
        edges.dedup();
    }

    DependencyGraph { prerequisites }
}

fn location_key(coordinates: Coordinates) -> (i64, i64) {
    (
        (coordinates.0 * LOCATION_PRECISION).round() as i64,
        (coordinates.1 * LOCATION_PRECISION).round() as i64,
    )
}

impl DependencyGraph {
    pub fn len(&self) -> usize {
        self.prerequisites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prerequisites.is_empty()
    }

    pub fn prerequisites_of(&self, index: usize) -> &[usize] {
        self.prerequisites
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.prerequisites.iter().map(Vec::len).sum()
    }

    /// Id-keyed view (only jobs with prerequisites).
    pub fn to_id_map(&self, jobs: &[Job]) -> BTreeMap<String, Vec<String>> {
        self.prerequisites
            .iter()
            .enumerate()
            .filter(|(_, edges)| !edges.is_empty())
            .map(|(index, edges)| {
                (
                    jobs[index].id.clone(),
                    edges.iter().map(|&p| jobs[p].id.clone()).collect(),
                )
            })
            .collect()
    }

    /// Jobs that can never be ordered: members of a cycle and everything
    /// depending on one. Uses Kahn's algorithm; leftovers are marked `true`.
    pub fn unorderable(&self) -> Vec<bool> {
        let n = self.prerequisites.len();
        let mut remaining: Vec<usize> = self.prerequisites.iter().map(Vec::len).collect();
        let mut dependents = vec![Vec::new(); n];
        for (index, edges) in self.prerequisites.iter().enumerate() {
            for &prereq in edges {
                dependents[prereq].push(index);
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| remaining[i] == 0).collect();
        let mut ordered = vec![false; n];
        while let Some(index) = queue.pop_front() {
            ordered[index] = true;
            for &dependent in &dependents[index] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        ordered.into_iter().map(|done| !done).collect()
    }

    /// One dependency cycle, as job indices, if any exists.
    pub fn find_cycle(&self) -> Option<Vec<usize>> {
        let unorderable = self.unorderable();
        let start = unorderable.iter().position(|&stuck| stuck)?;

        // Every stuck job has at least one stuck prerequisite, so walking
        // prerequisites inside the stuck set must revisit a job.
        let mut seen_at: HashMap<usize, usize> = HashMap::new();
        let mut path = Vec::new();
        let mut current = start;
        loop {
            if let Some(&position) = seen_at.get(&current) {
                return Some(path.split_off(position));
            }
            seen_at.insert(current, path.len());
            path.push(current);
            current = *self.prerequisites[current]
                .iter()
                .find(|&&p| unorderable[p])?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn job(id: &str, tag: &str, at: Coordinates, deps: &[&str]) -> Job {
        Job {
            id: id.to_string(),
            tag: tag.to_string(),
            coordinates: at,
            duration: 4.0,
            dependency_tags: deps.iter().map(|d| d.to_string()).collect::<BTreeSet<_>>(),
            compliance_score: 0.8,
            profit: 0.0,
            priority: 3,
            equipment_hours: 0.0,
        }
    }

    const SITE_A: Coordinates = (38.5, -121.5);
    const SITE_B: Coordinates = (38.6, -121.5);

    #[test]
    fn test_edges_only_within_same_site() {
        let jobs = vec![
            job("pole-a", "07D", SITE_A, &[]),
            job("arm-a", "KAA", SITE_A, &["07D"]),
            job("pole-b", "07D", SITE_B, &[]),
            job("arm-b", "KAA", SITE_B, &["07D"]),
        ];
        let graph = build_dependency_graph(&jobs);

        assert_eq!(graph.prerequisites_of(1), &[0]);
        assert_eq!(graph.prerequisites_of(3), &[2]);
        assert!(graph.prerequisites_of(0).is_empty());
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_rounding_absorbs_float_noise() {
        let jobs = vec![
            job("pole", "07D", (38.500001, -121.500001), &[]),
            job("arm", "KAA", (38.499999, -121.499999), &["07D"]),
        ];
        let graph = build_dependency_graph(&jobs);
        assert_eq!(graph.prerequisites_of(1), &[0]);
    }

    #[test]
    fn test_depends_on_every_matching_job_at_site() {
        let jobs = vec![
            job("pole-1", "07D", SITE_A, &[]),
            job("pole-2", "07D", SITE_A, &[]),
            job("xfmr", "TRX", SITE_A, &["07D"]),
        ];
        let graph = build_dependency_graph(&jobs);
        let map = graph.to_id_map(&jobs);

        assert_eq!(map.len(), 1);
        assert_eq!(map["xfmr"], vec!["pole-1".to_string(), "pole-2".to_string()]);
    }

    #[test]
    fn test_job_never_depends_on_itself() {
        let jobs = vec![job("odd", "07D", SITE_A, &["07D"])];
        let graph = build_dependency_graph(&jobs);
        assert!(graph.prerequisites_of(0).is_empty());
        assert!(graph.find_cycle().is_none());
    }

    #[test]
    fn test_acyclic_graph_is_fully_orderable() {
        let jobs = vec![
            job("pole", "07D", SITE_A, &[]),
            job("arm", "KAA", SITE_A, &["07D"]),
            job("wire", "6AA", SITE_A, &["KAA"]),
        ];
        let graph = build_dependency_graph(&jobs);
        assert!(graph.unorderable().iter().all(|stuck| !stuck));
        assert!(graph.find_cycle().is_none());
    }

    #[test]
    fn test_cycle_is_detected_with_downstream_jobs() {
        let jobs = vec![
            job("a", "AAA", SITE_A, &["BBB"]),
            job("b", "BBB", SITE_A, &["AAA"]),
            job("c", "CCC", SITE_A, &["AAA"]),
            job("free", "DDD", SITE_A, &[]),
        ];
        let graph = build_dependency_graph(&jobs);

        assert_eq!(graph.unorderable(), vec![true, true, true, false]);

        let mut cycle = graph.find_cycle().expect("cycle present");
        cycle.sort_unstable();
        assert_eq!(cycle, vec![0, 1]);
    }
}
