//! Hybrid clustering orchestrator (C4, §4.4): density clustering → noise
//! reassignment → K-means size refinement, producing the final disjoint
//! partition of orders fed to the group and intra-group sequencers.

use crate::clustering::density::{dbscan, reassign_noise};
use crate::clustering::kmeans::kmeans;
use crate::geometry::{Metric, Point};

/// Tunables for the hybrid clustering pipeline, mirroring the `clustering`
/// block of §6's abstract planning request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClusteringParams {
    pub radius_km: f64,
    pub min_samples: usize,
    pub max_group_size: usize,
    pub metric: Metric,
    pub random_state: u64,
    pub n_init: usize,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        ClusteringParams {
            radius_km: 1.0,
            min_samples: 3,
            max_group_size: 30,
            metric: Metric::Euclidean,
            random_state: 42,
            n_init: 10,
        }
    }
}

/// A final cluster: a stable integer id plus the indices (into the plan's
/// order slice) it contains, in the order they were added.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: usize,
    pub order_indices: Vec<usize>,
}

impl Cluster {
    pub fn centroid(&self, points: &[Point]) -> Point {
        let members: Vec<Point> = self.order_indices.iter().map(|&i| points[i]).collect();
        Point::centroid(&members)
    }
}

/// Runs the full 3-phase hybrid clustering pipeline over `points` (one per
/// order, same indexing as the plan's order slice).
///
/// Contract: the partition is exact and disjoint, every cluster is
/// non-empty, and no final cluster exceeds `max_group_size` (§4.4
/// "Contract").
pub fn cluster(points: &[Point], params: &ClusteringParams) -> Vec<Cluster> {
    if points.is_empty() {
        return Vec::new();
    }

    let eps = params.metric.radius_to_epsilon(params.radius_km);
    let mut labels = dbscan(points, eps, params.min_samples, params.metric);
    reassign_noise(points, &mut labels, params.metric);

    let mut by_label: Vec<(i32, Vec<usize>)> = Vec::new();
    for (idx, &label) in labels.iter().enumerate() {
        match by_label.iter_mut().find(|(l, _)| *l == label) {
            Some((_, members)) => members.push(idx),
            None => by_label.push((label, vec![idx])),
        }
    }
    // Stable traversal order: by first-seen order-index, not by label value.
    by_label.sort_by_key(|(_, members)| members[0]);

    let mut final_clusters = Vec::new();
    for (_, members) in by_label {
        refine_into(points, members, params, &mut final_clusters);
    }

    for (id, cluster) in final_clusters.iter_mut().enumerate() {
        cluster.id = id;
    }
    final_clusters
}

/// Recursively subdivides `members` with K-means until every resulting
/// sub-cluster is within `max_group_size`, appending finished clusters to
/// `out` in traversal order. Handles the §4.4 "K-means over-produced"
/// hazard by re-subdividing any sub-cluster that still overshoots.
fn refine_into(
    points: &[Point],
    members: Vec<usize>,
    params: &ClusteringParams,
    out: &mut Vec<Cluster>,
) {
    if members.len() <= params.max_group_size {
        out.push(Cluster {
            id: 0,
            order_indices: members,
        });
        return;
    }

    let k = members.len().div_ceil(params.max_group_size);
    let sub_points: Vec<Point> = members.iter().map(|&i| points[i]).collect();
    let sub_labels = kmeans(&sub_points, k, params.random_state, params.n_init);

    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (local_idx, &label) in sub_labels.iter().enumerate() {
        groups[label.min(k - 1)].push(members[local_idx]);
    }

    for group in groups {
        if group.is_empty() {
            continue;
        }
        refine_into(points, group, params, out);
    }
}
