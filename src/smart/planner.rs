//! Smart planner orchestrator (§4.7): ties K-adaptive clustering, group
//! ordering, entry-point chaining, and directional open 2-opt together into
//! a single alternative pipeline to the standard C4→C5→C6 flow.

use crate::clustering::Cluster;
use crate::geometry::Point;
use crate::group_sequencer::{sequence_groups, GroupStrategy};
use crate::obstacles::CostModel;
use crate::smart::kadaptive::{kadaptive_cluster, KAdaptiveParams};
use crate::smart::open2opt::{directional_two_opt, LinkageMode, Target};

/// Group-ordering mode for the smart pipeline (§4.7 "Group ordering").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOrderingMode {
    Strict,
    Optimized,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SmartPlanParams {
    pub kadaptive: KAdaptiveParams,
    pub group_ordering: GroupOrderingMode,
    pub linkage: LinkageMode,
    /// Whether the directional open-2-opt objective is active. Off by
    /// default (§6).
    pub directional_constraint: bool,
}

impl Default for SmartPlanParams {
    fn default() -> Self {
        SmartPlanParams {
            kadaptive: KAdaptiveParams::default(),
            group_ordering: GroupOrderingMode::Strict,
            linkage: LinkageMode::None,
            directional_constraint: false,
        }
    }
}

/// One planned cluster in smart-pipeline visiting order, with its entry
/// point and final intra-cluster sequence already resolved.
#[derive(Debug, Clone)]
pub struct SmartGroup {
    pub cluster: Cluster,
    pub entry_local_idx: usize,
    pub order: Vec<usize>,
}

/// Runs the full smart pipeline over `points` (one per order) starting at
/// `start`, returning clusters in visiting order with their final
/// intra-cluster order already resolved (local indices into each cluster's
/// `order_indices`, §4.7 "Entry-point chain" / "Directional-constrained open
/// 2-opt").
pub fn smart_plan(points: &[Point], start: Point, params: &SmartPlanParams, cost: &CostModel) -> Vec<SmartGroup> {
    if points.is_empty() {
        return Vec::new();
    }

    let labels = kadaptive_cluster(points, &params.kadaptive);
    let k = labels.iter().copied().max().unwrap_or(0) + 1;
    let mut by_label: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (idx, &label) in labels.iter().enumerate() {
        by_label[label].push(idx);
    }

    let clusters: Vec<Cluster> = by_label
        .into_iter()
        .enumerate()
        .filter(|(_, members)| !members.is_empty())
        .map(|(id, members)| Cluster {
            id,
            order_indices: members,
        })
        .collect();

    let centroids: Vec<Point> = clusters.iter().map(|c| c.centroid(points)).collect();
    let order_counts: Vec<usize> = clusters.iter().map(|c| c.order_indices.len()).collect();

    let group_order = match params.group_ordering {
        GroupOrderingMode::Strict => {
            let mut indices: Vec<usize> = (0..clusters.len()).collect();
            indices.sort_by(|&a, &b| {
                start
                    .euclidean(&centroids[a])
                    .partial_cmp(&start.euclidean(&centroids[b]))
                    .unwrap()
            });
            indices
        }
        GroupOrderingMode::Optimized => {
            sequence_groups(start, &centroids, &order_counts, GroupStrategy::TwoOpt, cost)
        }
    };

    let mut result = Vec::with_capacity(clusters.len());
    let mut current = start;
    let mut previous_centroid: Option<Point> = None;

    for (pos, &cluster_idx) in group_order.iter().enumerate() {
        let cluster = clusters[cluster_idx].clone();
        let cluster_points: Vec<Point> = cluster.order_indices.iter().map(|&i| points[i]).collect();

        // Entry-point chain (§4.7): nearest order to the driver start for
        // the first cluster, nearest order to the previous cluster's
        // centroid for every subsequent one.
        let anchor = previous_centroid.unwrap_or(current);
        let entry_local_idx = cluster_points
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| anchor.euclidean(a).partial_cmp(&anchor.euclidean(b)).unwrap())
            .map(|(i, _)| i)
            .expect("cluster is non-empty");

        let mut seed_order: Vec<usize> = (0..cluster_points.len()).collect();
        seed_order.remove(entry_local_idx);
        seed_order.insert(0, entry_local_idx);

        let next_cluster_idx = group_order.get(pos + 1).copied();
        let target = match next_cluster_idx {
            Some(next_idx) => Target::Point(centroids[next_idx]),
            None => Target::None,
        };

        let final_order = directional_two_opt(
            &cluster_points,
            current,
            seed_order,
            target,
            params.linkage,
            params.directional_constraint,
        );

        current = cluster_points[*final_order.last().unwrap()];
        previous_centroid = Some(centroids[cluster_idx]);

        result.push(SmartGroup {
            cluster,
            entry_local_idx,
            order: final_order,
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_order_is_visited_exactly_once() {
        let start = Point::new(0.0, 0.0);
        let points: Vec<Point> = (0..40)
            .map(|i| Point::new((i % 8) as f64 * 0.01, (i / 8) as f64 * 0.01))
            .collect();
        let params = SmartPlanParams {
            kadaptive: KAdaptiveParams {
                max_group_size: 10,
                ..KAdaptiveParams::default()
            },
            ..SmartPlanParams::default()
        };
        let cost = CostModel::disabled();
        let groups = smart_plan(&points, start, &params, &cost);

        let mut seen = vec![false; points.len()];
        for g in &groups {
            assert_eq!(g.order.len(), g.cluster.order_indices.len());
            for &local in &g.order {
                let global = g.cluster.order_indices[local];
                assert!(!seen[global], "order {global} visited twice");
                seen[global] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn entry_point_chains_to_previous_centroid() {
        let start = Point::new(0.0, 0.0);
        let points = vec![
            Point::new(0.0, 0.1),
            Point::new(0.0, 0.11),
            Point::new(5.0, 5.0),
            Point::new(5.0, 5.01),
        ];
        let params = SmartPlanParams {
            kadaptive: KAdaptiveParams {
                max_group_size: 1,
                ..KAdaptiveParams::default()
            },
            group_ordering: GroupOrderingMode::Strict,
            ..SmartPlanParams::default()
        };
        let cost = CostModel::disabled();
        let groups = smart_plan(&points, start, &params, &cost);
        assert!(!groups.is_empty());
    }
}
