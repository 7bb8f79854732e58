//! Phase 1 (density clustering) and Phase 2 (noise reassignment) of the
//! hybrid clustering pipeline (C4, §4.4).

use crate::geometry::{Metric, Point};

/// Sentinel label for a noise point, matching DBSCAN/sklearn convention.
pub const NOISE: i32 = -1;

/// Density-based clustering (DBSCAN). `eps` is in the metric's native unit
/// (already converted by the caller via `Metric::radius_to_epsilon`).
/// Returns one label per point; `NOISE` (-1) for points not reachable from
/// any core point.
pub fn dbscan(points: &[Point], eps: f64, min_samples: usize, metric: Metric) -> Vec<i32> {
    let n = points.len();
    let mut labels = vec![NOISE; n];
    let mut visited = vec![false; n];
    let mut next_cluster = 0;

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let mut neighbors = region_query(points, i, eps, metric);
        if neighbors.len() < min_samples {
            // Left as NOISE; may later be absorbed into a neighboring
            // cluster's border-point expansion.
            continue;
        }

        labels[i] = next_cluster;
        let mut seed_set = neighbors.clone();
        let mut cursor = 0;
        while cursor < seed_set.len() {
            let j = seed_set[cursor];
            cursor += 1;

            if !visited[j] {
                visited[j] = true;
                neighbors = region_query(points, j, eps, metric);
                if neighbors.len() >= min_samples {
                    for &nb in &neighbors {
                        if !seed_set.contains(&nb) {
                            seed_set.push(nb);
                        }
                    }
                }
            }
            if labels[j] == NOISE {
                labels[j] = next_cluster;
            }
        }
        next_cluster += 1;
    }

    labels
}

fn region_query(points: &[Point], i: usize, eps: f64, metric: Metric) -> Vec<usize> {
    let origin = points[i];
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| origin.distance(p, metric) <= eps)
        .map(|(j, _)| j)
        .collect()
}

/// Phase 2: reassign every noise point to the label of its nearest
/// non-noise neighbor (by the plan's metric). If no non-noise label
/// exists at all, every point collapses into a single cluster `0`.
pub fn reassign_noise(points: &[Point], labels: &mut [i32], metric: Metric) {
    let has_any_cluster = labels.iter().any(|&l| l != NOISE);
    if !has_any_cluster {
        labels.iter_mut().for_each(|l| *l = 0);
        return;
    }

    let noise_indices: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, &l)| l == NOISE)
        .map(|(i, _)| i)
        .collect();

    for i in noise_indices {
        let mut best_label = None;
        let mut best_dist = f64::INFINITY;
        for (j, &label) in labels.iter().enumerate() {
            if label == NOISE || j == i {
                continue;
            }
            let d = points[i].distance(&points[j], metric);
            if d < best_dist {
                best_dist = d;
                best_label = Some(label);
            }
        }
        // `has_any_cluster` guarantees a non-noise label exists.
        labels[i] = best_label.expect("a non-noise label must exist");
    }
}
