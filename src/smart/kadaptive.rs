//! K-adaptive clustering (§4.7): retries K-means with an increasing k and
//! shrinking radius until every cluster is strictly below `max_group_size`.

use crate::clustering::kmeans::kmeans;
use crate::geometry::Point;

const MAX_ITERATIONS: usize = 20;
const RADIUS_SHRINK_FACTOR: f64 = 0.85;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct KAdaptiveParams {
    pub max_group_size: usize,
    pub initial_radius_km: f64,
    pub min_radius_km: f64,
    pub random_state: u64,
    pub n_init: usize,
}

impl Default for KAdaptiveParams {
    fn default() -> Self {
        KAdaptiveParams {
            max_group_size: 30,
            initial_radius_km: 1.0,
            min_radius_km: 0.1,
            random_state: 42,
            n_init: 10,
        }
    }
}

/// Runs the K-adaptive loop and returns the final per-point cluster labels
/// (0..k), re-derived from the winning iteration's own labeling rather than
/// any loop-local running state — this avoids leaking a stale label set if
/// the iteration cap is hit before convergence.
pub fn kadaptive_cluster(points: &[Point], params: &KAdaptiveParams) -> Vec<usize> {
    if points.is_empty() {
        return Vec::new();
    }
    if points.len() <= params.max_group_size {
        return vec![0; points.len()];
    }

    let mut k = points.len().div_ceil(params.max_group_size).max(1);
    let mut radius_km = params.initial_radius_km;
    let mut last_labels = vec![0usize; points.len()];

    for iteration in 0..MAX_ITERATIONS {
        let labels = kmeans(points, k, params.random_state, params.n_init);
        last_labels = labels.clone();

        let largest = cluster_sizes(&labels, k).into_iter().max().unwrap_or(0);
        if largest < params.max_group_size {
            return labels;
        }

        log::debug!(
            "k-adaptive iteration {iteration}: k={k} largest={largest} still >= {}",
            params.max_group_size
        );
        radius_km = (radius_km * RADIUS_SHRINK_FACTOR).max(params.min_radius_km);
        k += 1;
    }

    log::warn!(
        "k-adaptive clustering hit the {MAX_ITERATIONS}-iteration cap at radius {radius_km:.4}km; \
         using the last labeling even though it may still exceed max_group_size"
    );
    last_labels
}

fn cluster_sizes(labels: &[usize], k: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; k];
    for &label in labels {
        if label < k {
            sizes[label] += 1;
        }
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_input_is_a_single_cluster() {
        let points: Vec<Point> = (0..5).map(|i| Point::new(i as f64 * 0.001, 0.0)).collect();
        let params = KAdaptiveParams {
            max_group_size: 30,
            ..KAdaptiveParams::default()
        };
        let labels = kadaptive_cluster(&points, &params);
        assert!(labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn large_input_is_bounded_per_cluster() {
        let points: Vec<Point> = (0..120)
            .map(|i| Point::new((i % 12) as f64 * 0.002, (i / 12) as f64 * 0.002))
            .collect();
        let params = KAdaptiveParams {
            max_group_size: 15,
            ..KAdaptiveParams::default()
        };
        let labels = kadaptive_cluster(&points, &params);
        let k = labels.iter().copied().max().unwrap_or(0) + 1;
        let sizes = cluster_sizes(&labels, k);
        assert!(sizes.iter().all(|&s| s < params.max_group_size || s == 0));
    }
}
