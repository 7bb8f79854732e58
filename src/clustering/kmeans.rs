//! Phase 3: K-means size refinement (C4, §4.4).
//!
//! Mirrors scikit-learn's `KMeans(n_clusters=k, random_state=..., n_init=...)`
//! semantics closely enough to be reproducible given the same seed: k-means++
//! seeding, Lloyd iteration to convergence, best-of-`n_init` by inertia.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::geometry::Point;

const MAX_LLOYD_ITERATIONS: usize = 300;

/// Runs K-means with a fixed `random_state` and `n_init` restarts, returning
/// the best-inertia label assignment (0..k). Deterministic for a fixed
/// input/seed pair (§5 ordering guarantees, §8 invariant 8).
pub fn kmeans(points: &[Point], k: usize, random_state: u64, n_init: usize) -> Vec<usize> {
    assert!(k >= 1);
    if points.len() <= k {
        // Degenerate: one point per cluster (and then some left unassigned
        // clusters, which is fine — callers only care about point labels).
        return (0..points.len()).collect();
    }

    let mut best_labels = Vec::new();
    let mut best_inertia = f64::INFINITY;

    for restart in 0..n_init.max(1) {
        let seed = random_state.wrapping_add(restart as u64 * 0x9E3779B9);
        let mut rng = StdRng::seed_from_u64(seed);
        let centers = kmeans_plus_plus_init(points, k, &mut rng);
        let (labels, inertia) = lloyd(points, centers);
        if inertia < best_inertia {
            best_inertia = inertia;
            best_labels = labels;
        }
    }

    best_labels
}

fn kmeans_plus_plus_init(points: &[Point], k: usize, rng: &mut StdRng) -> Vec<Point> {
    use rand::Rng;
    let mut centers = Vec::with_capacity(k);
    let first = points[rng.gen_range(0..points.len())];
    centers.push(first);

    while centers.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| {
                centers
                    .iter()
                    .map(|c| p.euclidean(c).powi(2))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();

        if weights.iter().all(|&w| w == 0.0) {
            // All remaining points coincide with an existing center.
            centers.push(points[rng.gen_range(0..points.len())]);
            continue;
        }

        let dist = WeightedIndex::new(&weights).expect("at least one positive weight");
        centers.push(points[dist.sample(rng)]);
    }
    centers
}

fn lloyd(points: &[Point], mut centers: Vec<Point>) -> (Vec<usize>, f64) {
    let k = centers.len();
    let mut labels = vec![0usize; points.len()];

    for _ in 0..MAX_LLOYD_ITERATIONS {
        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let (best_k, _) = centers
                .iter()
                .enumerate()
                .map(|(ci, c)| (ci, p.euclidean(c)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
                .unwrap();
            if labels[i] != best_k {
                labels[i] = best_k;
                changed = true;
            }
        }

        let mut sums = vec![(0.0, 0.0, 0usize); k];
        for (i, p) in points.iter().enumerate() {
            let c = &mut sums[labels[i]];
            c.0 += p.lat;
            c.1 += p.lon;
            c.2 += 1;
        }
        for (ci, (sum_lat, sum_lon, count)) in sums.into_iter().enumerate() {
            if count > 0 {
                centers[ci] = Point::new(sum_lat / count as f64, sum_lon / count as f64);
            }
        }

        if !changed {
            break;
        }
    }

    let inertia = points
        .iter()
        .enumerate()
        .map(|(i, p)| p.euclidean(&centers[labels[i]]).powi(2))
        .sum();

    (labels, inertia)
}
