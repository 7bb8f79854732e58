//! Group sequencer (C5): orders cluster centroids into a single driver tour.

use crate::geometry::Point;
use crate::obstacles::CostModel;

/// Selectable group-ordering strategy (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStrategy {
    Greedy,
    Sweep,
    TwoOpt,
}

const MAX_TWO_OPT_ITERATIONS: usize = 100;

/// Orders `centroids` (one per cluster, `order_counts[i]` orders in cluster
/// `i`) into a permutation starting adjacent to `start`, per the selected
/// strategy, and returns the chosen cluster indices in visiting order.
pub fn sequence_groups(
    start: Point,
    centroids: &[Point],
    order_counts: &[usize],
    strategy: GroupStrategy,
    cost: &CostModel,
) -> Vec<usize> {
    if centroids.is_empty() {
        return Vec::new();
    }
    match strategy {
        GroupStrategy::Greedy => greedy_order(start, centroids, cost),
        GroupStrategy::Sweep => sweep_order(start, centroids, order_counts),
        GroupStrategy::TwoOpt => {
            let seed = greedy_order(start, centroids, cost);
            two_opt_improve(start, centroids, seed)
        }
    }
}

/// Labels a visiting-order permutation `A, B, …, Z, Z1, Z2, …` (§4.5).
pub fn label_groups(order: &[usize]) -> Vec<String> {
    order.iter().enumerate().map(|(i, _)| group_label(i)).collect()
}

/// The single label assigned to visiting-order position `index` (§4.5).
pub fn group_label(index: usize) -> String {
    const ALPHABET_LEN: usize = 26;
    if index < ALPHABET_LEN {
        ((b'A' + index as u8) as char).to_string()
    } else {
        format!("Z{}", index - ALPHABET_LEN + 1)
    }
}

fn greedy_order(start: Point, centroids: &[Point], cost: &CostModel) -> Vec<usize> {
    let n = centroids.len();
    let mut visited = vec![false; n];
    let mut current = start;
    let mut order = Vec::with_capacity(n);

    for _ in 0..n {
        let next = (0..n)
            .filter(|&i| !visited[i])
            .min_by(|&a, &b| {
                let ca = cost.cost(current, centroids[a], crate::obstacles::PenaltyRole::Group);
                let cb = cost.cost(current, centroids[b], crate::obstacles::PenaltyRole::Group);
                ca.partial_cmp(&cb).unwrap()
            })
            .expect("at least one unvisited centroid remains");
        visited[next] = true;
        current = centroids[next];
        order.push(next);
    }
    order
}

fn sweep_order(start: Point, centroids: &[Point], order_counts: &[usize]) -> Vec<usize> {
    let n = centroids.len();
    if n == 1 {
        return vec![0];
    }

    let anchor = (0..n)
        .min_by(|&a, &b| {
            start
                .euclidean(&centroids[a])
                .partial_cmp(&start.euclidean(&centroids[b]))
                .unwrap()
        })
        .unwrap();

    let base = (
        centroids[anchor].lon - start.lon,
        centroids[anchor].lat - start.lat,
    );

    let mut right_count = 0usize;
    let mut left_count = 0usize;
    for i in 0..n {
        if i == anchor {
            continue;
        }
        let v = (centroids[i].lon - start.lon, centroids[i].lat - start.lat);
        let cross = base.0 * v.1 - base.1 * v.0;
        if cross < 0.0 {
            right_count += order_counts.get(i).copied().unwrap_or(0);
        } else {
            left_count += order_counts.get(i).copied().unwrap_or(0);
        }
    }
    let clockwise = right_count >= left_count;

    let base_angle = base.1.atan2(base.0);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| {
        angle_from_anchor(start, centroids[a], base_angle, clockwise)
            .partial_cmp(&angle_from_anchor(start, centroids[b], base_angle, clockwise))
            .unwrap()
    });
    indices
}

fn angle_from_anchor(start: Point, p: Point, base_angle: f64, clockwise: bool) -> f64 {
    let v = (p.lon - start.lon, p.lat - start.lat);
    let angle = v.1.atan2(v.0);
    let mut delta = if clockwise {
        base_angle - angle
    } else {
        angle - base_angle
    };
    let two_pi = std::f64::consts::TAU;
    delta = ((delta % two_pi) + two_pi) % two_pi;
    delta
}

fn two_opt_improve(start: Point, centroids: &[Point], mut order: Vec<usize>) -> Vec<usize> {
    let n = order.len();
    if n < 3 {
        return order;
    }

    for _ in 0..MAX_TWO_OPT_ITERATIONS {
        let mut improved = false;
        for i in 0..n - 1 {
            for j in (i + 2)..n {
                let before = open_tour_cost(start, centroids, &order);
                order[i..=j].reverse();
                let after = open_tour_cost(start, centroids, &order);
                if after < before - 1e-12 {
                    improved = true;
                } else {
                    order[i..=j].reverse();
                }
            }
        }
        if !improved {
            break;
        }
    }
    order
}

fn open_tour_cost(start: Point, centroids: &[Point], order: &[usize]) -> f64 {
    let mut total = start.euclidean(&centroids[order[0]]);
    for w in order.windows(2) {
        total += centroids[w[0]].euclidean(&centroids[w[1]]);
    }
    total
}
