//! End-to-end route-planning scenarios, driven through the public `plan`
//! entry point (and, for the obstacle-penalty scenario, the group
//! sequencer directly against a small obstacle index).

use std::collections::HashMap;
use std::io::Write as _;

use lastmile_router::clustering::ClusteringParams;
use lastmile_router::config::{EndpointMode, Order, PipelineMode};
use lastmile_router::geometry::{Metric, Point};
use lastmile_router::group_sequencer::{sequence_groups, GroupStrategy};
use lastmile_router::intra_sequencer::IntraStrategy;
use lastmile_router::obstacles::{CostModel, ObstacleIndex, VerificationMode};
use lastmile_router::{plan, PlanRequest};

fn order(id: &str, lat: f64, lon: f64) -> Order {
    Order {
        tracking_id: id.to_string(),
        lat,
        lon,
    }
}

fn base_clustering() -> ClusteringParams {
    ClusteringParams {
        radius_km: 5.0,
        min_samples: 2,
        max_group_size: 50,
        metric: Metric::Euclidean,
        random_state: 42,
        n_init: 5,
    }
}

fn base_request(start: Point, orders: Vec<Order>, clustering: ClusteringParams) -> PlanRequest {
    PlanRequest {
        start,
        orders,
        endpoint_mode: None,
        max_orders_cap: 5000,
        clustering,
        pipeline: PipelineMode::Standard {
            group_order: GroupStrategy::Greedy,
            inner_order: IntraStrategy::NearestNeighbor,
        },
        verification: VerificationMode::None,
        oracle_endpoint: None,
        check_highways: false,
        group_penalty: 2.0,
        inner_penalty: 1.5,
        include_analysis: false,
    }
}

/// S1 - single cluster, no obstacles: 4 orders on a line, start to the
/// west. Expect one group "A" visited west-to-east, labels A-01..A-04.
#[test]
fn s1_single_cluster_no_obstacles() {
    let start = Point::new(0.0, -0.01);
    let orders = vec![
        order("D", 0.0, 0.03),
        order("B", 0.0, 0.01),
        order("A", 0.0, 0.0),
        order("C", 0.0, 0.02),
    ];
    let req = base_request(start, orders, base_clustering());
    let resp = plan(&req, None).unwrap();

    assert_eq!(resp.total_groups, 1);
    assert_eq!(resp.total_orders, 4);
    assert!(resp.orders.iter().all(|s| s.group_label == "A"));

    let lons: Vec<f64> = resp.orders.iter().map(|s| s.lon).collect();
    let mut ascending = lons.clone();
    ascending.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(lons, ascending, "nearest-neighbor from the west visits in ascending longitude order");

    for (i, stop) in resp.orders.iter().enumerate() {
        assert_eq!(stop.global_seq, i + 1);
        assert_eq!(stop.intra_seq, format!("A-{:02}", i + 1));
    }
}

/// S2 - two clear clusters, each of size 3; cluster nearer the start is
/// visited first and labeled "A", the other "B", with no interleaving.
#[test]
fn s2_two_clusters_visited_nearest_first() {
    let start = Point::new(0.0, -0.5);
    let orders = vec![
        order("O1", 0.0, 0.0),
        order("O2", 0.0, 0.001),
        order("O3", 0.0, 0.002),
        order("O4", 0.0, 1.0),
        order("O5", 0.0, 1.001),
        order("O6", 0.0, 1.002),
    ];
    let clustering = ClusteringParams {
        radius_km: 1.0,
        min_samples: 3,
        ..base_clustering()
    };
    let req = base_request(start, orders, clustering);
    let resp = plan(&req, None).unwrap();

    assert_eq!(resp.total_groups, 2);
    let group_a_count = resp.orders.iter().filter(|s| s.group_label == "A").count();
    let group_b_count = resp.orders.iter().filter(|s| s.group_label == "B").count();
    assert_eq!(group_a_count, 3);
    assert_eq!(group_b_count, 3);
    assert!(resp.orders.iter().take(3).all(|s| s.group_label == "A"), "A must run contiguously first");
    assert!(resp.orders.iter().skip(3).all(|s| s.group_label == "B"), "B must run contiguously second");
}

/// S3 - a far outlier is density-clustering noise; noise reassignment
/// merges it into the only non-noise cluster rather than leaving it
/// stranded with label -1.
#[test]
fn s3_noise_point_joins_nearest_cluster() {
    let start = Point::new(0.0, -0.01);
    let orders = vec![
        order("N1", 0.0, 0.0),
        order("N2", 0.0, 0.0001),
        order("N3", 0.0, 0.0002),
        order("N4", 0.0, 0.0003),
        order("FAR", 0.0, 5.0),
    ];
    let clustering = ClusteringParams {
        radius_km: 1.0,
        min_samples: 3,
        ..base_clustering()
    };
    let req = base_request(start, orders, clustering);
    let resp = plan(&req, None).unwrap();

    assert_eq!(resp.total_groups, 1, "the far outlier has no other neighbor to anchor its own cluster");
    assert_eq!(resp.total_orders, 5);
}

/// S4 - 50 orders over a small grid with max_group_size=10 must refine
/// into at least 5 clusters, each within the bound, and reproduce
/// byte-identical output across two runs with the same seed.
#[test]
fn s4_kmeans_refinement_bounds_size_and_is_reproducible() {
    let start = Point::new(-0.01, -0.01);
    let orders: Vec<Order> = (0..50)
        .map(|i| {
            let lat = (i % 10) as f64 * 0.005;
            let lon = (i / 10) as f64 * 0.01;
            order(&format!("ORD{i}"), lat, lon)
        })
        .collect();
    let clustering = ClusteringParams {
        radius_km: 5.0,
        min_samples: 2,
        max_group_size: 10,
        ..base_clustering()
    };
    let req = base_request(start, orders, clustering);

    let resp1 = plan(&req, None).unwrap();
    assert!(resp1.total_groups >= 5);

    let mut sizes: HashMap<String, usize> = HashMap::new();
    for stop in &resp1.orders {
        *sizes.entry(stop.group_label.clone()).or_insert(0) += 1;
    }
    assert!(sizes.values().all(|&c| c <= 10), "every final cluster must be within max_group_size");
    assert_eq!(sizes.values().sum::<usize>(), 50);

    let resp2 = plan(&req, None).unwrap();
    let seq1: Vec<&str> = resp1.orders.iter().map(|s| s.tracking_id.as_str()).collect();
    let seq2: Vec<&str> = resp2.orders.iter().map(|s| s.tracking_id.as_str()).collect();
    assert_eq!(seq1, seq2, "same seed must reproduce an identical partition and sequence");
}

/// S5 - endpoint_mode=farthest moves the order farthest from the start to
/// the tail and re-indexes global_seq.
#[test]
fn s5_endpoint_farthest_moved_to_tail() {
    let start = Point::new(0.0, -0.1);
    let orders = vec![order("NEAR", 0.0, 0.0), order("MID", 0.0, 0.1), order("FAR", 0.0, 0.5)];
    let mut req = base_request(start, orders, base_clustering());
    req.endpoint_mode = Some(EndpointMode::Farthest);
    let resp = plan(&req, None).unwrap();

    assert_eq!(resp.orders.last().unwrap().tracking_id, "FAR");
    for (i, stop) in resp.orders.iter().enumerate() {
        assert_eq!(stop.global_seq, i + 1);
    }
}

/// S5b - when the farthest order is NOT already last, moving it to the
/// tail must not leave its old group_label/intra_seq stale: the vacated
/// run stays contiguous and the farthest opens its own trailing run.
#[test]
fn s5b_farthest_not_already_last_relabels_cleanly() {
    // Laid out so the nearest-neighbor tour visits NEAR, then MIDDLE
    // (beeline-farthest from start), then LAST (tour-last but not
    // beeline-farthest) — exercising the case where the stop
    // endpoint_mode=farthest relocates is NOT already at the tail.
    let start = Point::new(0.0, 0.0);
    let orders = vec![
        order("NEAR", 0.0, 0.01),
        order("MIDDLE", 0.1, 0.01),
        order("LAST", 0.1, 0.0),
    ];
    let clustering = ClusteringParams {
        radius_km: 20.0,
        min_samples: 2,
        ..base_clustering()
    };
    let mut req = base_request(start, orders, clustering);
    req.endpoint_mode = Some(EndpointMode::Farthest);
    let resp = plan(&req, None).unwrap();

    assert_eq!(resp.total_groups, 1, "all three stops must land in a single cluster for this layout");
    assert_eq!(resp.orders.last().unwrap().tracking_id, "MIDDLE");

    for (i, stop) in resp.orders.iter().enumerate() {
        assert_eq!(stop.global_seq, i + 1);
    }

    // Labels must form contiguous runs, and every run's intra_seq must be
    // exactly "<label>-01..<label>-NN".
    let mut seen_labels: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < resp.orders.len() {
        let label = resp.orders[i].group_label.as_str();
        assert!(
            !seen_labels.contains(&label),
            "label {label} reappeared in a non-contiguous run"
        );
        seen_labels.push(label);
        let mut pos = 1;
        while i < resp.orders.len() && resp.orders[i].group_label == label {
            assert_eq!(resp.orders[i].intra_seq, format!("{label}-{pos:02}"));
            pos += 1;
            i += 1;
        }
    }
    assert_ne!(
        resp.orders.last().unwrap().group_label,
        resp.orders[resp.orders.len() - 2].group_label,
        "the relocated farthest stop must open its own trailing run"
    );
}

/// `verification = none` never populates crossings, even when an obstacle
/// index happens to be available — crossings are only reported once a
/// verification mode is actually in effect (§7).
#[test]
fn crossings_are_gated_on_verification_mode() {
    let dir = std::env::temp_dir().join("lastmile_router_scenario_gate");
    std::fs::create_dir_all(&dir).unwrap();
    let rivers_path = dir.join("rivers.json");
    let highways_path = dir.join("highways.json");
    let rivers_json = r#"{"elements":[
        {"type":"node","id":1,"lat":-10.0,"lon":0.15},
        {"type":"node","id":2,"lat":10.0,"lon":0.15},
        {"type":"way","id":100,"nodes":[1,2],"tags":{"waterway":"river"}}
    ]}"#;
    std::fs::File::create(&rivers_path).unwrap().write_all(rivers_json.as_bytes()).unwrap();
    std::fs::File::create(&highways_path).unwrap().write_all(b"{\"elements\":[]}").unwrap();
    let index = ObstacleIndex::load(&rivers_path, &highways_path).unwrap();

    let start = Point::new(0.0, 0.0);
    let orders = vec![order("A", 0.0, -0.3), order("B", 0.0, 0.3)];
    let req = base_request(start, orders, base_clustering());
    let resp = plan(&req, Some(&index)).unwrap();

    assert!(resp.crossings.is_empty(), "no verification mode means no crossings are reported");
}

/// `verification = api` without a configured oracle endpoint is rejected
/// rather than silently planning with no penalty applied (§7).
#[test]
fn api_verification_without_endpoint_is_rejected() {
    let start = Point::new(0.0, -0.1);
    let orders = vec![order("A", 0.0, 0.0), order("B", 0.0, 0.1)];
    let mut req = base_request(start, orders, base_clustering());
    req.verification = VerificationMode::Api;
    assert!(plan(&req, None).is_err());
}

/// `include_analysis` opts a response into per-cluster centroids and the
/// distribution analyzer's advisory report; by default neither is present.
#[test]
fn analysis_is_opt_in_and_matches_group_count() {
    let start = Point::new(0.0, -0.01);
    let orders = vec![
        order("A1", 0.0, 0.0),
        order("A2", 0.0, 0.01),
        order("A3", 0.0, 0.02),
        order("A4", 0.0, 0.03),
    ];
    let mut req = base_request(start, orders, base_clustering());

    let resp_default = plan(&req, None).unwrap();
    assert!(resp_default.analysis.is_none());
    assert!(resp_default.group_centroids.is_empty());

    req.include_analysis = true;
    let resp_with_analysis = plan(&req, None).unwrap();
    assert!(resp_with_analysis.analysis.is_some());
    assert_eq!(resp_with_analysis.group_centroids.len(), resp_with_analysis.total_groups);
}

/// S6 - with geometry verification on, the group sequencer must prefer an
/// equally-distant centroid on the same side of a river over one across it,
/// and the cost model's crossing verdicts must match the actual geometry.
#[test]
fn s6_group_sequencer_prefers_same_side_of_river() {
    let dir = std::env::temp_dir().join("lastmile_router_scenario_s6");
    std::fs::create_dir_all(&dir).unwrap();
    let rivers_path = dir.join("rivers.json");
    let highways_path = dir.join("highways.json");

    // A north-south river at longitude 0.15, spanning well past the test
    // geometry's latitude range.
    let rivers_json = r#"{"elements":[
        {"type":"node","id":1,"lat":-10.0,"lon":0.15},
        {"type":"node","id":2,"lat":10.0,"lon":0.15},
        {"type":"way","id":100,"nodes":[1,2],"tags":{"waterway":"river"}}
    ]}"#;
    std::fs::File::create(&rivers_path).unwrap().write_all(rivers_json.as_bytes()).unwrap();
    std::fs::File::create(&highways_path).unwrap().write_all(b"{\"elements\":[]}").unwrap();

    let index = ObstacleIndex::load(&rivers_path, &highways_path).unwrap();
    assert_eq!(index.polyline_count(), 1);

    let start = Point::new(0.0, 0.0);
    // Equally distant from start (0.3 degrees), one on each side of the
    // river at lon=0.15.
    let near_side = Point::new(0.0, -0.3);
    let far_side = Point::new(0.0, 0.3);
    let centroids = vec![near_side, far_side];
    let order_counts = vec![1, 1];

    let cost = CostModel {
        mode: VerificationMode::Geometry,
        index: Some(&index),
        oracle: None,
        check_highways: false,
        group_penalty: 2.0,
        inner_penalty: 1.5,
    };

    assert!(!cost.crosses(start, near_side).unwrap(), "start -> near_side must not cross the river");
    assert!(cost.crosses(start, far_side).unwrap(), "start -> far_side must cross the river");

    let visit_order = sequence_groups(start, &centroids, &order_counts, GroupStrategy::Greedy, &cost);
    assert_eq!(
        visit_order[0], 0,
        "greedy group ordering must prefer the penalty-free same-side centroid over an equally-distant \
         crossing one"
    );
}
