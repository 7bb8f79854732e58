//! Top-level plan orchestrator: validates a request, runs the selected
//! pipeline (standard C4→C5→C6, or smart C7), and assembles the final
//! `PlanResponse` (§3, §6).

use crate::analyzer;
use crate::clustering::{cluster as hybrid_cluster, Cluster};
use crate::config::{
    CrossingRecord, EndpointMode, GroupCentroid, Order, PipelineMode, PlanRequest, PlanResponse, PlannedStop,
};
use crate::config::intra_seq_label;
use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::group_sequencer::{group_label, label_groups, sequence_groups};
use crate::intra_sequencer::sequence_intra;
use crate::obstacles::{CachedOracle, CostModel, CrossingOracle, ObstacleIndex, ValhallaOracle, VerificationMode};
use crate::smart::planner::{smart_plan, GroupOrderingMode, SmartPlanParams};

const MIN_ABS_COORD: f64 = 0.001;

/// Validates a request against §3's admission rules. Rejects immediately
/// (§7 `InputValidation`) rather than planning a partial set.
fn validate(req: &PlanRequest) -> Result<()> {
    if req.orders.is_empty() {
        return Err(Error::InputValidation("orders must not be empty".into()));
    }
    if req.orders.len() > req.max_orders_cap {
        log::warn!(
            "request has {} orders, exceeding max_orders_cap {}; truncating",
            req.orders.len(),
            req.max_orders_cap
        );
    }
    for order in &req.orders {
        validate_point(order.lat, order.lon, &order.tracking_id)?;
    }
    validate_point(req.start.lat, req.start.lon, "start")?;
    Ok(())
}

fn validate_point(lat: f64, lon: f64, label: &str) -> Result<()> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(Error::InputValidation(format!("{label}: latitude {lat} out of range")));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(Error::InputValidation(format!("{label}: longitude {lon} out of range")));
    }
    if lat.abs() <= MIN_ABS_COORD && lon.abs() <= MIN_ABS_COORD {
        return Err(Error::InputValidation(format!(
            "{label}: coordinates too close to the origin to be a real location"
        )));
    }
    Ok(())
}

/// Plans a full route for `req`, optionally consulting a process-wide
/// obstacle index (required when `req.verification == Geometry`).
pub fn plan(req: &PlanRequest, obstacle_index: Option<&ObstacleIndex>) -> Result<PlanResponse> {
    validate(req)?;

    let mut orders = req.orders.clone();
    orders.truncate(req.max_orders_cap);

    let points: Vec<Point> = orders.iter().map(Order::point).collect();

    if req.verification == VerificationMode::Geometry && obstacle_index.is_none() {
        return Err(Error::Internal(
            "geometry verification requested but no obstacle index was supplied".into(),
        ));
    }

    let oracle: Option<CachedOracle<ValhallaOracle>> = match req.verification {
        VerificationMode::Api => {
            let endpoint = req.oracle_endpoint.as_ref().ok_or_else(|| {
                Error::InputValidation("api verification requested but no oracle_endpoint was configured".into())
            })?;
            let url = url::Url::parse(endpoint)
                .map_err(|e| Error::InputValidation(format!("invalid oracle_endpoint: {e}")))?;
            Some(CachedOracle::new(ValhallaOracle::new(url)))
        }
        VerificationMode::None | VerificationMode::Geometry => None,
    };

    let cost = CostModel {
        mode: req.verification,
        index: obstacle_index,
        oracle: oracle.as_ref().map(|o| o as &dyn CrossingOracle),
        check_highways: req.check_highways,
        group_penalty: req.group_penalty,
        inner_penalty: req.inner_penalty,
    };

    let (ordered_clusters, ordered_local_sequences) = match &req.pipeline {
        PipelineMode::Standard { group_order, inner_order } => {
            let clusters = hybrid_cluster(&points, &req.clustering);
            run_standard_pipeline(&points, req.start, &clusters, *group_order, *inner_order, &cost)
        }
        PipelineMode::Smart {
            strict_group_order,
            next_group_linkage,
            directional_constraint,
        } => {
            let smart_params = SmartPlanParams {
                kadaptive: crate::smart::kadaptive::KAdaptiveParams {
                    max_group_size: req.clustering.max_group_size,
                    initial_radius_km: req.clustering.radius_km,
                    random_state: req.clustering.random_state,
                    n_init: req.clustering.n_init,
                    ..Default::default()
                },
                group_ordering: if *strict_group_order {
                    GroupOrderingMode::Strict
                } else {
                    GroupOrderingMode::Optimized
                },
                linkage: next_group_linkage.clone(),
                directional_constraint: *directional_constraint,
            };
            let groups = smart_plan(&points, req.start, &smart_params, &cost);
            let clusters: Vec<Cluster> = groups.iter().map(|g| g.cluster.clone()).collect();
            let local_sequences: Vec<Vec<usize>> = groups.iter().map(|g| g.order.clone()).collect();
            (clusters, local_sequences)
        }
    };

    let labels = label_groups(&(0..ordered_clusters.len()).collect::<Vec<_>>());

    let group_centroids: Vec<GroupCentroid> = ordered_clusters
        .iter()
        .zip(labels.iter())
        .map(|(cluster, label)| {
            let centroid = cluster.centroid(&points);
            GroupCentroid {
                group_label: label.clone(),
                lat: centroid.lat,
                lon: centroid.lon,
            }
        })
        .collect();

    let mut stops = Vec::new();
    let mut crossings = Vec::new();
    let mut global_seq = 0usize;
    let mut current = req.start;
    let mut previous_tracking: Option<String> = None;

    for (cluster_pos, (cluster, local_order)) in ordered_clusters.iter().zip(ordered_local_sequences.iter()).enumerate() {
        let label = &labels[cluster_pos];
        for (pos, &local_idx) in local_order.iter().enumerate() {
            let global_idx = cluster.order_indices[local_idx];
            let order = &orders[global_idx];
            global_seq += 1;

            if let Some(prev_tracking) = &previous_tracking {
                match req.verification {
                    VerificationMode::None => {}
                    VerificationMode::Geometry => {
                        if let Some(idx) = obstacle_index {
                            let crosses = idx.query(current, order.point(), req.check_highways);
                            if crosses.crosses_any() {
                                crossings.push(CrossingRecord {
                                    from_tracking: prev_tracking.clone(),
                                    to_tracking: order.tracking_id.clone(),
                                    crosses_river: crosses.crosses_river,
                                    crosses_highway: crosses.crosses_highway,
                                    method: "geometry".to_string(),
                                });
                            }
                        }
                    }
                    VerificationMode::Api => {
                        if let Some(o) = &oracle {
                            if let Some(true) = o.check_crossing(current, order.point()) {
                                crossings.push(CrossingRecord {
                                    from_tracking: prev_tracking.clone(),
                                    to_tracking: order.tracking_id.clone(),
                                    crosses_river: true,
                                    crosses_highway: false,
                                    method: "api".to_string(),
                                });
                            }
                        }
                    }
                }
            }

            stops.push(PlannedStop {
                global_seq,
                group_label: label.clone(),
                intra_seq: intra_seq_label(label, pos + 1),
                tracking_id: order.tracking_id.clone(),
                lat: order.lat,
                lon: order.lon,
            });
            current = order.point();
            previous_tracking = Some(order.tracking_id.clone());
        }
    }

    apply_endpoint_mode(req, &mut stops, &points_by_tracking(&orders));

    let total_groups = ordered_clusters.len();
    let analysis = req.include_analysis.then(|| analyzer::analyze(&points));
    Ok(PlanResponse {
        total_orders: stops.iter().filter(|s| s.tracking_id != "ENDPOINT").count(),
        total_groups,
        crossings,
        verification_method: req.verification,
        orders: stops,
        group_centroids: if req.include_analysis { group_centroids } else { Vec::new() },
        analysis,
    })
}

fn points_by_tracking(orders: &[Order]) -> std::collections::HashMap<String, Point> {
    orders.iter().map(|o| (o.tracking_id.clone(), o.point())).collect()
}

/// Re-indexes `global_seq`/`intra_seq` after the endpoint mode reshuffles
/// the tail of the plan (§6 "Endpoint modes").
fn apply_endpoint_mode(
    req: &PlanRequest,
    stops: &mut Vec<PlannedStop>,
    coords_by_tracking: &std::collections::HashMap<String, Point>,
) {
    match &req.endpoint_mode {
        None | Some(EndpointMode::LastOrder) => {}
        Some(EndpointMode::Manual { lat, lon }) => {
            stops.push(PlannedStop::endpoint(
                stops.len() + 1,
                "End",
                &intra_seq_label("End", 1),
                *lat,
                *lon,
            ));
        }
        Some(EndpointMode::Farthest) => {
            let farthest_idx = stops
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| {
                    let da = coords_by_tracking
                        .get(&a.tracking_id)
                        .map(|p| req.start.euclidean(p))
                        .unwrap_or(0.0);
                    let db = coords_by_tracking
                        .get(&b.tracking_id)
                        .map(|p| req.start.euclidean(p))
                        .unwrap_or(0.0);
                    da.partial_cmp(&db).unwrap()
                })
                .map(|(i, _)| i);

            if let Some(idx) = farthest_idx {
                let mut farthest = stops.remove(idx);
                // If members of the farthest stop's original label run
                // remain behind, its old label is now non-contiguous once
                // appended at the tail; mint a fresh trailing label so
                // every run stays a single contiguous block of one label.
                if stops.iter().any(|s| s.group_label == farthest.group_label) {
                    let used: std::collections::HashSet<&str> =
                        stops.iter().map(|s| s.group_label.as_str()).collect();
                    let mut next = 0usize;
                    loop {
                        let candidate = group_label(next);
                        if !used.contains(candidate.as_str()) {
                            farthest.group_label = candidate;
                            break;
                        }
                        next += 1;
                    }
                }
                stops.push(farthest);
            }
        }
    }

    renumber_sequence(stops);
}

/// Re-derives `global_seq` across the whole plan and `intra_seq` within
/// each contiguous `group_label` run, restoring invariants 3/4 after any
/// endpoint-mode reshuffle.
fn renumber_sequence(stops: &mut [PlannedStop]) {
    for (i, stop) in stops.iter_mut().enumerate() {
        stop.global_seq = i + 1;
    }

    let mut i = 0;
    while i < stops.len() {
        let mut j = i;
        while j + 1 < stops.len() && stops[j + 1].group_label == stops[i].group_label {
            j += 1;
        }
        for (pos, k) in (i..=j).enumerate() {
            let label = stops[k].group_label.clone();
            stops[k].intra_seq = intra_seq_label(&label, pos + 1);
        }
        i = j + 1;
    }
}

/// C4→C5→C6: hybrid-cluster, order the clusters, then sequence orders
/// within each cluster, chaining the driver's current position forward.
fn run_standard_pipeline(
    points: &[Point],
    start: Point,
    clusters: &[Cluster],
    group_order: crate::group_sequencer::GroupStrategy,
    inner_order: crate::intra_sequencer::IntraStrategy,
    cost: &CostModel,
) -> (Vec<Cluster>, Vec<Vec<usize>>) {
    let centroids: Vec<Point> = clusters.iter().map(|c| c.centroid(points)).collect();
    let order_counts: Vec<usize> = clusters.iter().map(|c| c.order_indices.len()).collect();
    let group_visit_order = sequence_groups(start, &centroids, &order_counts, group_order, cost);

    let mut ordered_clusters = Vec::with_capacity(clusters.len());
    let mut local_sequences = Vec::with_capacity(clusters.len());
    let mut current = start;

    for &cluster_idx in &group_visit_order {
        let cluster = clusters[cluster_idx].clone();
        let cluster_points: Vec<Point> = cluster.order_indices.iter().map(|&i| points[i]).collect();
        let local_order = sequence_intra(&cluster_points, current, None, inner_order, cost);
        current = cluster_points[*local_order.last().unwrap()];
        ordered_clusters.push(cluster);
        local_sequences.push(local_order);
    }

    (ordered_clusters, local_sequences)
}
