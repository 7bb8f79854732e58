//! Wire types for the planning request/response (§3, §6), with
//! `#[serde(deny_unknown_fields)]` on request-shaped types so a caller
//! typo'ing a field surfaces as a rejected request rather than a silently
//! ignored one.

use serde::{Deserialize, Serialize};

use crate::analyzer::DistributionReport;
use crate::clustering::ClusteringParams;
use crate::geometry::Point;
use crate::group_sequencer::GroupStrategy;
use crate::intra_sequencer::IntraStrategy;
use crate::obstacles::VerificationMode;
use crate::smart::open2opt::LinkageMode;

/// A single delivery order (§3). Immutable once admitted; coordinates must
/// satisfy the range and non-origin checks enforced at request validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Order {
    pub tracking_id: String,
    pub lat: f64,
    pub lon: f64,
}

impl Order {
    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lon)
    }
}

/// How the plan's final stop is chosen (§6 "Endpoint modes").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum EndpointMode {
    LastOrder,
    Manual { lat: f64, lon: f64 },
    Farthest,
}

/// Whether the smart (§4.7) or standard (§4.4-4.6) pipeline is used, and
/// the smart-only extras (§6 "smart extras").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "pipeline")]
pub enum PipelineMode {
    Standard {
        group_order: GroupStrategy,
        inner_order: IntraStrategy,
    },
    Smart {
        strict_group_order: bool,
        next_group_linkage: LinkageMode,
        /// Whether the directional open-2-opt objective penalizes a route
        /// for not trending toward the next cluster. Off by default (§6).
        #[serde(default)]
        directional_constraint: bool,
    },
}

/// The full abstract planning request (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanRequest {
    pub start: Point,
    pub orders: Vec<Order>,
    #[serde(default)]
    pub endpoint_mode: Option<EndpointMode>,
    #[serde(default = "default_max_orders_cap")]
    pub max_orders_cap: usize,
    pub clustering: ClusteringParams,
    pub pipeline: PipelineMode,
    #[serde(default)]
    pub verification: VerificationMode,
    /// Routing backend to query when `verification == api` (§6). Required
    /// whenever that mode is selected; ignored otherwise.
    #[serde(default)]
    pub oracle_endpoint: Option<String>,
    #[serde(default)]
    pub check_highways: bool,
    #[serde(default = "default_group_penalty")]
    pub group_penalty: f64,
    #[serde(default = "default_inner_penalty")]
    pub inner_penalty: f64,
    /// When set, the response additionally carries per-cluster centroids
    /// and the distribution analyzer's advisory report (§4.8). The
    /// analyzer never feeds back into planning decisions on its own; a
    /// caller that wants its suggestions applied must issue a second
    /// request with the adjusted parameters.
    #[serde(default)]
    pub include_analysis: bool,
}

fn default_max_orders_cap() -> usize {
    5000
}

fn default_group_penalty() -> f64 {
    2.0
}

fn default_inner_penalty() -> f64 {
    1.5
}

/// One stop in the final plan (§3 "PlannedStop"). `intra_seq` is
/// `"<group_label>-NN"` with `NN` zero-padded to 2 digits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedStop {
    pub global_seq: usize,
    pub group_label: String,
    pub intra_seq: String,
    pub tracking_id: String,
    pub lat: f64,
    pub lon: f64,
}

impl PlannedStop {
    pub fn endpoint(global_seq: usize, group_label: &str, intra_seq: &str, lat: f64, lon: f64) -> Self {
        PlannedStop {
            global_seq,
            group_label: group_label.to_string(),
            intra_seq: intra_seq.to_string(),
            tracking_id: "ENDPOINT".to_string(),
            lat,
            lon,
        }
    }
}

/// One reported obstacle crossing along the realized route (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossingRecord {
    pub from_tracking: String,
    pub to_tracking: String,
    pub crosses_river: bool,
    pub crosses_highway: bool,
    pub method: String,
}

/// A cluster's centroid, labeled with the group letter it was sequenced to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCentroid {
    pub group_label: String,
    pub lat: f64,
    pub lon: f64,
}

/// The full planning response (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub orders: Vec<PlannedStop>,
    pub total_orders: usize,
    pub total_groups: usize,
    pub crossings: Vec<CrossingRecord>,
    pub verification_method: VerificationMode,
    /// Populated only when `PlanRequest::include_analysis` was set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_centroids: Vec<GroupCentroid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<DistributionReport>,
}

/// Formats a zero-padded 2-digit intra-cluster sequence number, per §3's
/// `"<label>-NN"` convention.
pub fn intra_seq_label(group_label: &str, position_1_based: usize) -> String {
    format!("{group_label}-{position_1_based:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intra_seq_zero_pads_to_two_digits() {
        assert_eq!(intra_seq_label("A", 1), "A-01");
        assert_eq!(intra_seq_label("A", 12), "A-12");
        assert_eq!(intra_seq_label("Z1", 3), "Z1-03");
    }
}
