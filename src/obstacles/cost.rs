//! Obstacle-aware cost function (C3).
//!
//! Cost of traversing P→Q is `distance(P,Q) * penalty(P,Q)`. The penalty is
//! 1.0 unless verification is enabled and the segment crosses a checked
//! obstacle, in which case it becomes `group_penalty` (inter-cluster
//! decisions) or `inner_penalty` (intra-cluster decisions).

use crate::geometry::{Metric, Point};
use crate::obstacles::index::ObstacleIndex;
use crate::obstacles::oracle::CrossingOracle;

/// Which verification mode is active for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    None,
    Geometry,
    Api,
}

impl Default for VerificationMode {
    fn default() -> Self {
        VerificationMode::None
    }
}

/// Which role a segment plays, determining which penalty applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyRole {
    /// Between cluster centroids / the driver start (C5).
    Group,
    /// Within a cluster (C6, C7).
    Inner,
}

pub struct CostModel<'a> {
    pub mode: VerificationMode,
    pub index: Option<&'a ObstacleIndex>,
    pub oracle: Option<&'a dyn CrossingOracle>,
    pub check_highways: bool,
    pub group_penalty: f64,
    pub inner_penalty: f64,
}

impl<'a> CostModel<'a> {
    /// A cost model with verification disabled — every segment costs
    /// exactly its planar distance.
    pub fn disabled() -> Self {
        CostModel {
            mode: VerificationMode::None,
            index: None,
            oracle: None,
            check_highways: false,
            group_penalty: 2.0,
            inner_penalty: 1.5,
        }
    }

    fn penalty_for(&self, role: PenaltyRole) -> f64 {
        match role {
            PenaltyRole::Group => self.group_penalty,
            PenaltyRole::Inner => self.inner_penalty,
        }
    }

    /// Whether the segment (p, q) crosses a checked obstacle, under the
    /// configured verification mode. Returns `None` when the API oracle
    /// could not determine a verdict (§7 `OracleUnavailable`) on a
    /// timeout/4xx/5xx; callers treat an unknown verdict as "no crossing".
    pub fn crosses(&self, p: Point, q: Point) -> Option<bool> {
        match self.mode {
            VerificationMode::None => Some(false),
            VerificationMode::Geometry => {
                let idx = self.index?;
                if idx.is_empty() {
                    return Some(false);
                }
                Some(idx.query(p, q, self.check_highways).crosses_any())
            }
            VerificationMode::Api => {
                let oracle = self.oracle?;
                oracle.check_crossing(p, q)
            }
        }
    }

    /// `distance(P,Q) * penalty(P,Q)` under planar Euclidean distance.
    pub fn cost(&self, p: Point, q: Point, role: PenaltyRole) -> f64 {
        let dist = p.distance(&q, Metric::Euclidean);
        match self.crosses(p, q) {
            Some(true) => dist * self.penalty_for(role),
            _ => dist,
        }
    }
}
