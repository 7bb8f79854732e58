//! Obstacle index (C2), obstacle-aware cost model (C3), and the crossing
//! oracle abstraction backing the "API" verification mode.

pub mod cost;
pub mod index;
pub mod oracle;

pub use cost::{CostModel, PenaltyRole, VerificationMode};
pub use index::{CrossingResult, ObstacleIndex};
pub use oracle::{CachedOracle, CrossingOracle, UnavailableOracle, ValhallaOracle};
