//! Smart planner (C7): a more disciplined alternative pipeline — K-adaptive
//! clustering, deterministic entry-point chaining, and directional-
//! constrained open 2-opt with inter-group linkage.

pub mod kadaptive;
pub mod open2opt;
pub mod planner;

pub use kadaptive::{kadaptive_cluster, KAdaptiveParams};
pub use open2opt::{LinkageMode, Target};
pub use planner::{smart_plan, SmartPlanParams};
