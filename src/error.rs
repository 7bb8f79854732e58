use thiserror::Error;

/// Crate-wide error type.
///
/// `SolverFailure` and `OracleUnavailable` are recoverable at the call site
/// (the planner substitutes a fallback and logs a warning); the others
/// propagate out of `Planner::plan`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid plan request: {0}")]
    InputValidation(String),

    #[error("obstacle data unavailable: {0}")]
    DataUnavailable(String),

    #[error("TSP solver failed: {0}")]
    SolverFailure(String),

    #[error("crossing oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("internal invariant broken: {0}")]
    Internal(String),

    #[error("cannot read file")]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
