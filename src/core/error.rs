use super::FormulationKind;
use thiserror::Error;

/// Result of the model compiler operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while compiling, solving or extracting a model.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// Every formulation is undefined for an instance without jobs.
    #[error("instance has no jobs")]
    EmptyInstance,

    /// Instance data violates the problem definition.
    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    /// Two collections that must describe the same jobs differ in length.
    #[error("size mismatch: expected {expected} jobs, found {found}")]
    SizeMismatch { expected: usize, found: usize },

    /// The variable or constraint arrays could not be allocated.
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// Internal bookkeeping defect: bad variable index, duplicate name or empty constraint.
    #[error("indexing error: {0}")]
    Indexing(String),

    /// The solver backend rejected the model or failed to optimize it.
    #[error("solver backend failed: {0}")]
    Backend(String),

    /// The raw solver output does not have the expected shape.
    #[error("malformed solver result: {0}")]
    MalformedResult(String),

    /// The warm start schedule is not a feasible schedule of the instance.
    #[error("schedule is not feasible for instance {0}")]
    InfeasibleSchedule(usize),

    /// Only the positional formulation takes a heuristic warm start.
    #[error("{0} formulation does not accept a warm start")]
    WarmStartUnsupported(FormulationKind),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl From<std::collections::TryReserveError> for Error {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::Allocation(err.to_string())
    }
}

#[cfg(feature = "gurobi")]
impl From<grb::Error> for Error {
    fn from(err: grb::Error) -> Self {
        Self::Backend(err.to_string())
    }
}
