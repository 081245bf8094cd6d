//! Planner error types

use thiserror::Error;

/// Planner error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlannerError {
    /// Invalid plan structure
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Node id not present in the plan
    #[error("node {0} not found")]
    NodeNotFound(usize),

    /// Plan has no root
    #[error("plan has no root")]
    NoRoot,
}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
