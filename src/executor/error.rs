//! Executor error types

use std::fmt;

use crate::meta::MetaError;
use crate::planner::PlannerError;
use crate::storage::StorageError;

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Executor errors
#[derive(Debug)]
pub enum ExecutorError {
    /// Storage tier returned an error
    Storage(StorageError),

    /// Metadata tier returned an error
    Meta(MetaError),

    /// Plan could not be turned into executors
    Plan(PlannerError),

    /// Type mismatch during evaluation
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
        context: String,
    },

    /// Invalid operation (e.g., division by zero, bad edge weight)
    InvalidOperation(String),

    /// Column not found in the current iterator
    ColumnNotFound(String),

    /// Column index out of bounds
    ColumnIndexOutOfBounds { index: usize, row_len: usize },

    /// Row arity does not match the DataSet's column count
    ArityMismatch { expected: usize, got: usize },

    /// Input variable was never published
    VariableNotFound(String),

    /// The query was killed
    Cancelled,

    /// Internal executor error
    Internal(String),
}

impl ExecutorError {
    /// Whether this error is the cancellation signal rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutorError::Cancelled)
    }

    pub(crate) fn type_mismatch(
        expected: &'static str,
        got: &crate::value::Value,
        context: impl Into<String>,
    ) -> Self {
        ExecutorError::TypeMismatch {
            expected,
            got: got.type_name(),
            context: context.into(),
        }
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::Storage(e) => write!(f, "storage error: {}", e),
            ExecutorError::Meta(e) => write!(f, "meta error: {}", e),
            ExecutorError::Plan(e) => write!(f, "plan error: {}", e),
            ExecutorError::TypeMismatch {
                expected,
                got,
                context,
            } => {
                write!(
                    f,
                    "type mismatch: expected {}, got {} in {}",
                    expected, got, context
                )
            }
            ExecutorError::InvalidOperation(msg) => write!(f, "invalid operation: {}", msg),
            ExecutorError::ColumnNotFound(column) => write!(f, "column not found: {}", column),
            ExecutorError::ColumnIndexOutOfBounds { index, row_len } => {
                write!(
                    f,
                    "column index {} out of bounds (row has {} columns)",
                    index, row_len
                )
            }
            ExecutorError::ArityMismatch { expected, got } => {
                write!(f, "row has {} values, expected {}", got, expected)
            }
            ExecutorError::VariableNotFound(name) => write!(f, "variable not found: {}", name),
            ExecutorError::Cancelled => write!(f, "query was killed"),
            ExecutorError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutorError::Storage(e) => Some(e),
            ExecutorError::Meta(e) => Some(e),
            ExecutorError::Plan(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for ExecutorError {
    fn from(e: StorageError) -> Self {
        ExecutorError::Storage(e)
    }
}

impl From<MetaError> for ExecutorError {
    fn from(e: MetaError) -> Self {
        ExecutorError::Meta(e)
    }
}

impl From<PlannerError> for ExecutorError {
    fn from(e: PlannerError) -> Self {
        ExecutorError::Plan(e)
    }
}
