//! Storage client error types

use thiserror::Error;

/// Errors returned by the storage tier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Graph space does not exist on the storage side
    #[error("space {0} not found")]
    SpaceNotFound(i32),

    /// Request DataSet is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Vertex id does not match the space's vid type
    #[error("invalid vid {vid} for space {space}")]
    InvalidVid { space: i32, vid: String },

    /// Remote call failed
    #[error("rpc failed: {0}")]
    Rpc(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
