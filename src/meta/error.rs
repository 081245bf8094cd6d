//! Metadata client error types

use thiserror::Error;

/// Errors returned by the metadata tier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetaError {
    #[error("space not found: {0}")]
    SpaceNotFound(String),

    #[error("tag not found: {0}")]
    TagNotFound(String),

    #[error("index already exists: {0}")]
    IndexExists(String),

    #[error("index not found: {0}")]
    IndexNotFound(String),

    /// Any other failure reported by the metadata service
    #[error("{0}")]
    Other(String),
}

/// Result type for metadata operations
pub type MetaResult<T> = Result<T, MetaError>;
