//! Storage tier client
//!
//! The executors reach the storage tier only through [`StorageClient`].
//! [`MemoryStorage`] is an in-process implementation for tests and the CLI.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStorage;
pub use traits::{EdgeDirection, StorageClient, NEIGHBOR_COLUMNS, VERTEX_COLUMNS};
