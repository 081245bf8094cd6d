//! Metadata tier client
//!
//! Space descriptors (including the vid type) and tag-index DDL.

pub mod client;
pub mod error;
pub mod memory;

pub use client::{IndexField, IndexStatus, MetaClient, SpaceInfo, TagIndexDef, VidType};
pub use error::{MetaError, MetaResult};
pub use memory::MemoryMeta;
