//! Data model carried between operators
//!
//! - [`Value`]: a typed runtime value (scalars, graph elements, nested tables)
//! - [`Row`]: an ordered sequence of values
//! - [`DataSet`]: named columns plus rows of matching arity
//! - [`Vertex`], [`Edge`], [`Step`], [`Path`]: graph-shaped values

pub mod dataset;
pub mod datum;
pub mod graph;
pub mod row;

pub use dataset::DataSet;
pub use datum::Value;
pub use graph::{Edge, Path, Props, Step, Tag, Vertex};
pub use row::Row;

/// Column holding vertex identifiers in request DataSets
pub const VID_COLUMN: &str = "_vid";
/// Column holding path values
pub const PATH_COLUMN: &str = "_path";
