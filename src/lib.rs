//! stepgraph - graph query execution
//!
//! Runs typed operator plans against a graph storage tier:
//! - Versioned variables shared by the operators of one query
//! - An async DAG scheduler with loops and a bounded worker pool
//! - Neighbor expansion, joins and path-finding operators
//! - Tag index maintenance through the metadata tier

pub mod context;
pub mod executor;
pub mod expr;
pub mod meta;
pub mod planner;
pub mod storage;
pub mod value;
