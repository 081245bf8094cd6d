//! Graph algorithm executors
//!
//! Path searches run inside a loop: every round a GetNeighbors node expands
//! the current frontier and the algorithm executor folds the expansion into
//! state it keeps across rounds. The executor publishes the rows that
//! changed, which become the next frontier.

pub mod all_paths;
pub mod bfs_shortest;
pub mod cartesian;
pub mod conjunct;
pub mod semi_shortest;
pub mod subgraph;

pub use all_paths::ProduceAllPaths;
pub use bfs_shortest::BfsShortestPath;
pub use cartesian::CartesianProduct;
pub use conjunct::ConjunctPath;
pub use semi_shortest::ProduceSemiShortestPath;
pub use subgraph::Subgraph;

use crate::context::Bindings;
use crate::value::{DataSet, Edge, Path, Row, Value, PATH_COLUMN};

use super::error::{ExecutorError, ExecutorResult};
use super::iter::{IterKind, ResultIter};

/// Edge property holding the traversal cost
pub const WEIGHT_PROP: &str = "weight";

/// Costs closer than this are equal
pub(crate) const COST_EPSILON: f64 = 1e-9;

/// Cost of walking `edge`; 1 unless it carries a weight
pub fn edge_weight(edge: &Edge) -> ExecutorResult<f64> {
    let weight = match edge.props.get(WEIGHT_PROP) {
        None | Some(Value::Null) => return Ok(1.0),
        Some(Value::Int(w)) => *w as f64,
        Some(Value::Float(w)) => *w,
        Some(other) => return Err(ExecutorError::type_mismatch("NUMBER", other, WEIGHT_PROP)),
    };
    if !weight.is_finite() || weight <= 0.0 {
        return Err(ExecutorError::InvalidOperation(format!(
            "edge {} has weight {}; weights must be positive",
            edge, weight
        )));
    }
    Ok(weight)
}

/// Iterator over a neighbor-expansion variable
pub(crate) fn neighbors(inputs: &Bindings, var: &str) -> ExecutorResult<Box<dyn ResultIter>> {
    let iter = inputs.iter(var)?;
    if iter.kind() != IterKind::GetNeighbors {
        return Err(ExecutorError::InvalidOperation(format!(
            "`{}' is not a neighbor expansion",
            var
        )));
    }
    Ok(iter)
}

/// A `_path` DataSet
pub(crate) fn path_dataset(paths: impl IntoIterator<Item = Path>) -> ExecutorResult<DataSet> {
    let mut ds = DataSet::new([PATH_COLUMN]);
    for path in paths {
        ds.push(Row::new(vec![Value::from(path)]))?;
    }
    Ok(ds)
}
