//! Execution plans
//!
//! A plan is produced by the query layer (parsing and optimization live
//! outside this crate) and handed to the scheduler as an arena of typed
//! nodes.
//!
//! ## Example
//!
//! ```ignore
//! use stepgraph::planner::{PlanBuilder, PlanKind};
//!
//! let mut b = PlanBuilder::new();
//! let start = b.start_with(seed, "frontier");
//! let gn = b.add(PlanKind::GetNeighbors { .. }, &[start])?;
//! let plan = b.build(gn)?;
//! ```

pub mod builder;
pub mod error;
pub mod explain;
pub mod node;
pub mod query;

use std::collections::HashSet;

pub use builder::PlanBuilder;
pub use error::{PlannerError, PlannerResult};
pub use explain::ExplainOutput;
pub use node::{
    CartesianVars, LoopCondition, NodeId, PathKind, PlanKind, PlanNode, SubgraphSlots,
};
pub use query::{FindPath, GetSubgraph};

/// An immutable, validated plan
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    nodes: Vec<PlanNode>,
    root: NodeId,
}

impl ExecutionPlan {
    /// Validate and wrap an arena of nodes
    pub fn new(nodes: Vec<PlanNode>, root: NodeId) -> PlannerResult<Self> {
        if root >= nodes.len() {
            return Err(PlannerError::NodeNotFound(root));
        }
        for node in &nodes {
            for dep in &node.deps {
                if *dep >= node.id {
                    return Err(PlannerError::InvalidPlan(format!(
                        "{} node {} depends on later node {}",
                        node.name(),
                        node.id,
                        dep
                    )));
                }
            }
            if let PlanKind::Loop { body, .. } = &node.kind {
                if *body >= nodes.len() {
                    return Err(PlannerError::NodeNotFound(*body));
                }
            }
        }
        Ok(ExecutionPlan { nodes, root })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> PlannerResult<&PlanNode> {
        self.nodes.get(id).ok_or(PlannerError::NodeNotFound(id))
    }

    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    /// Variable holding the final result
    pub fn output_var(&self) -> &str {
        &self.nodes[self.root].output_var
    }

    /// Nodes reachable from `root` through dependencies, dependencies first
    ///
    /// Loop bodies are not entered: a loop runs its body itself.
    pub fn subplan(&self, root: NodeId) -> PlannerResult<Vec<NodeId>> {
        self.node(root)?;
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if seen.insert(id) {
                stack.extend(self.node(id)?.deps.iter().copied());
            }
        }
        // dependencies always have smaller ids
        let mut ids: Vec<NodeId> = seen.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
