//! Plan builder
//!
//! Nodes are added leaves first; every dependency must already exist, so
//! the arena is topologically ordered by construction.

use crate::value::DataSet;

use super::error::{PlannerError, PlannerResult};
use super::node::{CartesianVars, LoopCondition, NodeId, PlanKind, PlanNode};
use super::ExecutionPlan;

/// Incrementally assembles an [`ExecutionPlan`]
#[derive(Debug, Default)]
pub struct PlanBuilder {
    nodes: Vec<PlanNode>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node depending on `deps`
    ///
    /// The node reads the output variables of its dependencies, in order,
    /// and writes a generated variable named after its kind and id.
    pub fn add(&mut self, kind: PlanKind, deps: &[NodeId]) -> PlannerResult<NodeId> {
        for dep in deps {
            self.node(*dep)?;
        }
        let id = self.nodes.len();

        let input_vars: Vec<String> = match kind {
            PlanKind::Start { .. } | PlanKind::Loop { .. } => Vec::new(),
            _ => deps
                .iter()
                .map(|d| self.nodes[*d].output_var.clone())
                .collect(),
        };

        let col_names = match kind.fixed_col_names() {
            Some(cols) => cols,
            None => deps
                .iter()
                .take(match kind {
                    PlanKind::InnerJoin { .. } | PlanKind::LeftJoin { .. } => 2,
                    _ => 1,
                })
                .flat_map(|d| self.nodes[*d].col_names.iter().cloned())
                .collect(),
        };

        let output_var = format!("__{}_{}", kind.name(), id);
        self.nodes.push(PlanNode {
            id,
            kind,
            deps: deps.to_vec(),
            input_vars,
            output_var,
            col_names,
        });
        Ok(id)
    }

    /// A start node publishing an empty DataSet
    pub fn start(&mut self) -> NodeId {
        self.push_leaf(PlanKind::Start { seed: None })
    }

    /// A start node publishing `seed` under `var`
    pub fn start_with(&mut self, seed: DataSet, var: impl Into<String>) -> NodeId {
        let id = self.push_leaf(PlanKind::Start { seed: Some(seed) });
        self.nodes[id].output_var = var.into();
        id
    }

    fn push_leaf(&mut self, kind: PlanKind) -> NodeId {
        let id = self.nodes.len();
        let col_names = kind.fixed_col_names().unwrap_or_default();
        self.nodes.push(PlanNode {
            id,
            output_var: format!("__{}_{}", kind.name(), id),
            kind,
            deps: Vec::new(),
            input_vars: Vec::new(),
            col_names,
        });
        id
    }

    /// A loop re-running the sub-plan rooted at `body`
    pub fn loop_node(
        &mut self,
        deps: &[NodeId],
        body: NodeId,
        condition: LoopCondition,
    ) -> PlannerResult<NodeId> {
        if deps.contains(&body) {
            return Err(PlannerError::InvalidPlan(
                "loop body cannot also be a loop dependency".to_string(),
            ));
        }
        self.node(body)?;
        self.add(PlanKind::Loop { body, condition }, deps)
    }

    /// A cartesian product over the outputs of `inputs`
    pub fn cartesian_product(&mut self, inputs: &[NodeId]) -> PlannerResult<NodeId> {
        let mut vars = CartesianVars::new();
        for input in inputs {
            let node = self.node(*input)?;
            vars.add_var(node.output_var.clone(), node.col_names.clone())?;
        }
        self.add(PlanKind::CartesianProduct { vars }, inputs)
    }

    /// Add one more factor to an existing cartesian product node
    pub fn add_var(&mut self, id: NodeId, var: &str, col_names: Vec<String>) -> PlannerResult<()> {
        let node = self.node_mut(id)?;
        let PlanKind::CartesianProduct { vars } = &mut node.kind else {
            return Err(PlannerError::InvalidPlan(format!(
                "node {} is not a cartesian product",
                id
            )));
        };
        vars.add_var(var, col_names)?;
        node.input_vars = vars.input_vars();
        node.col_names = vars.col_names();
        Ok(())
    }

    /// Replace the variables a node reads
    pub fn set_input_vars(&mut self, id: NodeId, vars: Vec<String>) -> PlannerResult<()> {
        self.node_mut(id)?.input_vars = vars;
        Ok(())
    }

    /// Rename the variable a node writes
    pub fn set_output_var(&mut self, id: NodeId, var: impl Into<String>) -> PlannerResult<()> {
        self.node_mut(id)?.output_var = var.into();
        Ok(())
    }

    pub fn set_col_names(&mut self, id: NodeId, col_names: Vec<String>) -> PlannerResult<()> {
        self.node_mut(id)?.col_names = col_names;
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> PlannerResult<&PlanNode> {
        self.nodes.get(id).ok_or(PlannerError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> PlannerResult<&mut PlanNode> {
        self.nodes.get_mut(id).ok_or(PlannerError::NodeNotFound(id))
    }

    /// Finish the plan with `root` as its final node
    pub fn build(self, root: NodeId) -> PlannerResult<ExecutionPlan> {
        ExecutionPlan::new(self.nodes, root)
    }
}
