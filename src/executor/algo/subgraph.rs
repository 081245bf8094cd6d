//! k-step subgraph collection
//!
//! Rounds `1..=k` collect the expanded vertices with all their edges and
//! move the frontier to destinations not seen yet. One extra round then
//! collects the depth-k vertices with every edge leaving them; the far
//! endpoints of those boundary edges never join the vertex set. Four
//! variables coordinate the rounds with the surrounding loop:
//!
//! - `one_more_step_input`: the frontier the next expansion reads
//! - `is_one_more_step`: whether the next round is the extra one
//! - `one_more_step_output`: the boundary edges found by the extra round
//! - `last_step`: set once nothing is left to do; ends the loop

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::{Bindings, ExecResult, QueryContext};
use crate::planner::SubgraphSlots;
use crate::value::{DataSet, Edge, Row, Value, VID_COLUMN};

use super::neighbors;
use crate::executor::error::ExecutorResult;
use crate::executor::{ExecOutput, Executor};

/// Subgraph executor
pub struct Subgraph {
    ctx: Arc<QueryContext>,
    input_var: String,
    steps: usize,
    slots: SubgraphSlots,
    vids: HashSet<Value>,
    vertices: Vec<Value>,
    edge_keys: HashSet<Edge>,
    edges: Vec<Value>,
    round: usize,
    one_more: bool,
}

impl Subgraph {
    pub fn new(
        ctx: Arc<QueryContext>,
        input_var: impl Into<String>,
        steps: usize,
        slots: SubgraphSlots,
    ) -> Self {
        Subgraph {
            ctx,
            input_var: input_var.into(),
            steps,
            slots,
            vids: HashSet::new(),
            vertices: Vec::new(),
            edge_keys: HashSet::new(),
            edges: Vec::new(),
            round: 0,
            one_more: steps == 0,
        }
    }

    fn add_edge(&mut self, edge: &Edge) {
        let canonical = edge.canonical();
        if self.edge_keys.insert(canonical.clone()) {
            self.edges.push(Value::from(canonical));
        }
    }
}

#[async_trait]
impl Executor for Subgraph {
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        self.round += 1;
        self.ctx.check_killed()?;
        let extra = self.one_more;

        let mut iter = neighbors(inputs, &self.input_var)?;
        while iter.valid() {
            if let Some(vertex) = iter.vertex() {
                if self.vids.insert(vertex.vid.clone()) {
                    self.vertices.push(Value::from(vertex.clone()));
                }
            }
            iter.next();
        }

        let mut frontier = DataSet::new([VID_COLUMN]);
        let mut queued = HashSet::new();
        let mut boundary = DataSet::new(["_edge"]);
        let mut iter = neighbors(inputs, &self.input_var)?;
        while iter.valid() {
            if let Some(edge) = iter.edge() {
                if extra {
                    boundary.push(Row::new(vec![Value::from(edge.clone())]))?;
                    self.add_edge(edge);
                } else {
                    self.add_edge(edge);
                    if !self.vids.contains(&edge.dst) && queued.insert(edge.dst.clone()) {
                        frontier.push(Row::new(vec![edge.dst.clone()]))?;
                    }
                }
            }
            iter.next();
        }

        self.one_more = !extra && self.round >= self.steps;
        let last_step = extra || frontier.is_empty();
        debug!(
            round = self.round,
            vertices = self.vertices.len(),
            edges = self.edges.len(),
            extra,
            last_step,
            "subgraph round"
        );

        let ds = DataSet::from_rows(
            ["_vertices", "_edges"],
            vec![Row::new(vec![
                Value::List(self.vertices.clone()),
                Value::List(self.edges.clone()),
            ])],
        )?;
        Ok(ExecOutput::new(ExecResult::new(ds))
            .with_var(self.slots.one_more_step_input.clone(), ExecResult::new(frontier))
            .with_var(
                self.slots.is_one_more_step.clone(),
                ExecResult::scalar(self.one_more),
            )
            .with_var(
                self.slots.one_more_step_output.clone(),
                ExecResult::new(boundary),
            )
            .with_var(self.slots.last_step.clone(), ExecResult::scalar(last_step)))
    }
}
