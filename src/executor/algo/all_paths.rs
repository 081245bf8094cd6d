//! Exhaustive forward path expansion
//!
//! Keeps the paths that ended on the previous frontier and extends each of
//! them by every edge of the current expansion. The first round also emits
//! the zero-step path of each start vertex.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::{Bindings, ExecResult, QueryContext};
use crate::value::{DataSet, Path, Row, Value, Vertex, PATH_COLUMN, VID_COLUMN};

use super::neighbors;
use crate::executor::error::ExecutorResult;
use crate::executor::iter::IterKind;
use crate::executor::{ExecOutput, Executor};

/// ProduceAllPaths executor
pub struct ProduceAllPaths {
    ctx: Arc<QueryContext>,
    input_var: String,
    /// Reject extensions that revisit a vertex
    no_loop: bool,
    /// Paths produced last round, by end vertex
    frontier: HashMap<Value, Vec<Path>>,
    round: usize,
}

impl ProduceAllPaths {
    pub fn new(ctx: Arc<QueryContext>, input_var: impl Into<String>, no_loop: bool) -> Self {
        ProduceAllPaths {
            ctx,
            input_var: input_var.into(),
            no_loop,
            frontier: HashMap::new(),
            round: 0,
        }
    }
}

fn emit(ds: &mut DataSet, path: Path) -> ExecutorResult<()> {
    ds.push(Row::new(vec![path.last_vid().clone(), Value::from(path)]))
}

#[async_trait]
impl Executor for ProduceAllPaths {
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        self.round += 1;
        self.ctx.check_killed()?;
        let mut ds = DataSet::new([VID_COLUMN, PATH_COLUMN]);

        if self.round == 1 {
            let mut iter = neighbors(inputs, &self.input_var)?;
            while iter.valid() {
                if let Some(vertex) = iter.vertex() {
                    if !self.frontier.contains_key(&vertex.vid) {
                        let start = Path::new(Vertex::new(vertex.vid.clone()));
                        emit(&mut ds, start.clone())?;
                        self.frontier.insert(vertex.vid.clone(), vec![start]);
                    }
                }
                iter.next();
            }
        }

        let mut next: HashMap<Value, Vec<Path>> = HashMap::new();
        let mut iter = neighbors(inputs, &self.input_var)?;
        while iter.valid() {
            if let (Some(vertex), Some(edge)) = (iter.vertex(), iter.edge()) {
                for prefix in self.frontier.get(&vertex.vid).into_iter().flatten() {
                    if self.no_loop && prefix.contains_vid(&edge.dst) {
                        continue;
                    }
                    if let Some(path) = prefix.extended(edge) {
                        next.entry(edge.dst.clone()).or_default().push(path.clone());
                        emit(&mut ds, path)?;
                    }
                }
            }
            iter.next();
        }

        debug!(round = self.round, paths = ds.len(), "all-paths round");
        self.frontier = next;
        Ok(ExecResult::with_kind(ds, IterKind::Path).into())
    }
}
