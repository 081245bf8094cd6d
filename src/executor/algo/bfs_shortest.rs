//! Level-by-level unweighted shortest paths
//!
//! Each round folds one neighbor expansion into the distance map. Only
//! vertices first reached in the current round are reported, together with
//! every edge that reaches them at that distance.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::{Bindings, ExecResult, QueryContext};
use crate::value::{DataSet, Edge, Row, Value, VID_COLUMN};

use super::neighbors;
use crate::executor::error::ExecutorResult;
use crate::executor::{ExecOutput, Executor};

/// BFSShortestPath executor
pub struct BfsShortestPath {
    ctx: Arc<QueryContext>,
    input_var: String,
    steps: usize,
    targets: HashSet<Value>,
    /// Set to whether another round can find anything
    continue_var: Option<String>,
    dist: HashMap<Value, usize>,
    preds: HashMap<Value, Vec<Edge>>,
    depth: usize,
}

impl BfsShortestPath {
    pub fn new(
        ctx: Arc<QueryContext>,
        input_var: impl Into<String>,
        steps: usize,
        targets: Vec<Value>,
        continue_var: Option<String>,
    ) -> Self {
        BfsShortestPath {
            ctx,
            input_var: input_var.into(),
            steps,
            targets: targets.into_iter().collect(),
            continue_var,
            dist: HashMap::new(),
            preds: HashMap::new(),
            depth: 0,
        }
    }

    fn targets_found(&self) -> bool {
        !self.targets.is_empty() && self.targets.iter().all(|t| self.dist.contains_key(t))
    }
}

#[async_trait]
impl Executor for BfsShortestPath {
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        self.ctx.check_killed()?;
        let mut ds = DataSet::new([VID_COLUMN, "_dist", "_edge"]);

        if self.dist.is_empty() {
            let mut iter = neighbors(inputs, &self.input_var)?;
            while iter.valid() {
                if let Some(vertex) = iter.vertex() {
                    if !self.dist.contains_key(&vertex.vid) {
                        self.dist.insert(vertex.vid.clone(), 0);
                        ds.push(Row::new(vec![vertex.vid.clone(), Value::Int(0), Value::Null]))?;
                    }
                }
                iter.next();
            }
        }

        // vertices first reached this round, in discovery order
        let mut reached = Vec::new();
        let mut fresh = HashSet::new();
        let mut iter = neighbors(inputs, &self.input_var)?;
        while iter.valid() {
            if let (Some(vertex), Some(edge)) = (iter.vertex(), iter.edge()) {
                if let Some(&du) = self.dist.get(&vertex.vid) {
                    let dv = du + 1;
                    match self.dist.get(&edge.dst) {
                        None if dv <= self.steps => {
                            self.dist.insert(edge.dst.clone(), dv);
                            self.preds.insert(edge.dst.clone(), vec![edge.clone()]);
                            fresh.insert(edge.dst.clone());
                            reached.push(edge.dst.clone());
                        }
                        Some(&d) if d == dv && fresh.contains(&edge.dst) => {
                            let preds = self.preds.entry(edge.dst.clone()).or_default();
                            if !preds.contains(edge) {
                                preds.push(edge.clone());
                            }
                        }
                        _ => {}
                    }
                }
            }
            iter.next();
        }

        for vid in &reached {
            let dist = self.dist.get(vid).copied().unwrap_or_default();
            self.depth = self.depth.max(dist);
            let mut preds = self.preds.get(vid).cloned().unwrap_or_default();
            preds.sort_by(|a, b| a.key().cmp(&b.key()));
            for edge in preds {
                ds.push(Row::new(vec![
                    vid.clone(),
                    Value::Int(dist as i64),
                    Value::from(edge),
                ]))?;
            }
        }

        let more = !self.targets_found() && !reached.is_empty() && self.depth < self.steps;
        debug!(
            depth = self.depth,
            reached = reached.len(),
            more,
            "bfs round"
        );

        let mut out = ExecOutput::new(ExecResult::new(ds));
        if let Some(var) = &self.continue_var {
            out = out.with_var(var.clone(), ExecResult::scalar(more));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::algo::testing::{bind_neighbors, context, edges, expand};
    use crate::storage::EdgeDirection;

    async fn round(exec: &mut BfsShortestPath, graph: &[Edge], vids: &[i64]) -> ExecOutput {
        let inputs = bind_neighbors("gn", expand(graph, vids, EdgeDirection::Out));
        exec.execute(&inputs).await.unwrap()
    }

    fn more(out: &ExecOutput) -> bool {
        out.extra[0].1.is_true()
    }

    #[tokio::test]
    async fn test_levels() {
        let graph = edges(&[(1, 2, None), (1, 3, None), (2, 4, None), (3, 4, None)]);
        let mut exec = BfsShortestPath::new(context(), "gn", 5, vec![], Some("go".into()));

        let out = round(&mut exec, &graph, &[1]).await;
        let ds = out.result.data();
        // source plus two neighbors
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.rows()[0].values()[1], Value::Int(0));
        assert!(more(&out));

        let out = round(&mut exec, &graph, &[2, 3]).await;
        let ds = out.result.data();
        // vertex 4 through both parents
        assert_eq!(ds.len(), 2);
        assert!(ds.rows().iter().all(|r| r.values()[0] == Value::Int(4)));
        assert!(ds.rows().iter().all(|r| r.values()[1] == Value::Int(2)));

        let out = round(&mut exec, &graph, &[4]).await;
        assert_eq!(out.rows(), 0);
        assert!(!more(&out));
    }

    #[tokio::test]
    async fn test_stops_once_targets_found() {
        let graph = edges(&[(1, 2, None), (2, 3, None)]);
        let mut exec = BfsShortestPath::new(
            context(),
            "gn",
            5,
            vec![Value::Int(2)],
            Some("go".into()),
        );
        let out = round(&mut exec, &graph, &[1]).await;
        assert!(!more(&out));
    }

    #[tokio::test]
    async fn test_step_bound() {
        let graph = edges(&[(1, 2, None), (2, 3, None)]);
        let mut exec = BfsShortestPath::new(context(), "gn", 1, vec![], Some("go".into()));
        let out = round(&mut exec, &graph, &[1]).await;
        assert!(!more(&out));
        let out = round(&mut exec, &graph, &[2]).await;
        assert_eq!(out.rows(), 0);
    }
}
