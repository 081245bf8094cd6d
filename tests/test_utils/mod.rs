//! Shared test utilities
//!
//! Note: clippy reports false-positive dead_code warnings because it can't
//! trace usage across test binaries. These utilities are used by multiple tests.

#![allow(dead_code)]

use std::sync::Arc;

use stepgraph::context::{ExecResult, QueryContext};
use stepgraph::executor::{ExecStatus, ExecutorResult, Scheduler};
use stepgraph::meta::{MemoryMeta, VidType};
use stepgraph::planner::ExecutionPlan;
use stepgraph::storage::MemoryStorage;
use stepgraph::value::{DataSet, Edge, Row, Value, PATH_COLUMN};

/// An in-memory graph and a query context over it
pub struct TestGraph {
    pub ctx: Arc<QueryContext>,
    pub storage: Arc<MemoryStorage>,
    pub meta: Arc<MemoryMeta>,
}

impl TestGraph {
    /// Graph with type-1 `edge` edges; weights are optional
    pub fn new(edges: &[(i64, i64, Option<f64>)]) -> Self {
        let meta = Arc::new(MemoryMeta::new());
        let space = meta.create_space("test", VidType::Int64);
        let storage = Arc::new(MemoryStorage::new());
        storage.create_space(space.id);
        for (src, dst, weight) in edges {
            let mut edge = Edge::new(*src, *dst, 1, "edge", 0);
            if let Some(w) = weight {
                edge = edge.prop("weight", *w);
            }
            storage.add_edge(space.id, edge);
        }
        let ctx = Arc::new(QueryContext::new(
            space,
            storage.clone(),
            meta.clone(),
        ));
        TestGraph { ctx, storage, meta }
    }

    /// Unweighted graph
    pub fn unit(edges: &[(i64, i64)]) -> Self {
        let edges: Vec<_> = edges.iter().map(|(s, d)| (*s, *d, None)).collect();
        Self::new(&edges)
    }

    /// Run `plan` to completion
    pub async fn run(&self, plan: ExecutionPlan) -> ExecutorResult<(ExecStatus, Option<Arc<ExecResult>>)> {
        let scheduler = Scheduler::new(Arc::clone(&self.ctx), plan);
        let status = scheduler.schedule().await?;
        Ok((status, scheduler.result()))
    }

    /// Run `plan` and return its result, which must exist
    pub async fn run_ok(&self, plan: ExecutionPlan) -> Arc<ExecResult> {
        let (status, result) = self.run(plan).await.unwrap();
        assert_eq!(status, ExecStatus::Succeeded);
        result.unwrap()
    }
}

/// Vertex ids of every path in the `_path` column, sorted
pub fn paths_of(result: &ExecResult) -> Vec<Vec<i64>> {
    let mut paths: Vec<Vec<i64>> = result
        .data()
        .column(PATH_COLUMN)
        .unwrap()
        .map(|v| v.as_path().unwrap().vids().filter_map(Value::as_int).collect())
        .collect();
    paths.sort();
    paths
}

/// One-column table of integers
pub fn int_table(col: &str, values: &[i64]) -> DataSet {
    DataSet::from_rows(
        [col],
        values.iter().map(|v| Row::new(vec![Value::Int(*v)])).collect(),
    )
    .unwrap()
}

pub fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::from).collect()
}
