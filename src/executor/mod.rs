//! Query executor - asynchronous operator DAG
//!
//! Every plan node becomes a runtime task wrapping one [`Executor`]. The
//! [`Scheduler`] starts a task once all of its dependencies have published
//! their output variables; the executor reads its inputs from a version
//! snapshot ([`Bindings`]) and returns the results to publish.

pub mod algo;
pub mod collect;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod iter;
pub mod join;
pub mod logic;
pub mod maintain;
pub mod metrics;
pub mod project;
pub mod scheduler;
pub mod storage_access;

pub use config::ExecutorConfig;
pub use engine::ExecutorEngine;
pub use error::{ExecutorError, ExecutorResult};
pub use iter::{IterKind, ResultIter};
pub use metrics::{TaskStats, TaskStatsSnapshot};
pub use scheduler::{ExecStatus, NodeProfile, Scheduler, WorkerPool};

use async_trait::async_trait;

use crate::context::{Bindings, ExecResult};

/// One runnable operator
///
/// An executor is created once per plan node per query execution. Inside a
/// loop body it is executed once per round, so operators that search level
/// by level keep their state in `self` between calls.
#[async_trait]
pub trait Executor: Send {
    /// Run once against the bound input versions
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput>;
}

/// What one run of an executor publishes
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Published under the node's output variable
    pub result: ExecResult,
    /// Side variables (loop conditions, subgraph slots)
    pub extra: Vec<(String, ExecResult)>,
}

impl ExecOutput {
    pub fn new(result: ExecResult) -> Self {
        ExecOutput {
            result,
            extra: Vec::new(),
        }
    }

    /// Also publish `result` under `var`
    #[must_use]
    pub fn with_var(mut self, var: impl Into<String>, result: ExecResult) -> Self {
        self.extra.push((var.into(), result));
        self
    }

    /// Rows in the main result
    pub fn rows(&self) -> usize {
        self.result.data().len()
    }
}

impl From<ExecResult> for ExecOutput {
    fn from(result: ExecResult) -> Self {
        ExecOutput::new(result)
    }
}
