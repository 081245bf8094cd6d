//! DAG scheduler
//!
//! Turns an [`ExecutionPlan`] into one tokio task per node. Each task holds
//! a `watch` receiver for every dependency and starts once all of them
//! report success; it then takes a worker permit, binds its input
//! variables, runs its executor and publishes the outputs.
//!
//! ```text
//! Scheduler::schedule()
//!     └─> run_dag(root)
//!           ├─> spawn node 0 ──publish──> watch(0) ──┐
//!           ├─> spawn node 1 ──publish──> watch(1) ──┤
//!           └─> spawn node 2 <──waits on────────────┘
//!                  └─> Loop executor ─> run_dag(body) (recursive)
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::context::{ExecResult, QueryContext};
use crate::planner::{ExecutionPlan, NodeId};

use super::engine::ExecutorEngine;
use super::error::{ExecutorError, ExecutorResult};
use super::logic::BodyRunner;
use super::metrics::{TaskStats, TaskStatsSnapshot};
use super::Executor;

/// Bounded pool of execution slots
///
/// Cloning shares the slots, so one pool can bound several queries.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        WorkerPool {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots not currently held
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    async fn acquire(&self) -> ExecutorResult<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ExecutorError::Internal("worker pool closed".to_string()))
    }
}

/// Terminal status of a successful schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Succeeded,
    /// The query was killed; not a failure
    Cancelled,
}

/// Statistics of one executed node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeProfile {
    pub id: NodeId,
    pub name: &'static str,
    pub output_var: String,
    pub stats: TaskStatsSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Pending,
    Done,
    Failed,
    Cancelled,
}

/// Runtime counterpart of a plan node
struct Task {
    /// Held for the whole run, across storage round trips
    executor: tokio::sync::Mutex<Box<dyn Executor>>,
    stats: TaskStats,
}

pub(crate) struct SchedulerInner {
    ctx: Arc<QueryContext>,
    plan: ExecutionPlan,
    pool: WorkerPool,
    /// Built lazily, once per node per execution
    tasks: Mutex<HashMap<NodeId, Arc<Task>>>,
}

type DagFuture = Pin<Box<dyn Future<Output = ExecutorResult<()>> + Send>>;

impl SchedulerInner {
    fn task(self: &Arc<Self>, id: NodeId) -> ExecutorResult<Arc<Task>> {
        let mut tasks = self.tasks.lock();
        if let Some(task) = tasks.get(&id) {
            return Ok(Arc::clone(task));
        }
        let node = self.plan.node(id)?;
        let engine = ExecutorEngine::new(
            Arc::clone(&self.ctx),
            BodyRunner::new(Arc::downgrade(self)),
        );
        let task = Arc::new(Task {
            executor: tokio::sync::Mutex::new(engine.build(node)?),
            stats: TaskStats::new(),
        });
        tasks.insert(id, Arc::clone(&task));
        Ok(task)
    }

    async fn run_node(
        self: &Arc<Self>,
        id: NodeId,
        deps: Vec<watch::Receiver<TaskState>>,
    ) -> ExecutorResult<()> {
        for mut rx in deps {
            let state = *rx
                .wait_for(|s| *s != TaskState::Pending)
                .await
                .map_err(|_| ExecutorError::Internal("dependency vanished".to_string()))?;
            if state != TaskState::Done {
                debug!(node = id, "skipped, upstream did not succeed");
                return Err(ExecutorError::Cancelled);
            }
        }
        self.ctx.check_killed()?;

        let node = self.plan.node(id)?;
        let task = self.task(id)?;
        let _permit = if node.kind.is_control_flow() {
            None
        } else {
            Some(self.pool.acquire().await?)
        };
        self.ctx.check_killed()?;

        let bindings = self.ctx.vars().snapshot(&node.input_vars);
        let started = Instant::now();
        let result = {
            let mut executor = task.executor.lock().await;
            executor.execute(&bindings).await
        };
        let elapsed = started.elapsed();

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                if !e.is_cancelled() {
                    error!(
                        query_id = self.ctx.query_id(),
                        node = id,
                        name = node.name(),
                        error = %e,
                        "task failed"
                    );
                }
                return Err(e);
            }
        };

        task.stats.record(output.rows(), elapsed);
        if elapsed >= self.ctx.config().slow_task_threshold && !node.kind.is_control_flow() {
            warn!(
                query_id = self.ctx.query_id(),
                node = id,
                name = node.name(),
                elapsed_ms = elapsed.as_millis() as u64,
                "slow task"
            );
        }

        let vars = self.ctx.vars();
        let rows = output.rows();
        let version = vars.publish(&node.output_var, output.result);
        for (name, result) in output.extra {
            vars.publish(&name, result);
        }
        debug!(
            node = id,
            name = node.name(),
            var = %node.output_var,
            version,
            rows,
            "published"
        );
        Ok(())
    }
}

/// Run the sub-DAG rooted at `root`, loop bodies excluded
pub(crate) fn run_dag(inner: Arc<SchedulerInner>, root: NodeId) -> DagFuture {
    Box::pin(async move {
        let ids = inner.plan.subplan(root)?;

        let mut senders = HashMap::with_capacity(ids.len());
        let mut receivers = HashMap::with_capacity(ids.len());
        for id in &ids {
            let (tx, rx) = watch::channel(TaskState::Pending);
            senders.insert(*id, tx);
            receivers.insert(*id, rx);
        }

        let mut set = JoinSet::new();
        for id in ids {
            let deps = inner
                .plan
                .node(id)?
                .deps
                .iter()
                .filter_map(|d| receivers.get(d).cloned())
                .collect();
            let Some(tx) = senders.remove(&id) else {
                continue;
            };
            let inner = Arc::clone(&inner);
            set.spawn(async move {
                let result = inner.run_node(id, deps).await;
                let state = match &result {
                    Ok(()) => TaskState::Done,
                    Err(e) if e.is_cancelled() => TaskState::Cancelled,
                    Err(_) => TaskState::Failed,
                };
                // nobody may be waiting on this node
                let _ = tx.send(state);
                result
            });
        }
        drop(receivers);

        let mut first_error = None;
        let mut cancelled = false;
        while let Some(joined) = set.join_next().await {
            let result = joined.unwrap_or_else(|e| {
                Err(ExecutorError::Internal(format!("task aborted: {}", e)))
            });
            match result {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => cancelled = true,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None if cancelled => Err(ExecutorError::Cancelled),
            None => Ok(()),
        }
    })
}

/// Executes one plan within one query context
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// A scheduler with its own worker pool sized from the context's config
    pub fn new(ctx: Arc<QueryContext>, plan: ExecutionPlan) -> Self {
        let pool = WorkerPool::new(ctx.config().max_concurrent_tasks);
        Self::with_pool(ctx, plan, pool)
    }

    /// A scheduler sharing `pool` with other queries
    pub fn with_pool(ctx: Arc<QueryContext>, plan: ExecutionPlan, pool: WorkerPool) -> Self {
        Scheduler {
            inner: Arc::new(SchedulerInner {
                ctx,
                plan,
                pool,
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn context(&self) -> &Arc<QueryContext> {
        &self.inner.ctx
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.inner.plan
    }

    /// Run the plan to completion
    pub async fn schedule(&self) -> ExecutorResult<ExecStatus> {
        let started = Instant::now();
        info!(
            query_id = self.inner.ctx.query_id(),
            space = %self.inner.ctx.space().name,
            nodes = self.inner.plan.nodes().len(),
            "executing plan"
        );

        let status = match run_dag(Arc::clone(&self.inner), self.inner.plan.root()).await {
            Ok(()) => ExecStatus::Succeeded,
            Err(ExecutorError::Cancelled) => ExecStatus::Cancelled,
            Err(e) => return Err(e),
        };

        info!(
            query_id = self.inner.ctx.query_id(),
            ?status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "plan finished"
        );
        Ok(status)
    }

    /// Latest result of the plan's root
    pub fn result(&self) -> Option<Arc<ExecResult>> {
        self.inner.ctx.vars().latest(self.inner.plan.output_var())
    }

    /// Statistics of every node that ran, by node id
    pub fn profile(&self) -> Vec<NodeProfile> {
        let tasks = self.inner.tasks.lock();
        let mut profile: Vec<NodeProfile> = tasks
            .iter()
            .filter_map(|(id, task)| {
                let node = self.inner.plan.node(*id).ok()?;
                Some(NodeProfile {
                    id: *id,
                    name: node.name(),
                    output_var: node.output_var.clone(),
                    stats: task.stats.snapshot(),
                })
            })
            .collect();
        profile.sort_by_key(|p| p.id);
        profile
    }
}
