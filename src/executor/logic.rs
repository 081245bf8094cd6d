//! Control-flow executors: Start and Loop

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::context::{Bindings, ExecResult, QueryContext};
use crate::planner::{LoopCondition, NodeId};
use crate::value::DataSet;

use super::error::{ExecutorError, ExecutorResult};
use super::scheduler::{run_dag, SchedulerInner};
use super::{ExecOutput, Executor};

/// Handle a loop uses to run its body through the scheduler that owns it
#[derive(Clone, Default)]
pub struct BodyRunner {
    scheduler: Weak<SchedulerInner>,
}

impl BodyRunner {
    pub(crate) fn new(scheduler: Weak<SchedulerInner>) -> Self {
        BodyRunner { scheduler }
    }

    /// Run the sub-plan rooted at `body` once
    pub async fn run(&self, body: NodeId) -> ExecutorResult<()> {
        let inner = self
            .scheduler
            .upgrade()
            .ok_or_else(|| ExecutorError::Internal("loop outlived its scheduler".to_string()))?;
        run_dag(inner, body).await
    }
}

/// Leaf node; publishes its seed
pub struct Start {
    seed: Option<DataSet>,
    col_names: Vec<String>,
}

impl Start {
    pub fn new(seed: Option<DataSet>, col_names: Vec<String>) -> Self {
        Start { seed, col_names }
    }
}

#[async_trait]
impl Executor for Start {
    async fn execute(&mut self, _inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let data = match &self.seed {
            Some(seed) => seed.clone(),
            None => DataSet::new(self.col_names.iter().cloned()),
        };
        Ok(ExecResult::new(data).into())
    }
}

/// Re-runs a body sub-plan until its condition says stop
///
/// The condition is checked after every round. Variables are read from the
/// store directly because the body publishes them after this task was
/// dispatched.
pub struct Loop {
    ctx: Arc<QueryContext>,
    runner: BodyRunner,
    node: NodeId,
    body: NodeId,
    condition: LoopCondition,
}

impl Loop {
    pub fn new(
        ctx: Arc<QueryContext>,
        runner: BodyRunner,
        node: NodeId,
        body: NodeId,
        condition: LoopCondition,
    ) -> Self {
        Loop {
            ctx,
            runner,
            node,
            body,
            condition,
        }
    }

    fn limit(&self) -> usize {
        match &self.condition {
            LoopCondition::Times(n) => *n,
            LoopCondition::While { max, .. } | LoopCondition::Until { max, .. } => *max,
        }
    }

    fn flag(&self, var: &str) -> bool {
        self.ctx
            .vars()
            .latest(var)
            .map_or(false, |result| result.is_true())
    }

    fn should_continue(&self) -> bool {
        match &self.condition {
            LoopCondition::Times(_) => true,
            LoopCondition::While { var, .. } => self.flag(var),
            LoopCondition::Until { var, .. } => !self.flag(var),
        }
    }
}

#[async_trait]
impl Executor for Loop {
    async fn execute(&mut self, _inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let cap = self.ctx.config().max_loop_iterations;
        let limit = self.limit();

        let mut rounds = 0;
        while rounds < limit {
            if rounds >= cap {
                warn!(
                    query_id = self.ctx.query_id(),
                    node = self.node,
                    cap,
                    "loop stopped at the iteration cap"
                );
                break;
            }
            self.ctx.check_killed()?;
            self.runner.run(self.body).await?;
            rounds += 1;
            if !self.should_continue() {
                break;
            }
        }

        debug!(node = self.node, rounds, condition = %self.condition, "loop done");
        Ok(ExecResult::new(DataSet::new(Vec::<String>::new())).into())
    }
}

#[cfg(test)]
mod tests {
    use crate::context::QueryContext;
    use crate::executor::{ExecStatus, ExecutorConfig, Scheduler};
    use crate::expr::Expr;
    use crate::meta::{MemoryMeta, VidType};
    use crate::planner::{ExecutionPlan, LoopCondition, NodeId, PlanBuilder, PlanKind};
    use crate::storage::MemoryStorage;
    use crate::value::{DataSet, Row, Value};
    use std::sync::Arc;

    fn context(config: ExecutorConfig) -> Arc<QueryContext> {
        let meta = MemoryMeta::new();
        let space = meta.create_space("test", VidType::Int64);
        Arc::new(
            QueryContext::new(space, Arc::new(MemoryStorage::new()), Arc::new(meta))
                .with_config(config),
        )
    }

    /// A loop whose body publishes `flag` into `stop` every round
    fn plan(flag: bool, condition: LoopCondition) -> (ExecutionPlan, NodeId) {
        let mut b = PlanBuilder::new();
        let seed = DataSet::from_rows(["x"], vec![Row::new(vec![Value::Int(1)])]).unwrap();
        let start = b.start_with(seed, "in");
        let body = b
            .add(
                PlanKind::Project {
                    columns: vec![(Expr::lit(flag), "_value".to_string())],
                },
                &[],
            )
            .unwrap();
        b.set_input_vars(body, vec!["in".into()]).unwrap();
        b.set_output_var(body, "stop").unwrap();
        let lp = b.loop_node(&[start], body, condition).unwrap();
        (b.build(lp).unwrap(), body)
    }

    async fn body_runs(
        flag: bool,
        condition: LoopCondition,
        config: ExecutorConfig,
    ) -> u64 {
        let (plan, body) = plan(flag, condition);
        let scheduler = Scheduler::new(context(config), plan);
        assert_eq!(scheduler.schedule().await.unwrap(), ExecStatus::Succeeded);
        scheduler
            .profile()
            .iter()
            .find(|p| p.id == body)
            .map_or(0, |p| p.stats.runs)
    }

    #[tokio::test]
    async fn test_times() {
        assert_eq!(
            body_runs(true, LoopCondition::Times(4), ExecutorConfig::new()).await,
            4
        );
        assert_eq!(
            body_runs(true, LoopCondition::Times(0), ExecutorConfig::new()).await,
            0
        );
    }

    #[tokio::test]
    async fn test_until_stops_when_flag_set() {
        let cond = LoopCondition::Until {
            var: "stop".into(),
            max: 10,
        };
        assert_eq!(body_runs(true, cond.clone(), ExecutorConfig::new()).await, 1);
        assert_eq!(body_runs(false, cond, ExecutorConfig::new()).await, 10);
    }

    #[tokio::test]
    async fn test_while_runs_once_when_flag_false() {
        let cond = LoopCondition::While {
            var: "stop".into(),
            max: 10,
        };
        assert_eq!(body_runs(false, cond, ExecutorConfig::new()).await, 1);
    }

    #[tokio::test]
    async fn test_iteration_cap() {
        let config = ExecutorConfig::new().with_max_loop_iterations(2);
        assert_eq!(body_runs(true, LoopCondition::Times(50), config).await, 2);
    }
}
