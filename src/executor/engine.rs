//! Executor engine
//!
//! Builds executors from plan nodes.

use std::sync::Arc;

use crate::context::QueryContext;
use crate::planner::{PlanKind, PlanNode};

use super::algo::{
    BfsShortestPath, CartesianProduct, ConjunctPath, ProduceAllPaths, ProduceSemiShortestPath,
    Subgraph,
};
use super::collect::DataCollect;
use super::dedup::Dedup;
use super::error::ExecutorResult;
use super::join::{HashJoin, JoinType};
use super::logic::{BodyRunner, Loop, Start};
use super::maintain::{
    CreateTagIndex, DescTagIndex, DropTagIndex, ShowCreateTagIndex, ShowTagIndexStatus,
    ShowTagIndexes,
};
use super::project::Project;
use super::storage_access::{GetNeighbors, GetVertices};
use super::Executor;

/// Executor engine - builds executors from plan nodes
pub struct ExecutorEngine {
    ctx: Arc<QueryContext>,
    /// Handed to loops so they can run their bodies
    runner: BodyRunner,
}

impl ExecutorEngine {
    /// Create a new executor engine
    pub fn new(ctx: Arc<QueryContext>, runner: BodyRunner) -> Self {
        ExecutorEngine { ctx, runner }
    }

    /// Build the executor for one plan node
    pub fn build(&self, node: &PlanNode) -> ExecutorResult<Box<dyn Executor>> {
        let input = |i: usize| node.input_var(i).map(str::to_string);
        let ctx = || Arc::clone(&self.ctx);

        let exec: Box<dyn Executor> = match &node.kind {
            PlanKind::Start { seed } => Box::new(Start::new(seed.clone(), node.col_names.clone())),
            PlanKind::Loop { body, condition } => Box::new(Loop::new(
                ctx(),
                self.runner.clone(),
                node.id,
                *body,
                condition.clone(),
            )),

            PlanKind::GetNeighbors {
                src,
                edge_types,
                direction,
                dedup,
            } => Box::new(GetNeighbors::new(
                ctx(),
                input(0)?,
                src.clone(),
                edge_types.clone(),
                *direction,
                *dedup,
            )),
            PlanKind::GetVertices {
                src,
                dedup,
                from_paths,
            } => Box::new(GetVertices::new(
                ctx(),
                input(0)?,
                src.clone(),
                *dedup,
                *from_paths,
            )),

            PlanKind::Project { columns } => Box::new(Project::new(input(0)?, columns.clone())),
            PlanKind::Dedup => Box::new(Dedup::new(input(0)?)),
            PlanKind::DataCollect => {
                Box::new(DataCollect::new(input(0)?, node.col_names.clone()))
            }

            PlanKind::InnerJoin {
                left_keys,
                right_keys,
            } => Box::new(HashJoin::new(
                JoinType::Inner,
                input(0)?,
                input(1)?,
                left_keys.clone(),
                right_keys.clone(),
            )),
            PlanKind::LeftJoin {
                left_keys,
                right_keys,
            } => Box::new(HashJoin::new(
                JoinType::Left,
                input(0)?,
                input(1)?,
                left_keys.clone(),
                right_keys.clone(),
            )),

            PlanKind::ProduceSemiShortestPath => {
                Box::new(ProduceSemiShortestPath::new(ctx(), input(0)?))
            }
            PlanKind::BfsShortestPath {
                steps,
                targets,
                continue_var,
            } => Box::new(BfsShortestPath::new(
                ctx(),
                input(0)?,
                *steps,
                targets.clone(),
                continue_var.clone(),
            )),
            PlanKind::ConjunctPath {
                kind,
                steps,
                conditional_var,
                no_loop,
            } => Box::new(ConjunctPath::new(
                ctx(),
                input(0)?,
                input(1)?,
                *kind,
                *steps,
                conditional_var.clone(),
                *no_loop,
            )),
            PlanKind::ProduceAllPaths { no_loop } => {
                Box::new(ProduceAllPaths::new(ctx(), input(0)?, *no_loop))
            }
            PlanKind::Subgraph { steps, slots } => {
                Box::new(Subgraph::new(ctx(), input(0)?, *steps, slots.clone()))
            }
            PlanKind::CartesianProduct { vars } => Box::new(CartesianProduct::new(vars.clone())),

            PlanKind::CreateTagIndex { def, if_not_exists } => {
                Box::new(CreateTagIndex::new(ctx(), def.clone(), *if_not_exists))
            }
            PlanKind::DropTagIndex { name, if_exists } => {
                Box::new(DropTagIndex::new(ctx(), name.clone(), *if_exists))
            }
            PlanKind::DescTagIndex { name } => Box::new(DescTagIndex::new(ctx(), name.clone())),
            PlanKind::ShowCreateTagIndex { name } => {
                Box::new(ShowCreateTagIndex::new(ctx(), name.clone()))
            }
            PlanKind::ShowTagIndexes => Box::new(ShowTagIndexes::new(ctx())),
            PlanKind::ShowTagIndexStatus => Box::new(ShowTagIndexStatus::new(ctx())),
        };
        Ok(exec)
    }
}
