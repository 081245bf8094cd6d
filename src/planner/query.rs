//! Plans for the graph queries the crate knows how to run
//!
//! `FIND PATH` meets a forward search from the sources with a backward
//! search from the targets inside a loop; `GET SUBGRAPH` expands from the
//! start vertices for a fixed number of steps plus the boundary round.
//!
//! ```text
//! DataCollect($paths)
//!   Loop(while $more)
//!     body: ConjunctPath($fwd, $bwd)
//!             <search>($fwd) <- GetNeighbors(out, $fwd)
//!             <search>($bwd) <- GetNeighbors(in, $bwd)
//!   Start($fwd)  Start($bwd)
//! ```

use crate::expr::Expr;
use crate::storage::EdgeDirection;
use crate::value::{DataSet, Row, Value, PATH_COLUMN, VID_COLUMN};

use super::builder::PlanBuilder;
use super::error::PlannerResult;
use super::node::{LoopCondition, NodeId, PathKind, PlanKind, SubgraphSlots};
use super::ExecutionPlan;

const FWD_FRONTIER: &str = "__fwd_frontier";
const BWD_FRONTIER: &str = "__bwd_frontier";
const CONJUNCT_MORE: &str = "__conjunct_more";
const SUBGRAPH_PREFIX: &str = "__subgraph";

/// A single-column `_vid` DataSet
pub fn vid_dataset(vids: &[Value]) -> DataSet {
    let mut ds = DataSet::with_capacity([VID_COLUMN], vids.len());
    for vid in vids {
        // one value per row always matches the one column
        let _ = ds.push(Row::new(vec![vid.clone()]));
    }
    ds
}

fn expand(
    b: &mut PlanBuilder,
    frontier: &str,
    edge_types: &[String],
    direction: EdgeDirection,
) -> PlannerResult<NodeId> {
    let gn = b.add(
        PlanKind::GetNeighbors {
            src: Expr::col(VID_COLUMN),
            edge_types: edge_types.to_vec(),
            direction,
            dedup: true,
        },
        &[],
    )?;
    b.set_input_vars(gn, vec![frontier.to_string()])?;
    Ok(gn)
}

/// `FIND <kind> PATH FROM .. TO .. UPTO <steps> STEPS`
#[derive(Debug, Clone)]
pub struct FindPath {
    pub from: Vec<Value>,
    pub to: Vec<Value>,
    pub kind: PathKind,
    /// Upper bound on path length, in hops
    pub steps: usize,
    pub no_loop: bool,
    /// Empty means every edge type
    pub edge_types: Vec<String>,
}

impl FindPath {
    pub fn new(from: Vec<Value>, to: Vec<Value>, kind: PathKind) -> Self {
        FindPath {
            from,
            to,
            kind,
            steps: 5,
            no_loop: false,
            edge_types: Vec::new(),
        }
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_no_loop(mut self, no_loop: bool) -> Self {
        self.no_loop = no_loop;
        self
    }

    pub fn with_edge_types(mut self, edge_types: Vec<String>) -> Self {
        self.edge_types = edge_types;
        self
    }

    fn search(&self) -> PlanKind {
        match self.kind {
            PathKind::BiBfs => PlanKind::BfsShortestPath {
                steps: self.steps,
                targets: Vec::new(),
                continue_var: None,
            },
            PathKind::BiDijkstra | PathKind::Floyd => PlanKind::ProduceSemiShortestPath,
            PathKind::AllPaths => PlanKind::ProduceAllPaths {
                no_loop: self.no_loop,
            },
        }
    }

    /// Build the plan; its result is a `_path` DataSet
    pub fn plan(&self) -> PlannerResult<ExecutionPlan> {
        let mut b = PlanBuilder::new();
        let start_fwd = b.start_with(vid_dataset(&self.from), FWD_FRONTIER);
        let start_bwd = b.start_with(vid_dataset(&self.to), BWD_FRONTIER);

        let gn_fwd = expand(&mut b, FWD_FRONTIER, &self.edge_types, EdgeDirection::Out)?;
        let gn_bwd = expand(&mut b, BWD_FRONTIER, &self.edge_types, EdgeDirection::In)?;
        let search_fwd = b.add(self.search(), &[gn_fwd])?;
        b.set_output_var(search_fwd, FWD_FRONTIER)?;
        let search_bwd = b.add(self.search(), &[gn_bwd])?;
        b.set_output_var(search_bwd, BWD_FRONTIER)?;

        let conjunct = b.add(
            PlanKind::ConjunctPath {
                kind: self.kind,
                steps: self.steps,
                conditional_var: Some(CONJUNCT_MORE.to_string()),
                no_loop: self.no_loop,
            },
            &[search_fwd, search_bwd],
        )?;
        let paths_var = b.node(conjunct)?.output_var.clone();

        let lp = b.loop_node(
            &[start_fwd, start_bwd],
            conjunct,
            LoopCondition::While {
                var: CONJUNCT_MORE.to_string(),
                max: self.steps + 1,
            },
        )?;
        let collect = b.add(PlanKind::DataCollect, &[lp])?;
        b.set_input_vars(collect, vec![paths_var])?;
        b.set_col_names(collect, vec![PATH_COLUMN.to_string()])?;
        b.build(collect)
    }
}

/// `GET SUBGRAPH <steps> STEPS FROM ..`
#[derive(Debug, Clone)]
pub struct GetSubgraph {
    pub from: Vec<Value>,
    pub steps: usize,
    pub direction: EdgeDirection,
    pub edge_types: Vec<String>,
}

impl GetSubgraph {
    pub fn new(from: Vec<Value>, steps: usize) -> Self {
        GetSubgraph {
            from,
            steps,
            direction: EdgeDirection::Both,
            edge_types: Vec::new(),
        }
    }

    pub fn with_direction(mut self, direction: EdgeDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Build the plan; its result is one `_vertices`/`_edges` row
    pub fn plan(&self) -> PlannerResult<ExecutionPlan> {
        let slots = SubgraphSlots::with_prefix(SUBGRAPH_PREFIX);
        let mut b = PlanBuilder::new();
        let start = b.start_with(vid_dataset(&self.from), slots.one_more_step_input.clone());

        let gn = expand(
            &mut b,
            &slots.one_more_step_input,
            &self.edge_types,
            self.direction,
        )?;
        let subgraph = b.add(
            PlanKind::Subgraph {
                steps: self.steps,
                slots: slots.clone(),
            },
            &[gn],
        )?;
        let subgraph_var = b.node(subgraph)?.output_var.clone();

        let lp = b.loop_node(
            &[start],
            subgraph,
            LoopCondition::Until {
                var: slots.last_step.clone(),
                max: self.steps + 1,
            },
        )?;
        let project = b.add(
            PlanKind::Project {
                columns: vec![
                    (Expr::col("_vertices"), "_vertices".to_string()),
                    (Expr::col("_edges"), "_edges".to_string()),
                ],
            },
            &[lp],
        )?;
        b.set_input_vars(project, vec![subgraph_var])?;
        b.build(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::ExplainOutput;

    #[test]
    fn test_find_path_shape() {
        let plan = FindPath::new(vec![Value::Int(1)], vec![Value::Int(3)], PathKind::BiBfs)
            .with_steps(4)
            .plan()
            .unwrap();
        let root = plan.node(plan.root()).unwrap();
        assert_eq!(root.name(), "DataCollect");
        assert_eq!(root.col_names, vec![PATH_COLUMN]);

        // the loop body is not part of the top-level DAG
        let top: Vec<&str> = plan
            .subplan(plan.root())
            .unwrap()
            .into_iter()
            .map(|id| plan.node(id).unwrap().name())
            .collect();
        assert_eq!(top, vec!["Start", "Start", "Loop", "DataCollect"]);

        let text = ExplainOutput::format(&plan);
        assert!(text.contains("condition: while $__conjunct_more (max 5)"));
        assert!(text.contains("BFSShortestPath"));
    }

    #[test]
    fn test_subgraph_reads_frontier_slot() {
        let plan = GetSubgraph::new(vec![Value::Int(1)], 2).plan().unwrap();
        let gn = plan
            .nodes()
            .iter()
            .find(|n| n.name() == "GetNeighbors")
            .unwrap();
        assert_eq!(gn.input_vars, vec!["__subgraph_frontier"]);
    }
}
