//! Plan node model
//!
//! A plan is an arena of [`PlanNode`]s addressed by [`NodeId`]. Each node
//! carries a closed [`PlanKind`] payload, the ids of the nodes it depends on,
//! the variables it reads and the variable it writes.
//!
//! Dependencies never cross a loop boundary: nodes inside a loop body only
//! depend on other body nodes. Values produced outside the loop are read
//! through input variables, and the producers are dependencies of the
//! `Loop` node itself.

use std::fmt;

use crate::expr::Expr;
use crate::meta::TagIndexDef;
use crate::storage::{EdgeDirection, NEIGHBOR_COLUMNS, VERTEX_COLUMNS};
use crate::value::{DataSet, Value, PATH_COLUMN, VID_COLUMN};

use super::error::{PlannerError, PlannerResult};

/// Index of a node in its plan
pub type NodeId = usize;

/// Strategy of a bidirectional path conjunction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Meet two BFS searches
    BiBfs,
    /// Meet two weighted searches; globally shortest paths
    BiDijkstra,
    /// Meet two weighted searches; shortest paths per source/target pair
    Floyd,
    /// Enumerate every meeting path up to the step bound
    AllPaths,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKind::BiBfs => write!(f, "BiBFS"),
            PathKind::BiDijkstra => write!(f, "BiDijkstra"),
            PathKind::Floyd => write!(f, "Floyd"),
            PathKind::AllPaths => write!(f, "AllPaths"),
        }
    }
}

/// When a loop runs its body again
///
/// Conditions are checked after every round, so the body runs at least once
/// (unless `Times(0)`). `max` caps the number of rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCondition {
    /// Exactly `n` rounds
    Times(usize),
    /// Keep going while `var` holds `true`
    While { var: String, max: usize },
    /// Stop as soon as `var` holds `true`
    Until { var: String, max: usize },
}

impl fmt::Display for LoopCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopCondition::Times(n) => write!(f, "times={}", n),
            LoopCondition::While { var, max } => write!(f, "while ${} (max {})", var, max),
            LoopCondition::Until { var, max } => write!(f, "until ${} (max {})", var, max),
        }
    }
}

/// Input variables of a cartesian product, each with its column names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartesianVars {
    vars: Vec<(String, Vec<String>)>,
}

impl CartesianVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factor; the same variable may not appear twice
    pub fn add_var(&mut self, var: impl Into<String>, col_names: Vec<String>) -> PlannerResult<()> {
        let var = var.into();
        if self.vars.iter().any(|(v, _)| *v == var) {
            return Err(PlannerError::InvalidPlan(format!(
                "variable `{}' added to cartesian product twice",
                var
            )));
        }
        self.vars.push((var, col_names));
        Ok(())
    }

    pub fn input_vars(&self) -> Vec<String> {
        self.vars.iter().map(|(v, _)| v.clone()).collect()
    }

    pub fn all_col_names(&self) -> Vec<&[String]> {
        self.vars.iter().map(|(_, c)| c.as_slice()).collect()
    }

    /// Output schema: every factor's columns, in factor order
    pub fn col_names(&self) -> Vec<String> {
        self.vars.iter().flat_map(|(_, c)| c.iter().cloned()).collect()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Variable names of the four subgraph slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubgraphSlots {
    /// Frontier for the next expansion; the start vertices are seeded here
    pub one_more_step_input: String,
    /// Boundary edges found by the extra round
    pub one_more_step_output: String,
    /// Whether the next round is the extra round
    pub is_one_more_step: String,
    /// Set once expansion is over; the loop terminator
    pub last_step: String,
}

impl SubgraphSlots {
    /// Slot names derived from a common prefix
    pub fn with_prefix(prefix: &str) -> Self {
        SubgraphSlots {
            one_more_step_input: format!("{}_frontier", prefix),
            one_more_step_output: format!("{}_boundary", prefix),
            is_one_more_step: format!("{}_one_more_step", prefix),
            last_step: format!("{}_last_step", prefix),
        }
    }
}

/// Kind-specific payload of a plan node
#[derive(Debug, Clone, PartialEq)]
pub enum PlanKind {
    /// Leaf; publishes `seed` (or an empty DataSet)
    Start { seed: Option<DataSet> },
    /// Repeat the sub-plan rooted at `body`
    Loop {
        body: NodeId,
        condition: LoopCondition,
    },

    /// Expand neighbors of the vertices `src` evaluates to
    GetNeighbors {
        src: Expr,
        edge_types: Vec<String>,
        direction: EdgeDirection,
        dedup: bool,
    },
    /// Fetch vertices; with `from_paths`, `src` yields paths whose vertices are fetched
    GetVertices {
        src: Expr,
        dedup: bool,
        from_paths: bool,
    },

    /// Evaluate expressions into named columns
    Project { columns: Vec<(Expr, String)> },
    /// Drop repeated rows, keeping first occurrences
    Dedup,
    /// Concatenate every version of the input variable
    DataCollect,

    /// Hash join; the first input is probed, the second is the build side
    InnerJoin {
        left_keys: Vec<Expr>,
        right_keys: Vec<Expr>,
    },
    /// As `InnerJoin`, but unmatched left rows are kept with null padding
    LeftJoin {
        left_keys: Vec<Expr>,
        right_keys: Vec<Expr>,
    },

    ProduceSemiShortestPath,
    BfsShortestPath {
        steps: usize,
        targets: Vec<Value>,
        continue_var: Option<String>,
    },
    /// Two inputs: forward then backward search results
    ConjunctPath {
        kind: PathKind,
        steps: usize,
        conditional_var: Option<String>,
        no_loop: bool,
    },
    ProduceAllPaths { no_loop: bool },
    Subgraph { steps: usize, slots: SubgraphSlots },
    CartesianProduct { vars: CartesianVars },

    CreateTagIndex {
        def: TagIndexDef,
        if_not_exists: bool,
    },
    DropTagIndex { name: String, if_exists: bool },
    DescTagIndex { name: String },
    ShowCreateTagIndex { name: String },
    ShowTagIndexes,
    ShowTagIndexStatus,
}

impl PlanKind {
    /// Operator name, used for display and generated variable names
    pub fn name(&self) -> &'static str {
        match self {
            PlanKind::Start { .. } => "Start",
            PlanKind::Loop { .. } => "Loop",
            PlanKind::GetNeighbors { .. } => "GetNeighbors",
            PlanKind::GetVertices { .. } => "GetVertices",
            PlanKind::Project { .. } => "Project",
            PlanKind::Dedup => "Dedup",
            PlanKind::DataCollect => "DataCollect",
            PlanKind::InnerJoin { .. } => "InnerJoin",
            PlanKind::LeftJoin { .. } => "LeftJoin",
            PlanKind::ProduceSemiShortestPath => "ProduceSemiShortestPath",
            PlanKind::BfsShortestPath { .. } => "BFSShortestPath",
            PlanKind::ConjunctPath { .. } => "ConjunctPath",
            PlanKind::ProduceAllPaths { .. } => "ProduceAllPaths",
            PlanKind::Subgraph { .. } => "Subgraph",
            PlanKind::CartesianProduct { .. } => "CartesianProduct",
            PlanKind::CreateTagIndex { .. } => "CreateTagIndex",
            PlanKind::DropTagIndex { .. } => "DropTagIndex",
            PlanKind::DescTagIndex { .. } => "DescTagIndex",
            PlanKind::ShowCreateTagIndex { .. } => "ShowCreateTagIndex",
            PlanKind::ShowTagIndexes => "ShowTagIndexes",
            PlanKind::ShowTagIndexStatus => "ShowTagIndexStatus",
        }
    }

    /// Control-flow nodes do not occupy a worker while they wait
    pub fn is_control_flow(&self) -> bool {
        matches!(self, PlanKind::Start { .. } | PlanKind::Loop { .. })
    }

    /// Output columns that do not depend on the inputs, if any
    pub fn fixed_col_names(&self) -> Option<Vec<String>> {
        let cols: Vec<&str> = match self {
            PlanKind::Start { seed } => {
                return Some(seed.as_ref().map(|s| s.col_names().to_vec()).unwrap_or_default())
            }
            PlanKind::Loop { .. } | PlanKind::CreateTagIndex { .. } | PlanKind::DropTagIndex { .. } => {
                vec![]
            }
            PlanKind::GetNeighbors { .. } => NEIGHBOR_COLUMNS.to_vec(),
            PlanKind::GetVertices { .. } => VERTEX_COLUMNS.to_vec(),
            PlanKind::Project { columns } => {
                return Some(columns.iter().map(|(_, alias)| alias.clone()).collect())
            }
            PlanKind::ProduceSemiShortestPath => vec![VID_COLUMN, "_src", "_cost", PATH_COLUMN],
            PlanKind::BfsShortestPath { .. } => vec![VID_COLUMN, "_dist", "_edge"],
            PlanKind::ConjunctPath { .. } => vec![PATH_COLUMN],
            PlanKind::ProduceAllPaths { .. } => vec![VID_COLUMN, PATH_COLUMN],
            PlanKind::Subgraph { .. } => vec!["_vertices", "_edges"],
            PlanKind::CartesianProduct { vars } => return Some(vars.col_names()),
            PlanKind::DescTagIndex { .. } => vec!["Field", "Type"],
            PlanKind::ShowCreateTagIndex { .. } => vec!["Tag Index Name", "Create Tag Index"],
            PlanKind::ShowTagIndexes => vec!["Names"],
            PlanKind::ShowTagIndexStatus => vec!["Name", "Index Status"],
            PlanKind::Dedup
            | PlanKind::DataCollect
            | PlanKind::InnerJoin { .. }
            | PlanKind::LeftJoin { .. } => return None,
        };
        Some(cols.into_iter().map(String::from).collect())
    }
}

/// One node of an execution plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub id: NodeId,
    pub kind: PlanKind,
    /// Nodes that must finish before this one starts
    pub deps: Vec<NodeId>,
    /// Variables read, in operator-defined order
    pub input_vars: Vec<String>,
    /// Variable written
    pub output_var: String,
    pub col_names: Vec<String>,
}

impl PlanNode {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// The `i`-th input variable
    pub fn input_var(&self, i: usize) -> PlannerResult<&str> {
        self.input_vars.get(i).map(String::as_str).ok_or_else(|| {
            PlannerError::InvalidPlan(format!(
                "{} node {} has no input variable #{}",
                self.name(),
                self.id,
                i
            ))
        })
    }
}
