//! Incremental weighted shortest paths from many sources
//!
//! Every vertex expanded in the first round becomes a source. Each later
//! round relaxes the edges of the newly expanded frontier and reports the
//! (source, vertex) labels whose cost dropped or gained an equal-cost
//! predecessor. A label that gained one also grows the path sets of every
//! label reached through it, so those are reported again. Costs only ever
//! decrease, so the predecessor graph stays acyclic and every label's paths
//! can be rebuilt by walking it back.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::{Bindings, ExecResult, QueryContext};
use crate::value::{DataSet, Edge, Path, Row, Value, Vertex, PATH_COLUMN, VID_COLUMN};

use super::{edge_weight, neighbors, COST_EPSILON};
use crate::executor::error::ExecutorResult;
use crate::executor::iter::IterKind;
use crate::executor::{ExecOutput, Executor};

#[derive(Debug)]
struct Label {
    cost: f64,
    /// Last hops of the cheapest walks, ordered by edge key
    preds: Vec<Edge>,
}

type LabelKey = (Value, Value);

/// Label changes made during one round
#[derive(Default)]
struct RoundChanges {
    /// Labels to publish
    changed: BTreeSet<LabelKey>,
    /// Labels that gained an equally cheap predecessor
    grown: BTreeSet<LabelKey>,
    lowered: HashSet<LabelKey>,
}

/// ProduceSemiShortestPath executor
pub struct ProduceSemiShortestPath {
    ctx: Arc<QueryContext>,
    input_var: String,
    labels: HashMap<LabelKey, Label>,
    /// vertex -> sources holding a label at it
    sources_at: HashMap<Value, BTreeSet<Value>>,
    round: usize,
}

impl ProduceSemiShortestPath {
    pub fn new(ctx: Arc<QueryContext>, input_var: impl Into<String>) -> Self {
        ProduceSemiShortestPath {
            ctx,
            input_var: input_var.into(),
            labels: HashMap::new(),
            sources_at: HashMap::new(),
            round: 0,
        }
    }

    fn seed(&mut self, vid: &Value, changes: &mut RoundChanges) {
        let key = (vid.clone(), vid.clone());
        if self.labels.contains_key(&key) {
            return;
        }
        self.labels.insert(
            key.clone(),
            Label {
                cost: 0.0,
                preds: Vec::new(),
            },
        );
        self.sources_at
            .entry(vid.clone())
            .or_default()
            .insert(vid.clone());
        changes.changed.insert(key);
    }

    fn relax(&mut self, src: Value, edge: &Edge, cost: f64, changes: &mut RoundChanges) {
        let key = (src, edge.dst.clone());
        match self.labels.get_mut(&key) {
            Some(label) if cost < label.cost - COST_EPSILON => {
                label.cost = cost;
                label.preds = vec![edge.clone()];
                changes.lowered.insert(key.clone());
                changes.changed.insert(key);
            }
            Some(label) if (cost - label.cost).abs() <= COST_EPSILON => {
                if let Err(pos) = label.preds.binary_search_by(|p| p.key().cmp(&edge.key())) {
                    label.preds.insert(pos, edge.clone());
                    changes.grown.insert(key.clone());
                    changes.changed.insert(key);
                }
            }
            Some(_) => {}
            None => {
                self.sources_at
                    .entry(edge.dst.clone())
                    .or_default()
                    .insert(key.0.clone());
                self.labels.insert(
                    key.clone(),
                    Label {
                        cost,
                        preds: vec![edge.clone()],
                    },
                );
                changes.changed.insert(key);
            }
        }
    }

    /// Mark every label whose walks run through a grown label
    ///
    /// A lowered label's successors are left alone: their costs are stale
    /// until the lowered vertex is expanded again.
    fn propagate_ties(&self, changes: &mut RoundChanges) {
        let mut queue: Vec<LabelKey> = changes
            .grown
            .iter()
            .filter(|key| !changes.lowered.contains(*key))
            .cloned()
            .collect();
        if queue.is_empty() {
            return;
        }

        let mut children: HashMap<(&Value, &Value), Vec<&Value>> = HashMap::new();
        for ((src, vid), label) in &self.labels {
            for edge in &label.preds {
                children.entry((src, &edge.src)).or_default().push(vid);
            }
        }
        while let Some((src, vid)) = queue.pop() {
            let Some(next) = children.get(&(&src, &vid)) else {
                continue;
            };
            for child in next {
                let key = (src.clone(), (*child).clone());
                if changes.lowered.contains(&key) {
                    continue;
                }
                if changes.changed.insert(key.clone()) {
                    queue.push(key);
                }
            }
        }
    }

    /// Every cheapest walk from `src` to `vid`
    fn paths_to(&self, src: &Value, vid: &Value) -> Vec<Path> {
        let Some(label) = self.labels.get(&(src.clone(), vid.clone())) else {
            return Vec::new();
        };
        if label.preds.is_empty() {
            return vec![Path::new(Vertex::new(vid.clone()))];
        }
        let mut paths = Vec::new();
        for edge in &label.preds {
            for prefix in self.paths_to(src, &edge.src) {
                if let Some(path) = prefix.extended(edge) {
                    paths.push(path);
                }
            }
        }
        paths
    }
}

#[async_trait]
impl Executor for ProduceSemiShortestPath {
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        self.round += 1;
        self.ctx.check_killed()?;

        let mut changes = RoundChanges::default();
        if self.round == 1 {
            let mut iter = neighbors(inputs, &self.input_var)?;
            while iter.valid() {
                if let Some(vertex) = iter.vertex() {
                    let vid = vertex.vid.clone();
                    self.seed(&vid, &mut changes);
                }
                iter.next();
            }
        }

        let mut iter = neighbors(inputs, &self.input_var)?;
        while iter.valid() {
            if let (Some(vertex), Some(edge)) = (iter.vertex(), iter.edge()) {
                let weight = edge_weight(edge)?;
                let sources: Vec<Value> = self
                    .sources_at
                    .get(&vertex.vid)
                    .map(|s| s.iter().cloned().collect())
                    .unwrap_or_default();
                for src in sources {
                    let base = match self.labels.get(&(src.clone(), vertex.vid.clone())) {
                        Some(label) => label.cost,
                        None => continue,
                    };
                    self.relax(src, edge, base + weight, &mut changes);
                }
            }
            iter.next();
        }

        self.propagate_ties(&mut changes);
        let changed = changes.changed;

        let mut ds = DataSet::new([VID_COLUMN, "_src", "_cost", PATH_COLUMN]);
        for (src, vid) in &changed {
            self.ctx.check_killed()?;
            let cost = self
                .labels
                .get(&(src.clone(), vid.clone()))
                .map_or(f64::INFINITY, |l| l.cost);
            for path in self.paths_to(src, vid) {
                ds.push(Row::new(vec![
                    vid.clone(),
                    src.clone(),
                    Value::Float(cost),
                    Value::from(path),
                ]))?;
            }
        }
        debug!(
            round = self.round,
            changed = changed.len(),
            labels = self.labels.len(),
            "semi-shortest round"
        );
        Ok(ExecResult::with_kind(ds, IterKind::Path).into())
    }
}
