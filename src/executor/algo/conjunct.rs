//! Meeting a forward and a backward search
//!
//! The two inputs are the per-round outputs of a search from the sources
//! and a search from the targets (run over reversed edges). Every round the
//! executor folds both into its state, looks for vertices where the two
//! sides meet and joins the halves into complete paths. A backward half is
//! a walk target -> meeting vertex, so it is reversed before concatenation.
//!
//! Which search feeds the executor depends on the strategy:
//!
//! | strategy     | input operator            |
//! |--------------|---------------------------|
//! | `BiBfs`      | `BfsShortestPath`         |
//! | `BiDijkstra` | `ProduceSemiShortestPath` |
//! | `Floyd`      | `ProduceSemiShortestPath` |
//! | `AllPaths`   | `ProduceAllPaths`         |

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::{Bindings, ExecResult, QueryContext};
use crate::executor::error::{ExecutorError, ExecutorResult};
use crate::executor::iter::{IterKind, ResultIter};
use crate::executor::{ExecOutput, Executor};
use crate::planner::PathKind;
use crate::value::{Edge, Path, Value, Vertex, PATH_COLUMN, VID_COLUMN};

use super::{path_dataset, COST_EPSILON};

/// Length and loop constraints on emitted paths
#[derive(Debug, Clone, Copy)]
struct PathFilter {
    steps: usize,
    no_loop: bool,
}

impl PathFilter {
    /// `fwd` (source -> m) joined with `bwd` (target -> m)
    fn join(&self, fwd: &Path, bwd: &Path) -> Option<Path> {
        let path = fwd.concat(&bwd.reversed())?;
        if path.len() > self.steps || (self.no_loop && path.has_duplicate_vertex()) {
            return None;
        }
        Some(path)
    }
}

/// Outcome of one round
struct Meeting {
    paths: BTreeSet<Path>,
    /// Another round may find more
    more: bool,
}

trait Strategy: Send {
    fn round(
        &mut self,
        round: usize,
        fwd: &mut dyn ResultIter,
        bwd: &mut dyn ResultIter,
        filter: PathFilter,
        ctx: &QueryContext,
    ) -> ExecutorResult<Meeting>;
}

/// The path at the iterator's position; plain tables are read by column
fn path_column(iter: &dyn ResultIter) -> ExecutorResult<Path> {
    if let Some(path) = iter.path() {
        return Ok(path.clone());
    }
    match iter.column(PATH_COLUMN)? {
        Value::Path(p) => Ok(*p),
        other => Err(ExecutorError::type_mismatch("PATH", &other, PATH_COLUMN)),
    }
}

// ============================================================================
// BiBfs - meeting two BFS level maps
// ============================================================================

/// One side of a bidirectional BFS
#[derive(Default)]
struct BfsSide {
    dist: HashMap<Value, usize>,
    preds: HashMap<Value, Vec<Edge>>,
    levels: Vec<Vec<Value>>,
}

impl BfsSide {
    /// Fold a round of `BfsShortestPath` output in; returns the number of
    /// vertices seen for the first time
    fn ingest(&mut self, iter: &mut dyn ResultIter) -> ExecutorResult<usize> {
        let mut fresh = 0;
        while iter.valid() {
            let vid = iter.column(VID_COLUMN)?;
            let dist = match iter.column("_dist")? {
                Value::Int(d) if d >= 0 => d as usize,
                other => return Err(ExecutorError::type_mismatch("INT", &other, "_dist")),
            };
            if !self.dist.contains_key(&vid) {
                self.dist.insert(vid.clone(), dist);
                if self.levels.len() <= dist {
                    self.levels.resize_with(dist + 1, Vec::new);
                }
                self.levels[dist].push(vid.clone());
                fresh += 1;
            }
            if let Value::Edge(edge) = iter.column("_edge")? {
                let edge = *edge;
                let preds = self.preds.entry(vid).or_default();
                if !preds.contains(&edge) {
                    preds.push(edge);
                }
            }
            iter.next();
        }
        Ok(fresh)
    }

    fn level(&self, depth: usize) -> &[Value] {
        self.levels.get(depth).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every shortest walk from a start vertex of this side to `vid`
    fn paths(&self, vid: &Value) -> Vec<Path> {
        match self.dist.get(vid) {
            None => Vec::new(),
            Some(0) => vec![Path::new(Vertex::new(vid.clone()))],
            Some(_) => {
                let mut preds = self.preds.get(vid).cloned().unwrap_or_default();
                preds.sort_by(|a, b| a.key().cmp(&b.key()));
                preds
                    .iter()
                    .flat_map(|edge| {
                        self.paths(&edge.src)
                            .into_iter()
                            .filter_map(move |p| p.extended(edge))
                            .collect::<Vec<_>>()
                    })
                    .collect()
            }
        }
    }
}

#[derive(Default)]
struct BiBfs {
    fwd: BfsSide,
    bwd: BfsSide,
}

impl Strategy for BiBfs {
    fn round(
        &mut self,
        round: usize,
        fwd: &mut dyn ResultIter,
        bwd: &mut dyn ResultIter,
        filter: PathFilter,
        ctx: &QueryContext,
    ) -> ExecutorResult<Meeting> {
        let fresh_f = self.fwd.ingest(fwd)?;
        let fresh_b = self.bwd.ingest(bwd)?;

        let mut paths = BTreeSet::new();
        let mut met = false;
        // odd length first: it is the shorter of the two candidates
        for (fl, bl) in [(round, round - 1), (round, round)] {
            if fl + bl > filter.steps {
                continue;
            }
            let bwd_level: HashSet<&Value> = self.bwd.level(bl).iter().collect();
            for vid in self.fwd.level(fl) {
                if !bwd_level.contains(vid) {
                    continue;
                }
                ctx.check_killed()?;
                met = true;
                let halves = self.bwd.paths(vid);
                for head in self.fwd.paths(vid) {
                    paths.extend(halves.iter().filter_map(|tail| filter.join(&head, tail)));
                }
            }
            if met {
                break;
            }
        }

        let more = !met && 2 * round < filter.steps && fresh_f > 0 && fresh_b > 0;
        Ok(Meeting { paths, more })
    }
}

// ============================================================================
// BiDijkstra, Floyd - meeting two weighted searches
// ============================================================================

/// One side of a weighted bidirectional search
#[derive(Default)]
struct CostSide {
    /// (start vertex, vid) -> (cost, cheapest walks)
    labels: HashMap<(Value, Value), (f64, Vec<Path>)>,
    /// vid -> start vertices labelled at it
    starts_at: HashMap<Value, BTreeSet<Value>>,
    starts: BTreeSet<Value>,
    /// Cheapest label changed last round, per start vertex
    tops: HashMap<Value, f64>,
    top: f64,
}

impl CostSide {
    /// Fold a round of `ProduceSemiShortestPath` output in
    fn ingest(&mut self, iter: &mut dyn ResultIter) -> ExecutorResult<()> {
        let mut touched = HashSet::new();
        self.tops.clear();
        self.top = f64::INFINITY;
        while iter.valid() {
            let vid = iter.column(VID_COLUMN)?;
            let start = iter.column("_src")?;
            let cost_value = iter.column("_cost")?;
            let cost = cost_value
                .as_float()
                .ok_or_else(|| ExecutorError::type_mismatch("FLOAT", &cost_value, "_cost"))?;
            let path = path_column(iter)?;

            let key = (start.clone(), vid.clone());
            if touched.insert(key.clone()) {
                // a changed label replaces what this side knew
                self.labels.insert(key, (cost, vec![path]));
            } else if let Some((_, paths)) = self.labels.get_mut(&key) {
                paths.push(path);
            }
            self.starts_at.entry(vid).or_default().insert(start.clone());
            let top = self.tops.entry(start.clone()).or_insert(f64::INFINITY);
            *top = top.min(cost);
            self.top = self.top.min(cost);
            self.starts.insert(start);
            iter.next();
        }
        Ok(())
    }

    fn cost(&self, start: &Value, vid: &Value) -> Option<f64> {
        self.labels
            .get(&(start.clone(), vid.clone()))
            .map(|(cost, _)| *cost)
    }

    fn paths(&self, start: &Value, vid: &Value) -> &[Path] {
        self.labels
            .get(&(start.clone(), vid.clone()))
            .map(|(_, paths)| paths.as_slice())
            .unwrap_or(&[])
    }

    fn top_of(&self, start: &Value) -> f64 {
        self.tops.get(start).copied().unwrap_or(f64::INFINITY)
    }
}

/// Cheapest meeting per (source, target) pair
fn meetings(fwd: &CostSide, bwd: &CostSide) -> BTreeMap<(Value, Value), (f64, Vec<Value>)> {
    let mut best: BTreeMap<(Value, Value), (f64, Vec<Value>)> = BTreeMap::new();
    for (vid, sources) in &fwd.starts_at {
        let Some(targets) = bwd.starts_at.get(vid) else {
            continue;
        };
        for src in sources {
            for dst in targets {
                if src == dst {
                    continue;
                }
                let (Some(f), Some(b)) = (fwd.cost(src, vid), bwd.cost(dst, vid)) else {
                    continue;
                };
                let cost = f + b;
                let entry = best
                    .entry((src.clone(), dst.clone()))
                    .or_insert((f64::INFINITY, Vec::new()));
                if cost < entry.0 - COST_EPSILON {
                    *entry = (cost, vec![vid.clone()]);
                } else if (cost - entry.0).abs() <= COST_EPSILON {
                    entry.1.push(vid.clone());
                }
            }
        }
    }
    best
}

/// Paths of the pair `(src, dst)` through each meeting vertex in `via`
fn join_pair(
    fwd: &CostSide,
    bwd: &CostSide,
    src: &Value,
    dst: &Value,
    via: &[Value],
    filter: PathFilter,
    paths: &mut BTreeSet<Path>,
) {
    for vid in via {
        let tails = bwd.paths(dst, vid);
        for head in fwd.paths(src, vid) {
            paths.extend(tails.iter().filter_map(|tail| filter.join(head, tail)));
        }
    }
}

#[derive(Default)]
struct BiDijkstra {
    fwd: CostSide,
    bwd: CostSide,
}

impl Strategy for BiDijkstra {
    fn round(
        &mut self,
        round: usize,
        fwd: &mut dyn ResultIter,
        bwd: &mut dyn ResultIter,
        filter: PathFilter,
        ctx: &QueryContext,
    ) -> ExecutorResult<Meeting> {
        self.fwd.ingest(fwd)?;
        self.bwd.ingest(bwd)?;

        let best = meetings(&self.fwd, &self.bwd);
        let mu = best
            .values()
            .map(|(cost, _)| *cost)
            .fold(f64::INFINITY, f64::min);
        let exhausted = self.fwd.top.is_infinite() && self.bwd.top.is_infinite();
        let settled = mu.is_finite() && mu <= self.fwd.top.min(self.bwd.top) + COST_EPSILON;
        let stop = settled || exhausted || 2 * round >= filter.steps;

        let mut paths = BTreeSet::new();
        if stop && mu.is_finite() {
            for ((src, dst), (cost, via)) in &best {
                if (cost - mu).abs() <= COST_EPSILON {
                    ctx.check_killed()?;
                    join_pair(&self.fwd, &self.bwd, src, dst, via, filter, &mut paths);
                }
            }
        }
        debug!(round, mu, stop, "bidirectional dijkstra round");
        Ok(Meeting { paths, more: !stop })
    }
}

#[derive(Default)]
struct Floyd {
    fwd: CostSide,
    bwd: CostSide,
    /// Pairs already answered
    done: HashSet<(Value, Value)>,
}

impl Strategy for Floyd {
    fn round(
        &mut self,
        round: usize,
        fwd: &mut dyn ResultIter,
        bwd: &mut dyn ResultIter,
        filter: PathFilter,
        ctx: &QueryContext,
    ) -> ExecutorResult<Meeting> {
        self.fwd.ingest(fwd)?;
        self.bwd.ingest(bwd)?;

        let best = meetings(&self.fwd, &self.bwd);
        let exhausted = self.fwd.top.is_infinite() && self.bwd.top.is_infinite();
        let last = exhausted || 2 * round >= filter.steps;

        let mut paths = BTreeSet::new();
        let mut pending = 0;
        for src in &self.fwd.starts {
            for dst in &self.bwd.starts {
                let pair = (src.clone(), dst.clone());
                if src == dst || self.done.contains(&pair) {
                    continue;
                }
                let (top_f, top_b) = (self.fwd.top_of(src), self.bwd.top_of(dst));
                match best.get(&pair) {
                    Some((cost, via)) if last || *cost <= top_f.min(top_b) + COST_EPSILON => {
                        ctx.check_killed()?;
                        join_pair(&self.fwd, &self.bwd, src, dst, via, filter, &mut paths);
                        self.done.insert(pair);
                    }
                    None if last || (top_f.is_infinite() && top_b.is_infinite()) => {
                        // neither side can still reach a meeting
                        self.done.insert(pair);
                    }
                    _ => pending += 1,
                }
            }
        }
        debug!(round, pending, "floyd round");
        Ok(Meeting {
            paths,
            more: !last && pending > 0,
        })
    }
}

// ============================================================================
// AllPaths - pairing path halves by length
// ============================================================================

/// One side of an exhaustive search: paths by hop count, then end vertex
#[derive(Default)]
struct PathSide {
    by_len: Vec<HashMap<Value, Vec<Path>>>,
}

impl PathSide {
    fn ingest(&mut self, iter: &mut dyn ResultIter) -> ExecutorResult<usize> {
        let mut count = 0;
        while iter.valid() {
            let path = path_column(iter)?;
            let len = path.len();
            if self.by_len.len() <= len {
                self.by_len.resize_with(len + 1, HashMap::new);
            }
            self.by_len[len]
                .entry(path.last_vid().clone())
                .or_default()
                .push(path);
            count += 1;
            iter.next();
        }
        Ok(count)
    }

    fn ending(&self, len: usize) -> Option<&HashMap<Value, Vec<Path>>> {
        self.by_len.get(len)
    }
}

#[derive(Default)]
struct AllPaths {
    fwd: PathSide,
    bwd: PathSide,
}

impl Strategy for AllPaths {
    fn round(
        &mut self,
        round: usize,
        fwd: &mut dyn ResultIter,
        bwd: &mut dyn ResultIter,
        filter: PathFilter,
        ctx: &QueryContext,
    ) -> ExecutorResult<Meeting> {
        let new_f = self.fwd.ingest(fwd)?;
        let new_b = self.bwd.ingest(bwd)?;

        // a path of length L splits uniquely into ceil(L/2) forward hops
        let mut paths = BTreeSet::new();
        for (fl, bl) in [(round, round - 1), (round, round)] {
            if fl + bl > filter.steps {
                continue;
            }
            let (Some(heads), Some(tails)) = (self.fwd.ending(fl), self.bwd.ending(bl)) else {
                continue;
            };
            for (vid, head_paths) in heads {
                let Some(tail_paths) = tails.get(vid) else {
                    continue;
                };
                ctx.check_killed()?;
                for head in head_paths {
                    paths.extend(tail_paths.iter().filter_map(|tail| filter.join(head, tail)));
                }
            }
        }

        let more = 2 * round < filter.steps && new_f > 0 && new_b > 0;
        Ok(Meeting { paths, more })
    }
}

// ============================================================================
// ConjunctPath - the executor
// ============================================================================

/// ConjunctPath executor
pub struct ConjunctPath {
    ctx: Arc<QueryContext>,
    fwd_var: String,
    bwd_var: String,
    kind: PathKind,
    filter: PathFilter,
    /// Receives whether another round is needed
    conditional_var: Option<String>,
    strategy: Box<dyn Strategy>,
    round: usize,
    emitted: usize,
}

impl ConjunctPath {
    pub fn new(
        ctx: Arc<QueryContext>,
        fwd_var: impl Into<String>,
        bwd_var: impl Into<String>,
        kind: PathKind,
        steps: usize,
        conditional_var: Option<String>,
        no_loop: bool,
    ) -> Self {
        let strategy: Box<dyn Strategy> = match kind {
            PathKind::BiBfs => Box::<BiBfs>::default(),
            PathKind::BiDijkstra => Box::<BiDijkstra>::default(),
            PathKind::Floyd => Box::<Floyd>::default(),
            PathKind::AllPaths => Box::<AllPaths>::default(),
        };
        ConjunctPath {
            ctx,
            fwd_var: fwd_var.into(),
            bwd_var: bwd_var.into(),
            kind,
            filter: PathFilter { steps, no_loop },
            conditional_var,
            strategy,
            round: 0,
            emitted: 0,
        }
    }
}

#[async_trait]
impl Executor for ConjunctPath {
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        self.round += 1;
        self.ctx.check_killed()?;

        let mut fwd = inputs.iter(&self.fwd_var)?;
        let mut bwd = inputs.iter(&self.bwd_var)?;
        let meeting = self.strategy.round(
            self.round,
            fwd.as_mut(),
            bwd.as_mut(),
            self.filter,
            &self.ctx,
        )?;

        self.emitted += meeting.paths.len();
        debug!(
            kind = %self.kind,
            round = self.round,
            found = meeting.paths.len(),
            total = self.emitted,
            more = meeting.more,
            "conjunct round"
        );

        let paths = path_dataset(meeting.paths)?;
        let mut out = ExecOutput::new(ExecResult::with_kind(paths, IterKind::Path));
        if let Some(var) = &self.conditional_var {
            out = out.with_var(var.clone(), ExecResult::scalar(meeting.more));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::algo::testing::{
        bind_neighbors, bind_results, context, edges, expand, path, vids_of,
    };
    use crate::executor::algo::{BfsShortestPath, ProduceAllPaths, ProduceSemiShortestPath};
    use crate::storage::EdgeDirection;

    /// Drives a forward and a backward search over `graph` and meets them,
    /// feeding each side's output back as its next frontier
    struct Harness {
        graph: Vec<Edge>,
        fwd: Box<dyn Executor>,
        bwd: Box<dyn Executor>,
        conjunct: ConjunctPath,
        frontier: (Vec<i64>, Vec<i64>),
    }

    impl Harness {
        fn new(graph: Vec<Edge>, kind: PathKind, steps: usize, from: i64, to: i64) -> Self {
            let ctx = context();
            let search = |ctx: &Arc<QueryContext>| -> Box<dyn Executor> {
                match kind {
                    PathKind::BiBfs => Box::new(BfsShortestPath::new(
                        Arc::clone(ctx),
                        "gn",
                        steps,
                        vec![],
                        None,
                    )),
                    PathKind::AllPaths => {
                        Box::new(ProduceAllPaths::new(Arc::clone(ctx), "gn", false))
                    }
                    _ => Box::new(ProduceSemiShortestPath::new(Arc::clone(ctx), "gn")),
                }
            };
            Harness {
                graph,
                fwd: search(&ctx),
                bwd: search(&ctx),
                conjunct: ConjunctPath::new(
                    Arc::clone(&ctx),
                    "fwd",
                    "bwd",
                    kind,
                    steps,
                    Some("more".into()),
                    false,
                ),
                frontier: (vec![from], vec![to]),
            }
        }

        async fn side(
            exec: &mut Box<dyn Executor>,
            graph: &[Edge],
            vids: &[i64],
            direction: EdgeDirection,
        ) -> (ExecResult, Vec<i64>) {
            let out = exec
                .execute(&bind_neighbors("gn", expand(graph, vids, direction)))
                .await
                .unwrap();
            let mut next: Vec<i64> = out
                .result
                .data()
                .column(VID_COLUMN)
                .unwrap()
                .filter_map(Value::as_int)
                .collect();
            next.sort();
            next.dedup();
            (out.result, next)
        }

        /// One round; returns the paths found and whether to continue
        async fn round(&mut self) -> (Vec<Vec<i64>>, bool) {
            let (f, next_f) =
                Self::side(&mut self.fwd, &self.graph, &self.frontier.0, EdgeDirection::Out).await;
            let (b, next_b) =
                Self::side(&mut self.bwd, &self.graph, &self.frontier.1, EdgeDirection::In).await;
            self.frontier = (next_f, next_b);

            let out = self
                .conjunct
                .execute(&bind_results(vec![("fwd", f), ("bwd", b)]))
                .await
                .unwrap();
            assert_eq!(out.result.kind(), IterKind::Path);
            let paths = out
                .result
                .data()
                .column(PATH_COLUMN)
                .unwrap()
                .map(|v| vids_of(v.as_path().unwrap()))
                .collect();
            (paths, out.extra[0].1.is_true())
        }

        async fn run(&mut self) -> Vec<Vec<i64>> {
            let mut found = Vec::new();
            for _ in 0..10 {
                let (paths, more) = self.round().await;
                found.extend(paths);
                if !more {
                    break;
                }
            }
            found.sort();
            found
        }
    }

    #[tokio::test]
    async fn test_bibfs_odd_and_even_lengths() {
        let graph = edges(&[(1, 2, None), (2, 3, None), (3, 4, None)]);
        let found = Harness::new(graph.clone(), PathKind::BiBfs, 5, 1, 4).run().await;
        assert_eq!(found, vec![vec![1, 2, 3, 4]]);

        let found = Harness::new(graph, PathKind::BiBfs, 5, 1, 3).run().await;
        assert_eq!(found, vec![vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn test_bibfs_keeps_equal_length_paths() {
        let graph = edges(&[(1, 2, None), (1, 3, None), (2, 4, None), (3, 4, None)]);
        let found = Harness::new(graph, PathKind::BiBfs, 5, 1, 4).run().await;
        assert_eq!(found, vec![vec![1, 2, 4], vec![1, 3, 4]]);
    }

    #[tokio::test]
    async fn test_bibfs_respects_step_bound() {
        let graph = edges(&[(1, 2, None), (2, 3, None), (3, 4, None)]);
        let found = Harness::new(graph, PathKind::BiBfs, 2, 1, 4).run().await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_bidijkstra_prefers_cheap_detour() {
        let graph = edges(&[(1, 3, Some(5.0)), (1, 2, Some(1.0)), (2, 3, Some(1.0))]);
        let found = Harness::new(graph, PathKind::BiDijkstra, 6, 1, 3).run().await;
        assert_eq!(found, vec![vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn test_floyd_single_pair() {
        let graph = edges(&[(1, 2, None), (2, 3, None), (1, 3, Some(3.0))]);
        let found = Harness::new(graph, PathKind::Floyd, 6, 1, 3).run().await;
        assert_eq!(found, vec![vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn test_all_paths_within_bound() {
        let graph = edges(&[(1, 2, None), (2, 3, None), (1, 3, None), (3, 4, None)]);
        let found = Harness::new(graph.clone(), PathKind::AllPaths, 2, 1, 3).run().await;
        assert_eq!(found, vec![vec![1, 2, 3], vec![1, 3]]);

        let found = Harness::new(graph, PathKind::AllPaths, 1, 1, 3).run().await;
        assert_eq!(found, vec![vec![1, 3]]);
    }

    #[test]
    fn test_filter_rejects_loops() {
        let filter = PathFilter {
            steps: 10,
            no_loop: true,
        };
        let head = path(&[1, 2, 3]);
        let joined = filter.join(&head, &path(&[4, 3])).unwrap();
        assert_eq!(vids_of(&joined), vec![1, 2, 3, 4]);
        // 1 -> 2 -> 3 -> 2
        assert!(filter.join(&head, &path(&[2, 3])).is_none());

        let short = PathFilter {
            steps: 2,
            no_loop: false,
        };
        assert!(short.join(&head, &path(&[4, 3])).is_none());
    }
}
