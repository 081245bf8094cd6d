//! Storage access: request building, GetNeighbors and GetVertices
//!
//! A request is a single `_vid` column. The vid representation is fixed per
//! space, so the builders pick a [`VidKey`] type once per call and the per
//! row loop never branches on it.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::context::{Bindings, ExecResult, QueryContext};
use crate::expr::{eval, Expr};
use crate::meta::{SpaceInfo, VidType};
use crate::storage::{EdgeDirection, NEIGHBOR_COLUMNS, VERTEX_COLUMNS};
use crate::value::{DataSet, Row, Value, VID_COLUMN};

use super::error::{ExecutorError, ExecutorResult};
use super::iter::{IterKind, ResultIter};
use super::{ExecOutput, Executor};

/// A vid in its native representation, used for dedup sets
pub trait VidKey: Eq + Hash + Sized {
    /// `None` when `value` is not a vid of this representation
    fn from_value(value: &Value) -> Option<Self>;
}

impl VidKey for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl VidKey for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

fn skip_bad_vid(space: &SpaceInfo, value: &Value) {
    if value.is_null() {
        return;
    }
    warn!(
        space = space.id,
        vid_type = %space.vid_type,
        got = value.type_name(),
        "skipping vid of the wrong type"
    );
}

/// Evaluate `expr` on every row into a `_vid` request
///
/// Values that are not vids of the space's type are skipped. With `dedup`
/// only the first occurrence of each vid is kept; order is otherwise the
/// input order.
pub fn build_request_dataset(
    iter: &mut dyn ResultIter,
    expr: &Expr,
    dedup: bool,
    space: &SpaceInfo,
) -> ExecutorResult<DataSet> {
    match space.vid_type {
        VidType::Int64 => collect_vids::<i64>(iter, expr, dedup, space),
        VidType::String => collect_vids::<String>(iter, expr, dedup, space),
    }
}

fn collect_vids<K: VidKey>(
    iter: &mut dyn ResultIter,
    expr: &Expr,
    dedup: bool,
    space: &SpaceInfo,
) -> ExecutorResult<DataSet> {
    let mut seen: HashSet<K> = HashSet::with_capacity(if dedup { iter.size() } else { 0 });
    let mut ds = DataSet::with_capacity([VID_COLUMN], iter.size());
    while iter.valid() {
        let value = eval(expr, &*iter)?;
        match K::from_value(&value) {
            Some(key) => {
                if !dedup || seen.insert(key) {
                    ds.push(Row::new(vec![value]))?;
                }
            }
            None => skip_bad_vid(space, &value),
        }
        iter.next();
    }
    Ok(ds)
}

/// Every distinct vertex touched by the paths `expr` evaluates to
///
/// Always deduplicated, first appearance first. A value that is not a path
/// is an error.
pub fn build_path_request_dataset(
    iter: &mut dyn ResultIter,
    expr: &Expr,
    space: &SpaceInfo,
) -> ExecutorResult<DataSet> {
    match space.vid_type {
        VidType::Int64 => collect_path_vids::<i64>(iter, expr, space),
        VidType::String => collect_path_vids::<String>(iter, expr, space),
    }
}

fn collect_path_vids<K: VidKey>(
    iter: &mut dyn ResultIter,
    expr: &Expr,
    space: &SpaceInfo,
) -> ExecutorResult<DataSet> {
    let mut seen: HashSet<K> = HashSet::new();
    let mut ds = DataSet::new([VID_COLUMN]);
    while iter.valid() {
        let value = eval(expr, &*iter)?;
        let path = value
            .as_path()
            .ok_or_else(|| ExecutorError::type_mismatch("PATH", &value, "path vids"))?;
        for vid in path.vids() {
            match K::from_value(vid) {
                Some(key) => {
                    if seen.insert(key) {
                        ds.push(Row::new(vec![vid.clone()]))?;
                    }
                }
                None => skip_bad_vid(space, vid),
            }
        }
        iter.next();
    }
    Ok(ds)
}

/// Expand the neighbors of the vertices `src` evaluates to
pub struct GetNeighbors {
    ctx: Arc<QueryContext>,
    input_var: String,
    src: Expr,
    edge_types: Vec<String>,
    direction: EdgeDirection,
    dedup: bool,
}

impl GetNeighbors {
    pub fn new(
        ctx: Arc<QueryContext>,
        input_var: impl Into<String>,
        src: Expr,
        edge_types: Vec<String>,
        direction: EdgeDirection,
        dedup: bool,
    ) -> Self {
        GetNeighbors {
            ctx,
            input_var: input_var.into(),
            src,
            edge_types,
            direction,
            dedup,
        }
    }
}

#[async_trait]
impl Executor for GetNeighbors {
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let space = self.ctx.space();
        let vids = {
            let mut iter = inputs.iter(&self.input_var)?;
            build_request_dataset(iter.as_mut(), &self.src, self.dedup, space)?
        };
        if vids.is_empty() {
            let empty = DataSet::new(NEIGHBOR_COLUMNS);
            return Ok(ExecResult::with_kind(empty, IterKind::GetNeighbors).into());
        }

        let data = self
            .ctx
            .storage()
            .get_neighbors(space, &vids, &self.edge_types, self.direction)
            .await?;
        debug!(
            space = space.id,
            vids = vids.len(),
            rows = data.len(),
            direction = ?self.direction,
            "neighbors fetched"
        );
        Ok(ExecResult::with_kind(data, IterKind::GetNeighbors).into())
    }
}

/// Fetch vertices by id, or every vertex of a set of paths
pub struct GetVertices {
    ctx: Arc<QueryContext>,
    input_var: String,
    src: Expr,
    dedup: bool,
    from_paths: bool,
}

impl GetVertices {
    pub fn new(
        ctx: Arc<QueryContext>,
        input_var: impl Into<String>,
        src: Expr,
        dedup: bool,
        from_paths: bool,
    ) -> Self {
        GetVertices {
            ctx,
            input_var: input_var.into(),
            src,
            dedup,
            from_paths,
        }
    }
}

#[async_trait]
impl Executor for GetVertices {
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let space = self.ctx.space();
        let vids = {
            let mut iter = inputs.iter(&self.input_var)?;
            if self.from_paths {
                build_path_request_dataset(iter.as_mut(), &self.src, space)?
            } else {
                build_request_dataset(iter.as_mut(), &self.src, self.dedup, space)?
            }
        };
        if vids.is_empty() {
            return Ok(ExecResult::new(DataSet::new(VERTEX_COLUMNS)).into());
        }

        let data = self.ctx.storage().get_vertices(space, &vids).await?;
        debug!(space = space.id, vids = vids.len(), rows = data.len(), "vertices fetched");
        Ok(ExecResult::new(data).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::iter::SequentialIter;
    use crate::meta::{MemoryMeta, MetaClient};
    use crate::storage::{MemoryStorage, StorageClient};
    use crate::value::{Edge, Path, Vertex, PATH_COLUMN};

    fn iter_over(col: &str, values: Vec<Value>) -> SequentialIter {
        let rows = values.into_iter().map(|v| Row::new(vec![v])).collect();
        SequentialIter::new(Arc::new(DataSet::from_rows([col], rows).unwrap()))
    }

    fn vids(ds: &DataSet) -> Vec<Value> {
        ds.column(VID_COLUMN).unwrap().cloned().collect()
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        let space = SpaceInfo::new(1, "s", VidType::Int64);
        let values = [3, 1, 3, 2, 1].iter().map(|v| Value::Int(*v)).collect();
        let mut iter = iter_over("v", values);
        let ds = build_request_dataset(&mut iter, &Expr::col("v"), true, &space).unwrap();
        assert_eq!(vids(&ds), vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_no_dedup_keeps_everything() {
        let space = SpaceInfo::new(1, "s", VidType::Int64);
        let values = [1, 1].iter().map(|v| Value::Int(*v)).collect();
        let mut iter = iter_over("v", values);
        let ds = build_request_dataset(&mut iter, &Expr::col("v"), false, &space).unwrap();
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_wrong_type_rows_are_skipped() {
        let space = SpaceInfo::new(1, "s", VidType::String);
        let values = vec![
            Value::from("a"),
            Value::Int(1),
            Value::Null,
            Value::from("b"),
            Value::from("a"),
        ];
        let mut iter = iter_over("v", values);
        let ds = build_request_dataset(&mut iter, &Expr::col("v"), true, &space).unwrap();
        assert_eq!(vids(&ds), vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let space = SpaceInfo::new(1, "s", VidType::Int64);
        let mut iter = iter_over("v", vec![Value::Int(1)]);
        assert!(build_request_dataset(&mut iter, &Expr::col("nope"), true, &space).is_err());
    }

    #[test]
    fn test_path_vids_are_distinct() {
        let space = SpaceInfo::new(1, "s", VidType::Int64);
        let mut p1 = Path::new(Vertex::new(1));
        p1.push_edge(&Edge::new(1, 2, 1, "e", 0));
        p1.push_edge(&Edge::new(2, 1, 1, "e", 0));
        let mut p2 = Path::new(Vertex::new(2));
        p2.push_edge(&Edge::new(2, 3, 1, "e", 0));

        let mut iter = iter_over(PATH_COLUMN, vec![Value::from(p1), Value::from(p2)]);
        let ds = build_path_request_dataset(&mut iter, &Expr::col(PATH_COLUMN), &space).unwrap();
        assert_eq!(vids(&ds), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_path_request_rejects_non_paths() {
        let space = SpaceInfo::new(1, "s", VidType::Int64);
        let mut iter = iter_over(PATH_COLUMN, vec![Value::Int(1)]);
        let err = build_path_request_dataset(&mut iter, &Expr::col(PATH_COLUMN), &space);
        assert!(matches!(err, Err(ExecutorError::TypeMismatch { .. })));
    }

    async fn context() -> Arc<QueryContext> {
        let meta = MemoryMeta::new();
        let space = meta.create_space("s", VidType::Int64);
        assert_eq!(meta.get_space("s").await.unwrap(), space);
        let storage = MemoryStorage::new();
        storage.add_edge(space.id, Edge::new(1, 2, 1, "like", 0));
        storage.add_edge(space.id, Edge::new(1, 3, 1, "like", 0));
        storage.add_vertex(space.id, Vertex::new(4));
        let storage: Arc<dyn StorageClient> = Arc::new(storage);
        Arc::new(QueryContext::new(space, storage, Arc::new(meta)))
    }

    fn bindings(ctx: &QueryContext, values: &[i64]) -> Bindings {
        let rows = values.iter().map(|v| Row::new(vec![Value::Int(*v)])).collect();
        let ds = DataSet::from_rows([VID_COLUMN], rows).unwrap();
        ctx.vars().publish("in", ExecResult::new(ds));
        ctx.vars().snapshot(&["in".to_string()])
    }

    #[tokio::test]
    async fn test_get_neighbors() {
        let ctx = context().await;
        let inputs = bindings(&ctx, &[1, 1, 4]);
        let mut gn = GetNeighbors::new(
            Arc::clone(&ctx),
            "in",
            Expr::col(VID_COLUMN),
            vec![],
            EdgeDirection::Out,
            true,
        );
        let out = gn.execute(&inputs).await.unwrap();
        assert_eq!(out.result.kind(), IterKind::GetNeighbors);
        assert_eq!(out.rows(), 2);

        let mut iter = out.result.iter().unwrap();
        let mut dsts = Vec::new();
        while iter.valid() {
            dsts.push(iter.column("_dst").unwrap());
            iter.next();
        }
        assert_eq!(dsts, vec![Value::Int(2), Value::Int(3), Value::Null]);
    }

    #[tokio::test]
    async fn test_get_neighbors_storage_failure() {
        let meta = MemoryMeta::new();
        let space = meta.create_space("s", VidType::Int64);
        let storage = Arc::new(MemoryStorage::new());
        storage.set_failure(Some("shard down".into()));
        let ctx = Arc::new(QueryContext::new(space, storage, Arc::new(meta)));
        let inputs = bindings(&ctx, &[1]);

        let mut gn = GetNeighbors::new(
            Arc::clone(&ctx),
            "in",
            Expr::col(VID_COLUMN),
            vec![],
            EdgeDirection::Out,
            true,
        );
        assert!(matches!(
            gn.execute(&inputs).await,
            Err(ExecutorError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_get_vertices_from_paths() {
        let ctx = context().await;
        let mut path = Path::new(Vertex::new(1));
        path.push_edge(&Edge::new(1, 2, 1, "like", 0));
        let ds = DataSet::from_rows([PATH_COLUMN], vec![Row::new(vec![Value::from(path)])])
            .unwrap();
        ctx.vars().publish("paths", ExecResult::new(ds));
        let inputs = ctx.vars().snapshot(&["paths".to_string()]);

        let mut gv = GetVertices::new(
            Arc::clone(&ctx),
            "paths",
            Expr::col(PATH_COLUMN),
            true,
            true,
        );
        let out = gv.execute(&inputs).await.unwrap();
        assert_eq!(vids(out.result.data()), vec![Value::Int(1), Value::Int(2)]);
    }
}
