//! Result iterators
//!
//! Operators never walk DataSets directly: they ask a published result for
//! an iterator whose kind matches the shape of the data. Iterators are
//! single-pass and forward-only; to re-scan, take a fresh one.

use std::sync::Arc;

use crate::value::{DataSet, Edge, Path, Row, Value, Vertex, PATH_COLUMN};

use super::error::{ExecutorError, ExecutorResult};

/// Column names exposed by [`GetNeighborsIter`]
pub const NEIGHBOR_ITER_COLUMNS: [&str; 7] =
    ["_vid", "_vertex", "_edge", "_src", "_dst", "_type", "_rank"];

/// Shape of the data behind an iterator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IterKind {
    /// One position per row
    #[default]
    Sequential,
    /// One position per (vertex, edge) of a neighbor-expansion response
    GetNeighbors,
    /// One position per row of a `_path` DataSet
    Path,
    /// Left row joined with a right row or null padding
    Join,
}

/// Forward-only cursor over a result
pub trait ResultIter: Send {
    fn kind(&self) -> IterKind;

    /// Whether the cursor points at a row
    fn valid(&self) -> bool;

    /// Advance to the next position
    fn next(&mut self);

    /// Number of positions, for pre-sizing outputs
    fn size(&self) -> usize;

    /// Column names of the projected row
    fn col_names(&self) -> Vec<String>;

    /// The current position projected to a row
    fn row(&self) -> ExecutorResult<Row>;

    /// One column of the current position
    fn column(&self, name: &str) -> ExecutorResult<Value>;

    /// Vertex at the current position, if the shape has one
    fn vertex(&self) -> Option<&Vertex> {
        None
    }

    /// Edge at the current position, if the shape has one
    fn edge(&self) -> Option<&Edge> {
        None
    }

    /// Path at the current position, if the shape has one
    fn path(&self) -> Option<&Path> {
        None
    }
}

fn exhausted() -> ExecutorError {
    ExecutorError::Internal("iterator read past its end".to_string())
}

/// Iterator over the rows of a DataSet
pub struct SequentialIter {
    data: Arc<DataSet>,
    pos: usize,
}

impl SequentialIter {
    pub fn new(data: Arc<DataSet>) -> Self {
        SequentialIter { data, pos: 0 }
    }

    fn current(&self) -> ExecutorResult<&Row> {
        self.data.rows().get(self.pos).ok_or_else(exhausted)
    }
}

impl ResultIter for SequentialIter {
    fn kind(&self) -> IterKind {
        IterKind::Sequential
    }

    fn valid(&self) -> bool {
        self.pos < self.data.len()
    }

    fn next(&mut self) {
        self.pos += 1;
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn col_names(&self) -> Vec<String> {
        self.data.col_names().to_vec()
    }

    fn row(&self) -> ExecutorResult<Row> {
        self.current().cloned()
    }

    fn column(&self, name: &str) -> ExecutorResult<Value> {
        let idx = self
            .data
            .column_index(name)
            .ok_or_else(|| ExecutorError::ColumnNotFound(name.to_string()))?;
        Ok(self.current()?.get(idx)?.clone())
    }

    fn vertex(&self) -> Option<&Vertex> {
        let idx = self.data.column_index("_vertex")?;
        self.data.rows().get(self.pos)?.get_opt(idx)?.as_vertex()
    }

    fn edge(&self) -> Option<&Edge> {
        let idx = self.data.column_index("_edge")?;
        self.data.rows().get(self.pos)?.get_opt(idx)?.as_edge()
    }
}

/// Iterator over a neighbor-expansion response
///
/// A vertex with edges yields one position per edge; a vertex without
/// edges yields a single position whose `edge()` is `None`.
pub struct GetNeighborsIter {
    data: Arc<DataSet>,
    vertex_col: usize,
    edges_col: usize,
    /// (row index, edge index within the row's edge list)
    positions: Vec<(usize, Option<usize>)>,
    pos: usize,
}

impl GetNeighborsIter {
    pub fn new(data: Arc<DataSet>) -> ExecutorResult<Self> {
        let vertex_col = data
            .column_index("_vertex")
            .ok_or_else(|| ExecutorError::ColumnNotFound("_vertex".to_string()))?;
        let edges_col = data
            .column_index("_edges")
            .ok_or_else(|| ExecutorError::ColumnNotFound("_edges".to_string()))?;

        let mut positions = Vec::with_capacity(data.len());
        for (r, row) in data.rows().iter().enumerate() {
            let edges = row.get(edges_col)?;
            let n = match edges {
                Value::List(list) => list.len(),
                Value::Null => 0,
                other => return Err(ExecutorError::type_mismatch("LIST", other, "_edges")),
            };
            if n == 0 {
                positions.push((r, None));
            } else {
                positions.extend((0..n).map(|e| (r, Some(e))));
            }
        }

        Ok(GetNeighborsIter {
            data,
            vertex_col,
            edges_col,
            positions,
            pos: 0,
        })
    }

    fn position(&self) -> ExecutorResult<(usize, Option<usize>)> {
        self.positions.get(self.pos).copied().ok_or_else(exhausted)
    }

    fn edge_field(&self, f: impl FnOnce(&Edge) -> Value) -> Value {
        self.edge().map(f).unwrap_or(Value::Null)
    }
}

impl ResultIter for GetNeighborsIter {
    fn kind(&self) -> IterKind {
        IterKind::GetNeighbors
    }

    fn valid(&self) -> bool {
        self.pos < self.positions.len()
    }

    fn next(&mut self) {
        self.pos += 1;
    }

    fn size(&self) -> usize {
        self.positions.len()
    }

    fn col_names(&self) -> Vec<String> {
        NEIGHBOR_ITER_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn row(&self) -> ExecutorResult<Row> {
        NEIGHBOR_ITER_COLUMNS
            .iter()
            .map(|c| self.column(c))
            .collect::<ExecutorResult<Vec<_>>>()
            .map(Row::new)
    }

    fn column(&self, name: &str) -> ExecutorResult<Value> {
        self.position()?;
        let value = match name {
            "_vid" => self
                .vertex()
                .map(|v| v.vid.clone())
                .unwrap_or(Value::Null),
            "_vertex" => self
                .vertex()
                .map(|v| Value::from(v.clone()))
                .unwrap_or(Value::Null),
            "_edge" => self.edge_field(|e| Value::from(e.clone())),
            "_src" => self.edge_field(|e| e.src.clone()),
            "_dst" => self.edge_field(|e| e.dst.clone()),
            "_type" => self.edge_field(|e| Value::Int(i64::from(e.etype))),
            "_rank" => self.edge_field(|e| Value::Int(e.ranking)),
            _ => return Err(ExecutorError::ColumnNotFound(name.to_string())),
        };
        Ok(value)
    }

    fn vertex(&self) -> Option<&Vertex> {
        let (r, _) = self.positions.get(self.pos)?;
        self.data.rows()[*r].get_opt(self.vertex_col)?.as_vertex()
    }

    fn edge(&self) -> Option<&Edge> {
        let (r, e) = self.positions.get(self.pos)?;
        let list = self.data.rows()[*r].get_opt(self.edges_col)?.as_list()?;
        list.get((*e)?)?.as_edge()
    }
}

/// Iterator over a DataSet carrying a `_path` column
pub struct PathIter {
    inner: SequentialIter,
    path_col: usize,
}

impl PathIter {
    pub fn new(data: Arc<DataSet>) -> ExecutorResult<Self> {
        let path_col = data
            .column_index(PATH_COLUMN)
            .ok_or_else(|| ExecutorError::ColumnNotFound(PATH_COLUMN.to_string()))?;
        Ok(PathIter {
            inner: SequentialIter::new(data),
            path_col,
        })
    }
}

impl ResultIter for PathIter {
    fn kind(&self) -> IterKind {
        IterKind::Path
    }

    fn valid(&self) -> bool {
        self.inner.valid()
    }

    fn next(&mut self) {
        self.inner.next();
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn col_names(&self) -> Vec<String> {
        self.inner.col_names()
    }

    fn row(&self) -> ExecutorResult<Row> {
        self.inner.row()
    }

    fn column(&self, name: &str) -> ExecutorResult<Value> {
        self.inner.column(name)
    }

    fn path(&self) -> Option<&Path> {
        self.inner
            .data
            .rows()
            .get(self.inner.pos)?
            .get_opt(self.path_col)?
            .as_path()
    }
}

/// Lazy join of two DataSets
///
/// Each position pairs a left row with a right row, or with nulls sized to
/// the right schema when the right index is `None`.
pub struct JoinIter {
    left: Arc<DataSet>,
    right: Arc<DataSet>,
    pairs: Vec<(usize, Option<usize>)>,
    pos: usize,
}

impl JoinIter {
    pub fn new(left: Arc<DataSet>, right: Arc<DataSet>, pairs: Vec<(usize, Option<usize>)>) -> Self {
        JoinIter {
            left,
            right,
            pairs,
            pos: 0,
        }
    }

    /// Materialize every joined row into a DataSet
    pub fn materialize(mut self) -> ExecutorResult<DataSet> {
        let mut ds = DataSet::with_capacity(self.col_names(), self.size());
        while self.valid() {
            ds.push(self.row()?)?;
            self.next();
        }
        Ok(ds)
    }

    fn pair(&self) -> ExecutorResult<(usize, Option<usize>)> {
        self.pairs.get(self.pos).copied().ok_or_else(exhausted)
    }
}

impl ResultIter for JoinIter {
    fn kind(&self) -> IterKind {
        IterKind::Join
    }

    fn valid(&self) -> bool {
        self.pos < self.pairs.len()
    }

    fn next(&mut self) {
        self.pos += 1;
    }

    fn size(&self) -> usize {
        self.pairs.len()
    }

    fn col_names(&self) -> Vec<String> {
        self.left
            .col_names()
            .iter()
            .chain(self.right.col_names())
            .cloned()
            .collect()
    }

    fn row(&self) -> ExecutorResult<Row> {
        let (l, r) = self.pair()?;
        let left = &self.left.rows()[l];
        let right = match r {
            Some(r) => self.right.rows()[r].clone(),
            None => Row::nulls(self.right.width()),
        };
        Ok(Row::concat_ref(left, &right))
    }

    fn column(&self, name: &str) -> ExecutorResult<Value> {
        let (l, r) = self.pair()?;
        if let Some(idx) = self.left.column_index(name) {
            return Ok(self.left.rows()[l].get(idx)?.clone());
        }
        let idx = self
            .right
            .column_index(name)
            .ok_or_else(|| ExecutorError::ColumnNotFound(name.to_string()))?;
        match r {
            Some(r) => Ok(self.right.rows()[r].get(idx)?.clone()),
            None => Ok(Value::Null),
        }
    }
}

/// Create an iterator of the requested kind over `data`
///
/// A join result is already materialized once published, so it is read
/// back sequentially.
pub fn make_iter(data: Arc<DataSet>, kind: IterKind) -> ExecutorResult<Box<dyn ResultIter>> {
    Ok(match kind {
        IterKind::Sequential | IterKind::Join => Box::new(SequentialIter::new(data)),
        IterKind::GetNeighbors => Box::new(GetNeighborsIter::new(data)?),
        IterKind::Path => Box::new(PathIter::new(data)?),
    })
}
