//! Hash join executors
//!
//! The second input is the build side: it is scanned once into a multi-map
//! from key tuple to row indexes. The first input is then probed row by
//! row. A key tuple containing NULL never matches anything.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::{Bindings, ExecResult};
use crate::expr::{eval, Expr};
use crate::value::{DataSet, Value};

use super::error::ExecutorResult;
use super::iter::{IterKind, JoinIter, ResultIter, SequentialIter};
use super::{ExecOutput, Executor};

/// Join type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    /// Unmatched left rows are kept, padded with NULLs
    Left,
}

/// Rows of a result as a DataSet, whatever its iterator kind
///
/// Joins address rows by index, so results that are not plain tables are
/// projected through their iterator first.
fn tabular(result: &ExecResult) -> ExecutorResult<Arc<DataSet>> {
    match result.kind() {
        IterKind::Sequential | IterKind::Join | IterKind::Path => Ok(Arc::clone(result.data())),
        IterKind::GetNeighbors => {
            let mut iter = result.iter()?;
            let mut ds = DataSet::with_capacity(iter.col_names(), iter.size());
            while iter.valid() {
                ds.push(iter.row()?)?;
                iter.next();
            }
            Ok(Arc::new(ds))
        }
    }
}

/// Evaluate a key tuple; `None` if any part is NULL
fn eval_key(keys: &[Expr], iter: &dyn ResultIter) -> ExecutorResult<Option<Vec<Value>>> {
    let mut key = Vec::with_capacity(keys.len());
    for expr in keys {
        let value = eval(expr, iter)?;
        if value.is_null() {
            return Ok(None);
        }
        key.push(value);
    }
    Ok(Some(key))
}

/// Hash join executor
pub struct HashJoin {
    join_type: JoinType,
    /// Probe side
    left_var: String,
    /// Build side
    right_var: String,
    left_keys: Vec<Expr>,
    right_keys: Vec<Expr>,
}

impl HashJoin {
    pub fn new(
        join_type: JoinType,
        left_var: impl Into<String>,
        right_var: impl Into<String>,
        left_keys: Vec<Expr>,
        right_keys: Vec<Expr>,
    ) -> Self {
        HashJoin {
            join_type,
            left_var: left_var.into(),
            right_var: right_var.into(),
            left_keys,
            right_keys,
        }
    }

    fn build(&self, right: &Arc<DataSet>) -> ExecutorResult<HashMap<Vec<Value>, Vec<usize>>> {
        let mut table: HashMap<Vec<Value>, Vec<usize>> = HashMap::with_capacity(right.len());
        let mut iter = SequentialIter::new(Arc::clone(right));
        let mut idx = 0;
        while iter.valid() {
            if let Some(key) = eval_key(&self.right_keys, &iter)? {
                table.entry(key).or_default().push(idx);
            }
            idx += 1;
            iter.next();
        }
        Ok(table)
    }

    fn probe(
        &self,
        left: &Arc<DataSet>,
        table: &HashMap<Vec<Value>, Vec<usize>>,
    ) -> ExecutorResult<Vec<(usize, Option<usize>)>> {
        let mut pairs = Vec::with_capacity(left.len());
        let mut iter = SequentialIter::new(Arc::clone(left));
        let mut idx = 0;
        while iter.valid() {
            let matches = eval_key(&self.left_keys, &iter)?.and_then(|key| table.get(&key));
            match matches {
                Some(rows) => pairs.extend(rows.iter().map(|r| (idx, Some(*r)))),
                None if self.join_type == JoinType::Left => pairs.push((idx, None)),
                None => {}
            }
            idx += 1;
            iter.next();
        }
        Ok(pairs)
    }
}

#[async_trait]
impl Executor for HashJoin {
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let left = tabular(inputs.get(&self.left_var)?)?;
        let right = tabular(inputs.get(&self.right_var)?)?;

        let table = self.build(&right)?;
        let pairs = self.probe(&left, &table)?;
        debug!(
            join = ?self.join_type,
            left = left.len(),
            right = right.len(),
            out = pairs.len(),
            "hash join"
        );

        let joined = JoinIter::new(left, right, pairs).materialize()?;
        Ok(ExecResult::new(joined).into())
    }
}
