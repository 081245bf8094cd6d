//! DataCollect executor
//!
//! Concatenates every bound version of its input variable. Path searches
//! publish one version per loop round; this gathers them into one result.

use async_trait::async_trait;

use crate::context::{Bindings, ExecResult};
use crate::value::DataSet;

use super::error::{ExecutorError, ExecutorResult};
use super::iter::IterKind;
use super::{ExecOutput, Executor};

/// DataCollect executor
pub struct DataCollect {
    input_var: String,
    /// Schema used when nothing was ever published
    col_names: Vec<String>,
}

impl DataCollect {
    pub fn new(input_var: impl Into<String>, col_names: Vec<String>) -> Self {
        DataCollect {
            input_var: input_var.into(),
            col_names,
        }
    }
}

#[async_trait]
impl Executor for DataCollect {
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let history = match inputs.history(&self.input_var) {
            Ok(history) => history,
            // a loop whose body never ran
            Err(ExecutorError::VariableNotFound(_)) => {
                return Ok(ExecResult::new(DataSet::new(self.col_names.iter().cloned())).into())
            }
            Err(e) => return Err(e),
        };

        let col_names = history
            .first()
            .map(|r| r.data().col_names().to_vec())
            .unwrap_or_else(|| self.col_names.clone());
        let kind = history.first().map_or(IterKind::Sequential, |r| r.kind());
        let total = history.iter().map(|r| r.data().len()).sum();
        let mut ds = DataSet::with_capacity(col_names, total);
        for version in history {
            for row in version.data().rows() {
                ds.push(row.clone())?;
            }
        }
        Ok(ExecResult::with_kind(ds, kind).into())
    }
}
