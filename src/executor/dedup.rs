//! Dedup executor
//!
//! Drops repeated rows using a hash set; the first occurrence wins.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::context::{Bindings, ExecResult};
use crate::value::DataSet;

use super::error::ExecutorResult;
use super::{ExecOutput, Executor};

/// Dedup executor
pub struct Dedup {
    input_var: String,
}

impl Dedup {
    pub fn new(input_var: impl Into<String>) -> Self {
        Dedup {
            input_var: input_var.into(),
        }
    }
}

#[async_trait]
impl Executor for Dedup {
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let mut iter = inputs.iter(&self.input_var)?;
        let mut seen = HashSet::with_capacity(iter.size());
        let mut ds = DataSet::new(iter.col_names());
        while iter.valid() {
            let row = iter.row()?;
            if seen.insert(row.clone()) {
                ds.push(row)?;
            }
            iter.next();
        }
        Ok(ExecResult::new(ds).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::VariableStore;
    use crate::value::{Row, Value};

    #[tokio::test]
    async fn test_dedup_keeps_first() {
        let store = VariableStore::new();
        let rows = [3, 1, 3, 1, 2]
            .iter()
            .map(|v| Row::new(vec![Value::Int(*v)]))
            .collect();
        store.publish("in", ExecResult::new(DataSet::from_rows(["a"], rows).unwrap()));
        let inputs = store.snapshot(&["in".to_string()]);

        let out = Dedup::new("in").execute(&inputs).await.unwrap();
        let values: Vec<Value> = out.result.data().column("a").unwrap().cloned().collect();
        assert_eq!(values, vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
    }
}
