//! Project executor
//!
//! Evaluates expressions at every position of the input iterator.

use async_trait::async_trait;

use crate::context::{Bindings, ExecResult};
use crate::expr::{eval, Expr};
use crate::value::{DataSet, Row};

use super::error::ExecutorResult;
use super::{ExecOutput, Executor};

/// Project executor
pub struct Project {
    input_var: String,
    /// Expressions to evaluate (with aliases)
    columns: Vec<(Expr, String)>,
}

impl Project {
    pub fn new(input_var: impl Into<String>, columns: Vec<(Expr, String)>) -> Self {
        Project {
            input_var: input_var.into(),
            columns,
        }
    }
}

#[async_trait]
impl Executor for Project {
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let mut iter = inputs.iter(&self.input_var)?;
        let mut ds = DataSet::with_capacity(
            self.columns.iter().map(|(_, alias)| alias.as_str()),
            iter.size(),
        );
        while iter.valid() {
            let mut values = Vec::with_capacity(self.columns.len());
            for (expr, _alias) in &self.columns {
                values.push(eval(expr, iter.as_ref())?);
            }
            ds.push(Row::new(values))?;
            iter.next();
        }
        Ok(ExecResult::new(ds).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::VariableStore;
    use crate::executor::iter::IterKind;
    use crate::expr::BinaryOp;
    use crate::value::{Edge, Value, Vertex};

    #[tokio::test]
    async fn test_project() {
        let store = VariableStore::new();
        let ds = DataSet::from_rows(
            ["a", "b"],
            vec![
                Row::new(vec![Value::Int(1), Value::Int(10)]),
                Row::new(vec![Value::Int(2), Value::Int(20)]),
            ],
        )
        .unwrap();
        store.publish("in", ExecResult::new(ds));
        let inputs = store.snapshot(&["in".to_string()]);

        let mut project = Project::new(
            "in",
            vec![
                (Expr::col("a"), "a".to_string()),
                (
                    Expr::binary(Expr::col("a"), BinaryOp::Add, Expr::col("b")),
                    "sum".to_string(),
                ),
            ],
        );
        let out = project.execute(&inputs).await.unwrap();
        let ds = out.result.data();
        assert_eq!(ds.col_names(), &["a", "sum"]);
        assert_eq!(ds.rows()[0], Row::new(vec![Value::Int(1), Value::Int(11)]));
        assert_eq!(ds.rows()[1], Row::new(vec![Value::Int(2), Value::Int(22)]));
    }

    #[tokio::test]
    async fn test_project_over_neighbors() {
        let store = VariableStore::new();
        let mut ds = DataSet::new(["_vertex", "_edges"]);
        ds.push(Row::new(vec![
            Value::from(Vertex::new(1)),
            Value::List(vec![
                Value::from(Edge::new(1, 2, 1, "e", 0)),
                Value::from(Edge::new(1, 3, 1, "e", 0)),
            ]),
        ]))
        .unwrap();
        store.publish("gn", ExecResult::with_kind(ds, IterKind::GetNeighbors));
        let inputs = store.snapshot(&["gn".to_string()]);

        let mut project = Project::new("gn", vec![(Expr::col("_dst"), "dst".to_string())]);
        let out = project.execute(&inputs).await.unwrap();
        assert_eq!(out.rows(), 2);
        assert_eq!(out.result.data().rows()[1], Row::new(vec![Value::Int(3)]));
    }
}
