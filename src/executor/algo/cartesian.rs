//! Cartesian product of N input variables

use async_trait::async_trait;

use crate::context::{Bindings, ExecResult};
use crate::planner::CartesianVars;
use crate::value::{DataSet, Row};

use crate::executor::error::ExecutorResult;
use crate::executor::{ExecOutput, Executor};

/// CartesianProduct executor
pub struct CartesianProduct {
    vars: CartesianVars,
}

impl CartesianProduct {
    pub fn new(vars: CartesianVars) -> Self {
        CartesianProduct { vars }
    }
}

#[async_trait]
impl Executor for CartesianProduct {
    async fn execute(&mut self, inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        // start from the single empty row and multiply in one factor at a time
        let mut product = vec![Row::default()];
        for var in self.vars.input_vars() {
            let mut iter = inputs.iter(&var)?;
            let mut factor = Vec::with_capacity(iter.size());
            while iter.valid() {
                factor.push(iter.row()?);
                iter.next();
            }

            let mut next = Vec::with_capacity(product.len() * factor.len());
            for left in &product {
                for right in &factor {
                    next.push(Row::concat_ref(left, right));
                }
            }
            product = next;
        }

        let ds = DataSet::from_rows(self.vars.col_names(), product)?;
        Ok(ExecResult::new(ds).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::algo::testing::bind;
    use crate::value::Value;

    fn table(col: &str, values: &[i64]) -> DataSet {
        DataSet::from_rows(
            [col],
            values.iter().map(|v| Row::new(vec![Value::Int(*v)])).collect(),
        )
        .unwrap()
    }

    fn vars(names: &[(&str, &str)]) -> CartesianVars {
        let mut vars = CartesianVars::new();
        for (var, col) in names {
            vars.add_var(*var, vec![col.to_string()]).unwrap();
        }
        vars
    }

    #[tokio::test]
    async fn test_product() {
        let inputs = bind(vec![("a", table("x", &[1, 2])), ("b", table("y", &[10, 20, 30]))]);
        let out = CartesianProduct::new(vars(&[("a", "x"), ("b", "y")]))
            .execute(&inputs)
            .await
            .unwrap();
        let ds = out.result.data();
        assert_eq!(ds.col_names(), &["x", "y"]);
        assert_eq!(ds.len(), 6);
        assert_eq!(ds.rows()[1], Row::new(vec![Value::Int(1), Value::Int(20)]));
    }

    #[tokio::test]
    async fn test_empty_factor() {
        let inputs = bind(vec![("a", table("x", &[1, 2])), ("b", table("y", &[]))]);
        let out = CartesianProduct::new(vars(&[("a", "x"), ("b", "y")]))
            .execute(&inputs)
            .await
            .unwrap();
        assert_eq!(out.rows(), 0);
        assert_eq!(out.result.data().col_names(), &["x", "y"]);
    }
}
