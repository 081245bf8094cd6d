//! Expression evaluation
//!
//! Evaluates an [`Expr`] against the current position of a [`ResultIter`].

use crate::executor::error::{ExecutorError, ExecutorResult};
use crate::executor::iter::ResultIter;
use crate::value::Value;

use super::{BinaryOp, Expr, UnaryOp};

/// Evaluate an expression at the iterator's current position
pub fn eval(expr: &Expr, iter: &dyn ResultIter) -> ExecutorResult<Value> {
    match expr {
        Expr::Column(name) => iter.column(name),

        Expr::Literal(v) => Ok(v.clone()),

        Expr::Property { expr, name } => {
            let target = eval(expr, iter)?;
            eval_property(&target, name)
        }

        Expr::VertexId(expr) => match eval(expr, iter)? {
            Value::Vertex(v) => Ok(v.vid),
            Value::Null => Ok(Value::Null),
            other => Err(ExecutorError::type_mismatch("VERTEX", &other, "id()")),
        },

        Expr::BinaryOp { left, op, right } => {
            let lval = eval(left, iter)?;
            let rval = eval(right, iter)?;
            eval_binary_op(*op, &lval, &rval)
        }

        Expr::UnaryOp { op, expr } => {
            let val = eval(expr, iter)?;
            eval_unary_op(*op, &val)
        }

        Expr::IsNull { expr, negated } => {
            let is_null = eval(expr, iter)?.is_null();
            Ok(Value::Bool(if *negated { !is_null } else { is_null }))
        }

        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let val = eval(expr, iter)?;
            if val.is_null() {
                return Ok(Value::Null);
            }
            let mut found = false;
            for item in list {
                let item_val = eval(item, iter)?;
                if !item_val.is_null() && val == item_val {
                    found = true;
                    break;
                }
            }
            Ok(Value::Bool(if *negated { !found } else { found }))
        }
    }
}

/// Evaluate a filter; NULL counts as false
pub fn eval_predicate(expr: &Expr, iter: &dyn ResultIter) -> ExecutorResult<bool> {
    match eval(expr, iter)? {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        other => Err(ExecutorError::type_mismatch("BOOL", &other, "predicate")),
    }
}

fn eval_property(target: &Value, name: &str) -> ExecutorResult<Value> {
    match target {
        Value::Vertex(v) => Ok(v.prop(name).cloned().unwrap_or(Value::Null)),
        Value::Edge(e) => Ok(match name {
            "_src" => e.src.clone(),
            "_dst" => e.dst.clone(),
            "_type" => Value::Int(i64::from(e.etype)),
            "_rank" => Value::Int(e.ranking),
            _ => e.props.get(name).cloned().unwrap_or(Value::Null),
        }),
        Value::Null => Ok(Value::Null),
        other => Err(ExecutorError::type_mismatch(
            "VERTEX or EDGE",
            other,
            format!("property access .{}", name),
        )),
    }
}

/// Evaluate a binary operation
fn eval_binary_op(op: BinaryOp, left: &Value, right: &Value) -> ExecutorResult<Value> {
    // AND/OR have their own NULL handling; everything else propagates NULL
    if !matches!(op, BinaryOp::And | BinaryOp::Or) && (left.is_null() || right.is_null()) {
        return Ok(Value::Null);
    }

    match op {
        BinaryOp::Add => eval_add(left, right),
        BinaryOp::Sub => eval_arith(left, right, "subtract", |a, b| a.checked_sub(b), |a, b| a - b),
        BinaryOp::Mul => eval_arith(left, right, "multiply", |a, b| a.checked_mul(b), |a, b| a * b),
        BinaryOp::Div => {
            if right.as_float() == Some(0.0) {
                return Err(ExecutorError::InvalidOperation(
                    "division by zero".to_string(),
                ));
            }
            eval_arith(left, right, "divide", |a, b| a.checked_div(b), |a, b| a / b)
        }
        BinaryOp::Mod => match (left, right) {
            (Value::Int(_), Value::Int(0)) => Err(ExecutorError::InvalidOperation(
                "modulo by zero".to_string(),
            )),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_rem(*b))),
            _ => Err(ExecutorError::InvalidOperation(format!(
                "cannot compute modulo of {} and {}",
                left.type_name(),
                right.type_name()
            ))),
        },

        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => Ok(Value::Bool(left != right)),
        BinaryOp::Lt => Ok(Value::Bool(left < right)),
        BinaryOp::LtEq => Ok(Value::Bool(left <= right)),
        BinaryOp::Gt => Ok(Value::Bool(left > right)),
        BinaryOp::GtEq => Ok(Value::Bool(left >= right)),

        BinaryOp::And => Ok(match (left.as_bool(), right.as_bool()) {
            (Some(false), _) | (_, Some(false)) => Value::Bool(false),
            (Some(true), Some(true)) => Value::Bool(true),
            _ => Value::Null,
        }),
        BinaryOp::Or => Ok(match (left.as_bool(), right.as_bool()) {
            (Some(true), _) | (_, Some(true)) => Value::Bool(true),
            (Some(false), Some(false)) => Value::Bool(false),
            _ => Value::Null,
        }),
    }
}

fn eval_add(left: &Value, right: &Value) -> ExecutorResult<Value> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => eval_arith(left, right, "add", |a, b| a.checked_add(b), |a, b| a + b),
    }
}

fn eval_arith(
    left: &Value,
    right: &Value,
    verb: &str,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> ExecutorResult<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| ExecutorError::InvalidOperation(format!("integer overflow in {}", verb))),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            match (left.as_float(), right.as_float()) {
                (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
                _ => Err(ExecutorError::Internal("numeric coercion failed".to_string())),
            }
        }
        _ => Err(ExecutorError::InvalidOperation(format!(
            "cannot {} {} and {}",
            verb,
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Evaluate a unary operation
fn eval_unary_op(op: UnaryOp, val: &Value) -> ExecutorResult<Value> {
    match op {
        UnaryOp::Not => val
            .not()
            .ok_or_else(|| ExecutorError::InvalidOperation("NOT requires boolean".to_string())),
        UnaryOp::Neg => val
            .negate()
            .ok_or_else(|| ExecutorError::InvalidOperation("negation requires number".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::executor::iter::SequentialIter;
    use crate::value::{DataSet, Edge, Row, Tag, Vertex};

    fn iter() -> SequentialIter {
        let vertex = Vertex::new(7).tag(Tag::new("player").prop("age", 33i64));
        let edge = Edge::new(7, 8, 1, "like", 0).prop("weight", 2.5);
        let ds = DataSet::from_rows(
            ["a", "b", "v", "e", "n"],
            vec![Row::new(vec![
                Value::Int(42),
                Value::from("hello"),
                Value::from(vertex),
                Value::from(edge),
                Value::Null,
            ])],
        )
        .unwrap();
        SequentialIter::new(Arc::new(ds))
    }

    #[test]
    fn test_eval_column_and_literal() {
        let it = iter();
        assert_eq!(eval(&Expr::col("a"), &it).unwrap(), Value::Int(42));
        assert_eq!(eval(&Expr::lit(1i64), &it).unwrap(), Value::Int(1));
        assert!(matches!(
            eval(&Expr::col("missing"), &it),
            Err(ExecutorError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_eval_arithmetic() {
        let it = iter();
        let e = Expr::binary(Expr::col("a"), BinaryOp::Add, Expr::lit(0.5));
        assert_eq!(eval(&e, &it).unwrap(), Value::Float(42.5));

        let e = Expr::binary(Expr::col("a"), BinaryOp::Div, Expr::lit(0i64));
        assert!(eval(&e, &it).is_err());

        let e = Expr::binary(Expr::lit(i64::MAX), BinaryOp::Add, Expr::lit(1i64));
        assert!(eval(&e, &it).is_err());
    }

    #[test]
    fn test_eval_null_propagation() {
        let it = iter();
        let e = Expr::binary(Expr::col("n"), BinaryOp::Eq, Expr::lit(1i64));
        assert_eq!(eval(&e, &it).unwrap(), Value::Null);
        assert!(!eval_predicate(&e, &it).unwrap());

        let e = Expr::binary(Expr::col("n"), BinaryOp::Or, Expr::lit(true));
        assert_eq!(eval(&e, &it).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_eval_properties() {
        let it = iter();
        let age = Expr::prop(Expr::col("v"), "age");
        assert_eq!(eval(&age, &it).unwrap(), Value::Int(33));

        let weight = Expr::prop(Expr::col("e"), "weight");
        assert_eq!(eval(&weight, &it).unwrap(), Value::Float(2.5));

        let dst = Expr::prop(Expr::col("e"), "_dst");
        assert_eq!(eval(&dst, &it).unwrap(), Value::Int(8));

        let vid = Expr::VertexId(Box::new(Expr::col("v")));
        assert_eq!(eval(&vid, &it).unwrap(), Value::Int(7));

        let bad = Expr::prop(Expr::col("a"), "x");
        assert!(matches!(
            eval(&bad, &it),
            Err(ExecutorError::TypeMismatch { .. })
        ));
    }
}
