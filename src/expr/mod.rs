//! Expressions evaluated by operators against the current iterator row
//!
//! Operators carry already-planned expressions: column references are by
//! name and resolved against whatever iterator the operator is walking.

pub mod eval;

use std::fmt;

use crate::value::Value;

pub use eval::{eval, eval_predicate};

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // Logical
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        };
        write!(f, "{}", s)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Planned expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column of the current iterator position
    Column(String),
    /// Constant
    Literal(Value),
    /// Property of a vertex or edge value
    Property { expr: Box<Expr>, name: String },
    /// Identifier of a vertex value
    VertexId(Box<Expr>),
    /// Binary operation
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Unary operation
    UnaryOp { op: UnaryOp, expr: Box<Expr> },
    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },
    /// IN (list)
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
}

impl Expr {
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn prop(expr: Expr, name: impl Into<String>) -> Self {
        Expr::Property {
            expr: Box::new(expr),
            name: name.into(),
        }
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn is_null(expr: Expr) -> Self {
        Expr::IsNull {
            expr: Box::new(expr),
            negated: false,
        }
    }

    /// Name used when this expression becomes an output column
    pub fn column_name(&self) -> String {
        match self {
            Expr::Column(name) => name.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "${}", name),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Property { expr, name } => write!(f, "{}.{}", expr, name),
            Expr::VertexId(expr) => write!(f, "id({})", expr),
            Expr::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expr::UnaryOp { op, expr } => match op {
                UnaryOp::Not => write!(f, "NOT {}", expr),
                UnaryOp::Neg => write!(f, "-{}", expr),
            },
            Expr::IsNull { expr, negated } => {
                if *negated {
                    write!(f, "{} IS NOT NULL", expr)
                } else {
                    write!(f, "{} IS NULL", expr)
                }
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let items: Vec<String> = list.iter().map(|e| e.to_string()).collect();
                let not = if *negated { " NOT" } else { "" };
                write!(f, "{}{} IN [{}]", expr, not, items.join(", "))
            }
        }
    }
}
