//! Row type - an ordered collection of values

use crate::executor::error::{ExecutorError, ExecutorResult};

use super::datum::Value;

/// A row of values
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Create a new row with the given values
    pub fn new(values: Vec<Value>) -> Self {
        Row { values }
    }

    /// Create a row of `width` NULLs (padding for outer joins)
    pub fn nulls(width: usize) -> Self {
        Row {
            values: vec![Value::Null; width],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by index
    pub fn get(&self, index: usize) -> ExecutorResult<&Value> {
        self.values
            .get(index)
            .ok_or(ExecutorError::ColumnIndexOutOfBounds {
                index,
                row_len: self.values.len(),
            })
    }

    /// Get a value by index, returns None if out of bounds
    pub fn get_opt(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Push a value to the end of the row
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Concatenate two rows (for joins)
    pub fn concat(self, other: Row) -> Row {
        let mut values = self.values;
        values.extend(other.values);
        Row { values }
    }

    /// Concatenate two borrowed rows into a new row
    pub fn concat_ref(left: &Row, right: &Row) -> Row {
        let mut values = Vec::with_capacity(left.len() + right.len());
        values.extend_from_slice(&left.values);
        values.extend_from_slice(&right.values);
        Row { values }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row { values }
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
