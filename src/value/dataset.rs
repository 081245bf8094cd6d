//! DataSet - named columns plus rows

use std::fmt;

use crate::executor::error::{ExecutorError, ExecutorResult};

use super::datum::Value;
use super::row::Row;

/// Tabular result exchanged between operators
///
/// Every row has exactly `col_names.len()` values.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataSet {
    col_names: Vec<String>,
    rows: Vec<Row>,
}

impl DataSet {
    /// Create an empty DataSet with the given columns
    pub fn new<S: Into<String>>(col_names: impl IntoIterator<Item = S>) -> Self {
        DataSet {
            col_names: col_names.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Create an empty DataSet with room for `capacity` rows
    pub fn with_capacity<S: Into<String>>(
        col_names: impl IntoIterator<Item = S>,
        capacity: usize,
    ) -> Self {
        let mut ds = Self::new(col_names);
        ds.rows.reserve(capacity);
        ds
    }

    /// Build a DataSet from rows, validating arity
    pub fn from_rows<S: Into<String>>(
        col_names: impl IntoIterator<Item = S>,
        rows: Vec<Row>,
    ) -> ExecutorResult<Self> {
        let mut ds = Self::with_capacity(col_names, rows.len());
        for row in rows {
            ds.push(row)?;
        }
        Ok(ds)
    }

    /// One column, one row
    pub fn single_value(col_name: impl Into<String>, value: impl Into<Value>) -> Self {
        DataSet {
            col_names: vec![col_name.into()],
            rows: vec![Row::new(vec![value.into()])],
        }
    }

    pub fn col_names(&self) -> &[String] {
        &self.col_names
    }

    pub fn width(&self) -> usize {
        self.col_names.len()
    }

    /// Index of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.col_names.iter().position(|c| c == name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row; its arity must match the column list
    pub fn push(&mut self, row: Row) -> ExecutorResult<()> {
        if row.len() != self.col_names.len() {
            return Err(ExecutorError::ArityMismatch {
                expected: self.col_names.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append another DataSet's rows; column counts must agree
    pub fn append(&mut self, other: DataSet) -> ExecutorResult<()> {
        if other.width() != self.width() {
            return Err(ExecutorError::ArityMismatch {
                expected: self.width(),
                got: other.width(),
            });
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    /// Values of one column, in row order
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().filter_map(move |r| r.get_opt(idx)))
    }
}

impl fmt::Display for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "| {} |", self.col_names.join(" | "))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(f, "| {} |", cells.join(" | "))?;
        }
        Ok(())
    }
}
