//! Versioned variables
//!
//! Every operator publishes its output under a variable name. Inside loops
//! the same name is published again each round, so a variable is an
//! append-only list of results; the index into that list is its version.
//! Readers never look at "the latest" at read time: the scheduler takes a
//! [`Bindings`] snapshot when it dispatches a task.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::executor::error::{ExecutorError, ExecutorResult};
use crate::executor::iter::{make_iter, IterKind, ResultIter};
use crate::value::{DataSet, Value};

/// Column of a single-value result
pub const SCALAR_COLUMN: &str = "_value";

/// One published version of a variable
///
/// Immutable once published and shared by `Arc`; any number of readers can
/// take iterators over it concurrently.
#[derive(Debug, Clone)]
pub struct ExecResult {
    data: Arc<DataSet>,
    kind: IterKind,
}

impl ExecResult {
    /// A DataSet read back row by row
    pub fn new(data: DataSet) -> Self {
        Self::with_kind(data, IterKind::Sequential)
    }

    /// A DataSet read back through an iterator of `kind`
    pub fn with_kind(data: DataSet, kind: IterKind) -> Self {
        ExecResult {
            data: Arc::new(data),
            kind,
        }
    }

    /// A single value (conditions, loop flags)
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::new(DataSet::single_value(SCALAR_COLUMN, value))
    }

    pub fn data(&self) -> &Arc<DataSet> {
        &self.data
    }

    pub fn kind(&self) -> IterKind {
        self.kind
    }

    /// A fresh iterator over this result
    pub fn iter(&self) -> ExecutorResult<Box<dyn ResultIter>> {
        make_iter(Arc::clone(&self.data), self.kind)
    }

    /// The value of a single-value result
    pub fn scalar_value(&self) -> Option<&Value> {
        if self.data.width() != 1 || self.data.len() != 1 {
            return None;
        }
        self.data.rows()[0].get_opt(0)
    }

    /// Truthiness of a single-value result; anything but `true` is false
    pub fn is_true(&self) -> bool {
        matches!(self.scalar_value(), Some(Value::Bool(true)))
    }
}

/// Every variable of one query execution
#[derive(Debug, Default)]
pub struct VariableStore {
    vars: RwLock<HashMap<String, Vec<Arc<ExecResult>>>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new version, returning its version number
    pub fn publish(&self, name: &str, result: ExecResult) -> usize {
        let mut vars = self.vars.write();
        let history = vars.entry(name.to_string()).or_default();
        history.push(Arc::new(result));
        history.len() - 1
    }

    /// Latest published version
    pub fn latest(&self, name: &str) -> Option<Arc<ExecResult>> {
        self.vars.read().get(name).and_then(|h| h.last().cloned())
    }

    /// All versions, oldest first
    pub fn history(&self, name: &str) -> Vec<Arc<ExecResult>> {
        self.vars.read().get(name).cloned().unwrap_or_default()
    }

    /// Number of published versions
    pub fn version_count(&self, name: &str) -> usize {
        self.vars.read().get(name).map_or(0, Vec::len)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.version_count(name) > 0
    }

    /// Capture the versions currently visible for `names`
    pub fn snapshot<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> Bindings {
        let vars = self.vars.read();
        let bound = names
            .into_iter()
            .filter_map(|name| vars.get(name).map(|h| (name.clone(), h.clone())))
            .collect();
        Bindings { vars: bound }
    }
}

/// The input versions a task was dispatched with
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    vars: HashMap<String, Vec<Arc<ExecResult>>>,
}

impl Bindings {
    /// Bindings with no variables
    pub fn empty() -> Self {
        Self::default()
    }

    /// The bound (latest at dispatch) version of `name`
    pub fn get(&self, name: &str) -> ExecutorResult<&Arc<ExecResult>> {
        self.vars
            .get(name)
            .and_then(|h| h.last())
            .ok_or_else(|| ExecutorError::VariableNotFound(name.to_string()))
    }

    /// Every version of `name` up to the bound one
    pub fn history(&self, name: &str) -> ExecutorResult<&[Arc<ExecResult>]> {
        self.vars
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ExecutorError::VariableNotFound(name.to_string()))
    }

    /// Version number of the bound result
    pub fn version(&self, name: &str) -> Option<usize> {
        self.vars.get(name).map(|h| h.len().saturating_sub(1))
    }

    /// Iterator over the bound version of `name`
    pub fn iter(&self, name: &str) -> ExecutorResult<Box<dyn ResultIter>> {
        self.get(name)?.iter()
    }
}
