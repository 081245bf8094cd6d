//! Per-query execution context
//!
//! A [`QueryContext`] is shared by every task of one query: the selected
//! space, the collaborator clients, the variable store and the kill flag.

pub mod variables;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::executor::config::ExecutorConfig;
use crate::executor::error::{ExecutorError, ExecutorResult};
use crate::meta::{MetaClient, SpaceInfo};
use crate::storage::StorageClient;

pub use variables::{Bindings, ExecResult, VariableStore, SCALAR_COLUMN};

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(1);

/// State shared by every task of one query execution
pub struct QueryContext {
    query_id: u64,
    space: SpaceInfo,
    storage: Arc<dyn StorageClient>,
    meta: Arc<dyn MetaClient>,
    vars: VariableStore,
    killed: AtomicBool,
    config: ExecutorConfig,
}

impl QueryContext {
    pub fn new(
        space: SpaceInfo,
        storage: Arc<dyn StorageClient>,
        meta: Arc<dyn MetaClient>,
    ) -> Self {
        QueryContext {
            query_id: NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed),
            space,
            storage,
            meta,
            vars: VariableStore::new(),
            killed: AtomicBool::new(false),
            config: ExecutorConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn query_id(&self) -> u64 {
        self.query_id
    }

    /// The space the session selected
    pub fn space(&self) -> &SpaceInfo {
        &self.space
    }

    pub fn storage(&self) -> &Arc<dyn StorageClient> {
        &self.storage
    }

    pub fn meta(&self) -> &Arc<dyn MetaClient> {
        &self.meta
    }

    pub fn vars(&self) -> &VariableStore {
        &self.vars
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Ask every task of this query to stop
    pub fn kill(&self) {
        self.killed.store(true, Ordering::Release);
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    /// Fail with [`ExecutorError::Cancelled`] once the query is killed
    pub fn check_killed(&self) -> ExecutorResult<()> {
        if self.is_killed() {
            Err(ExecutorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryContext")
            .field("query_id", &self.query_id)
            .field("space", &self.space)
            .field("killed", &self.is_killed())
            .finish_non_exhaustive()
    }
}
