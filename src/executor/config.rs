//! Executor configuration

use std::time::Duration;

/// Default bound on operator tasks running at once across all queries
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 64;

/// Default cap on rounds of any loop, whatever its own condition says
pub const DEFAULT_MAX_LOOP_ITERATIONS: usize = 1024;

/// Default threshold above which a task run is logged as slow
pub const DEFAULT_SLOW_TASK_THRESHOLD_MS: u64 = 500;

/// Configuration for plan execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Worker pool size (semaphore permits)
    pub max_concurrent_tasks: usize,

    /// Hard cap on loop rounds
    pub max_loop_iterations: usize,

    /// Task runs slower than this are logged at warn level
    pub slow_task_threshold: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
            slow_task_threshold: Duration::from_millis(DEFAULT_SLOW_TASK_THRESHOLD_MS),
        }
    }
}

impl ExecutorConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker pool size (at least one permit)
    pub fn with_max_concurrent_tasks(mut self, n: usize) -> Self {
        self.max_concurrent_tasks = n.max(1);
        self
    }

    /// Set the loop round cap
    pub fn with_max_loop_iterations(mut self, n: usize) -> Self {
        self.max_loop_iterations = n;
        self
    }

    /// Set the slow-task logging threshold
    pub fn with_slow_task_threshold(mut self, threshold: Duration) -> Self {
        self.slow_task_threshold = threshold;
        self
    }
}
