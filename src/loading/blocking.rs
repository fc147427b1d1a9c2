//! Inline execution strategy
//!
//! Runs the task sequentially on the calling thread. Used where the caller
//! needs every item resolved before proceeding; the outcome comes back
//! directly instead of through a handle.

use crate::loading::task::{BulkLoadingTask, ItemLoader, LoadOutcome};

#[derive(Debug, Default)]
pub struct BlockingLoadingStrategy;

impl BlockingLoadingStrategy {
    pub fn new() -> Self {
        Self
    }

    pub fn execute<T, L: ItemLoader<T>>(&self, task: BulkLoadingTask<T, L>) -> LoadOutcome {
        task.run()
    }
}
