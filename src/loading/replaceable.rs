//! Replace-previous pooled strategy
//!
//! Single-slot variant of the pooled strategy: submitting a new task cancels
//! the one submitted before it. Used by commands where only the latest request
//! matters (a new play request supersedes the one still loading).

use std::sync::{Mutex, MutexGuard};

use crate::concurrent::cancellation::CancellationHandle;
use crate::loading::pooled::{LoadingHandle, PooledLoadingStrategy};
use crate::loading::task::{BulkLoadingTask, ItemLoader};

pub struct ReplaceableLoadingStrategy {
    inner: PooledLoadingStrategy,
    current: Mutex<Option<CancellationHandle>>,
}

impl ReplaceableLoadingStrategy {
    pub fn new(inner: PooledLoadingStrategy) -> Self {
        Self {
            inner,
            current: Mutex::new(None),
        }
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<CancellationHandle>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn execute<T, L>(&self, task: BulkLoadingTask<T, L>) -> LoadingHandle
    where
        T: Send + 'static,
        L: ItemLoader<T> + 'static,
    {
        let mut current = self.lock_current();
        if let Some(previous) = current.take() {
            if !previous.is_cancelled() {
                tracing::debug!("replacing previously submitted loading task");
                previous.cancel();
            }
        }

        let handle = self.inner.execute(task);
        *current = Some(handle.cancellation().clone());
        handle
    }

    /// Cancel the currently tracked task, if any
    pub fn abort_current(&self) {
        if let Some(current) = self.lock_current().take() {
            current.cancel();
        }
    }
}
