//! Pooled execution strategy
//!
//! Submits the task to the bounded worker pool through a
//! [`ThreadExecutionQueue`] and returns immediately. The submitting thread's
//! `ExecutionContext`, when installed, is forked onto the worker before the
//! task body runs; failures on the worker route through the resolution chain's
//! uncaught path, which recovers that copied context to attribute the report.
//! The worker's ambient store is cleared on every exit path so the pool thread
//! carries nothing into its next task.

use std::sync::mpsc;
use std::sync::Arc;

use crate::concurrent::ambient;
use crate::concurrent::cancellation::CancellationHandle;
use crate::concurrent::context::Current;
use crate::concurrent::queue::{QueuedTask, ThreadExecutionQueue};
use crate::core::types::ChannelRef;
use crate::exceptions::resolver::ExceptionResolutionChain;
use crate::loading::task::{BulkLoadingTask, ItemLoader, LoadOutcome, TaskState};

/// Handle to a task submitted to the pool
pub struct LoadingHandle {
    cancellation: CancellationHandle,
    done: mpsc::Receiver<TaskState>,
}

impl LoadingHandle {
    pub fn cancellation(&self) -> &CancellationHandle {
        &self.cancellation
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Block until the task reaches a terminal state. `None` if the worker
    /// died without reporting one (a programmer fault logged by the pool).
    pub fn wait(&self) -> Option<TaskState> {
        self.done.recv().ok()
    }

    pub fn wait_timeout(&self, timeout: std::time::Duration) -> Option<TaskState> {
        self.done.recv_timeout(timeout).ok()
    }
}

pub struct PooledLoadingStrategy {
    queue: ThreadExecutionQueue,
    resolver: Arc<ExceptionResolutionChain>,
    fallback_channel: Option<ChannelRef>,
}

impl PooledLoadingStrategy {
    pub fn new(queue: ThreadExecutionQueue, resolver: Arc<ExceptionResolutionChain>) -> Self {
        Self {
            queue,
            resolver,
            fallback_channel: None,
        }
    }

    /// Channel used for failure reports when the submitting thread has no
    /// execution context installed (e.g. work triggered by playback rather
    /// than a command).
    pub fn with_fallback_channel(mut self, channel: ChannelRef) -> Self {
        self.fallback_channel = Some(channel);
        self
    }

    /// Cancel every task this strategy has queued or running
    pub fn abort_all(&self) {
        self.queue.abort_all();
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    pub fn execute<T, L>(&self, task: BulkLoadingTask<T, L>) -> LoadingHandle
    where
        T: Send + 'static,
        L: ItemLoader<T> + 'static,
    {
        let cancellation = task.cancellation_handle();
        let forked = Current::optional().map(|context| context.fork());
        let channel = forked
            .as_ref()
            .map(|context| context.channel.clone())
            .or_else(|| self.fallback_channel.clone());
        let resolver = Arc::clone(&self.resolver);
        let (done_tx, done_rx) = mpsc::channel();

        let job = move || {
            let _clear = ambient::ClearGuard::new();
            if let Some(context) = forked {
                Current::install(context);
            }
            if let Some(channel) = channel {
                ambient::install(channel);
            }

            let outcome = task.run();
            if let LoadOutcome::Failed(error) = &outcome {
                resolver.resolve_uncaught(error.as_ref());
            }

            // receiver may be gone if the caller dropped the handle
            let _ = done_tx.send(outcome.state());
        };

        self.queue.add(QueuedTask::new(cancellation.clone(), job));

        LoadingHandle {
            cancellation,
            done: done_rx,
        }
    }
}
