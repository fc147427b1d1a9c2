//! Bounded execution queue over the worker pool
//!
//! Limits how many tasks from one source (typically one guild) run
//! concurrently on the shared pool; overflow waits in FIFO order. `abort_all`
//! flips every pending and running task's cancellation flag — tasks observe it
//! cooperatively at their next checkpoint, so a queued task still runs but
//! terminates at its first flag check.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::concurrent::cancellation::CancellationHandle;
use crate::concurrent::pool::WorkerPool;

/// A unit of work plus the flag used to cancel it cooperatively
pub struct QueuedTask {
    cancellation: CancellationHandle,
    job: Box<dyn FnOnce() + Send>,
}

impl QueuedTask {
    pub fn new(cancellation: CancellationHandle, job: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancellation,
            job: Box::new(job),
        }
    }

    pub fn cancellation(&self) -> &CancellationHandle {
        &self.cancellation
    }
}

#[derive(Default)]
struct QueueState {
    running: Vec<CancellationHandle>,
    pending: VecDeque<QueuedTask>,
}

struct QueueInner {
    name: String,
    limit: usize,
    pool: Arc<WorkerPool>,
    state: Mutex<QueueState>,
}

impl QueueInner {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn submit(this: &Arc<Self>, task: QueuedTask) {
        let mut state = this.lock_state();
        if state.running.len() < this.limit {
            let handle = task.cancellation.clone();
            state.running.push(handle.clone());
            drop(state);

            let inner = Arc::clone(this);
            this.pool.spawn(move || {
                let outcome =
                    std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || (task.job)()));
                Self::finish(&inner, &handle);
                if let Err(payload) = outcome {
                    std::panic::resume_unwind(payload);
                }
            });
        } else {
            tracing::debug!(
                "queue {} at limit {}, task waits at position {}",
                this.name,
                this.limit,
                state.pending.len() + 1
            );
            state.pending.push_back(task);
        }
    }

    fn finish(this: &Arc<Self>, handle: &CancellationHandle) {
        let next = {
            let mut state = this.lock_state();
            state.running.retain(|running| !running.same_flag(handle));
            state.pending.pop_front()
        };

        if let Some(task) = next {
            Self::submit(this, task);
        }
    }
}

pub struct ThreadExecutionQueue {
    inner: Arc<QueueInner>,
}

impl ThreadExecutionQueue {
    pub fn new(name: impl Into<String>, limit: usize, pool: Arc<WorkerPool>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                name: name.into(),
                limit: limit.max(1),
                pool,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn add(&self, task: QueuedTask) {
        QueueInner::submit(&self.inner, task);
    }

    /// Cancel every pending and running task
    pub fn abort_all(&self) {
        let state = self.inner.lock_state();
        for task in &state.pending {
            task.cancellation.cancel();
        }
        for handle in &state.running {
            handle.cancel();
        }
        tracing::debug!(
            "aborted queue {}: {} running, {} pending",
            self.inner.name,
            state.running.len(),
            state.pending.len()
        );
    }

    pub fn is_idle(&self) -> bool {
        let state = self.inner.lock_state();
        state.running.is_empty() && state.pending.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }
}
