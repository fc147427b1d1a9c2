//! Bounded worker pool for background loading tasks
//!
//! Thin wrapper over a named rayon pool. The panic handler is the last line of
//! defense for programmer faults on pool threads: it logs with the correlation
//! id when an execution context is still installed and degrades to a plain log
//! otherwise — a failure with no recoverable context is never reported to a
//! channel (there is no channel to report to).

use std::any::Any;

use crate::concurrent::context::Current;
use crate::core::error::PoolBuildError;

pub struct WorkerPool {
    name: String,
    inner: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(name: &str, threads: usize) -> Result<Self, PoolBuildError> {
        let base = name.to_string();
        let inner = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name({
                let base = base.clone();
                move |index| format!("{}-{}", base, index)
            })
            .panic_handler(log_uncaught_panic)
            .build()
            .map_err(|source| PoolBuildError {
                name: base.clone(),
                source,
            })?;

        Ok(Self { name: base, inner })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        self.inner.spawn(job);
    }
}

fn log_uncaught_panic(payload: Box<dyn Any + Send>) {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    };

    match Current::optional() {
        Some(context) => tracing::error!(
            correlation_id = %context.correlation_id,
            "worker thread panicked: {}",
            message
        ),
        None => tracing::error!("worker thread panicked with no execution context: {}", message),
    }
}
