//! Cooperative cancellation flag
//!
//! Cancellation is observed only at defined checkpoints (between bulk-loading
//! items), never preemptively. The handle is cloned freely; all clones share
//! one flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    flag: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// True if both handles observe the same flag
    pub fn same_flag(&self, other: &CancellationHandle) -> bool {
        Arc::ptr_eq(&self.flag, &other.flag)
    }
}
