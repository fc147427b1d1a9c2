//! Cooperative-cancellation bulk item loading
//!
//! A [`BulkLoadingTask`] iterates its items in insertion order, checking the
//! cancellation flag between items and cleaning up deterministically on
//! cancellation or failure. The same task contract runs under three execution
//! strategies: inline on the calling thread, pooled in the background, or
//! pooled with replace-previous semantics.

pub mod blocking;
pub mod pooled;
pub mod replaceable;
pub mod task;

pub use blocking::BlockingLoadingStrategy;
pub use pooled::{LoadingHandle, PooledLoadingStrategy};
pub use replaceable::ReplaceableLoadingStrategy;
pub use task::{BulkLoadingTask, ItemLoader, LoadOutcome, TaskState};
