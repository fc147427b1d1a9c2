//! Thread-scoped context propagation and pooled execution primitives

pub mod ambient;
pub mod cancellation;
pub mod context;
pub mod pool;
pub mod queue;

pub use ambient::AmbientContextStore;
pub use cancellation::CancellationHandle;
pub use context::{ContextScope, Current, ExecutionContext};
pub use pool::WorkerPool;
pub use queue::{QueuedTask, ThreadExecutionQueue};
