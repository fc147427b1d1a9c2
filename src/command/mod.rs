//! Command dispatch through the interceptor pipeline

pub mod dispatcher;
pub mod interceptor;

pub use dispatcher::{CommandDispatcher, DispatchOutcome};
pub use interceptor::{
    ChainableInterceptor, CommandInterceptor, CommandInterceptorChain, InterceptorFactoryRegistry,
    MonitoringInterceptor,
};

use crate::core::error::BoxError;

/// A user-issued command handed to the interceptor chain.
///
/// Implementations carry their own parsed arguments; the terminal node of the
/// chain calls [`execute`](Command::execute) exactly once per successful pass
/// through the preceding interceptors.
pub trait Command: Send {
    /// Command identifier, e.g. `"play"` or `"queue"`
    fn name(&self) -> &str;

    /// Run the command's business logic
    fn execute(&mut self) -> Result<(), BoxError>;
}
