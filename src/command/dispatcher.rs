//! Command dispatcher
//!
//! Entry point for one command invocation: installs the execution context on
//! the invoking thread, hands the command to the head of the interceptor
//! chain, and funnels anything that escapes the chain into the exception
//! resolution chain. Context removal is unconditional — the scope guard
//! releases it on success, handled failure, and unwind alike.

use std::sync::Arc;

use crate::command::interceptor::CommandInterceptorChain;
use crate::command::Command;
use crate::concurrent::context::{ContextScope, ExecutionContext};
use crate::exceptions::resolver::ExceptionResolutionChain;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed,
    Failed,
}

pub struct CommandDispatcher {
    chain: CommandInterceptorChain,
    resolver: Arc<ExceptionResolutionChain>,
}

impl CommandDispatcher {
    pub fn new(chain: CommandInterceptorChain, resolver: Arc<ExceptionResolutionChain>) -> Self {
        Self { chain, resolver }
    }

    pub fn chain(&self) -> &CommandInterceptorChain {
        &self.chain
    }

    pub fn dispatch(
        &self,
        command: &mut dyn Command,
        context: ExecutionContext,
    ) -> DispatchOutcome {
        let context_for_report = context.clone();
        let _scope = ContextScope::install(context);

        match self.chain.intercept(command) {
            Ok(()) => DispatchOutcome::Completed,
            Err(error) => {
                self.resolver.resolve_command_failure(
                    error.as_ref(),
                    command.name(),
                    &context_for_report,
                );
                DispatchOutcome::Failed
            }
        }
    }
}
