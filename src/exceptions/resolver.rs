//! Cause-chain resolution
//!
//! Walks an error's `source()` chain outward-in, consulting the handler
//! registry at each link. Everything that escapes the interceptor chain or an
//! asynchronous task funnels through here, so there is exactly one place that
//! decides handled / unhandled / skip-to-cause. Default handling never throws
//! further up — this is the last line of defense on any thread.

use std::sync::Arc;

use crate::concurrent::ambient;
use crate::concurrent::context::{Current, ExecutionContext};
use crate::core::error::UserError;
use crate::core::types::{ChannelRef, CorrelationId};
use crate::exceptions::handler::{DynError, ExceptionHandlerRegistry, Resolution};
use crate::messaging::{FailureReport, MessageService};

const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while executing your command. The error has been logged.";

/// What resolution did with the error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// A registered handler handled it.
    Handled,
    /// No handler handled it; default handling (log + generic notification) ran.
    Defaulted,
}

pub struct ExceptionResolutionChain {
    registry: ExceptionHandlerRegistry,
    messages: Arc<dyn MessageService>,
}

impl ExceptionResolutionChain {
    pub fn new(messages: Arc<dyn MessageService>) -> Self {
        Self {
            registry: ExceptionHandlerRegistry::new(),
            messages,
        }
    }

    /// Chain with the built-in [`UserError`] handler: the user asked for
    /// something that cannot be done, so the message goes back to the
    /// originating channel and the error counts as handled.
    pub fn with_defaults(messages: Arc<dyn MessageService>) -> Self {
        let mut chain = Self::new(Arc::clone(&messages));
        chain.register::<UserError, _>(move |_root, user_error| {
            let channel = Current::optional()
                .map(|context| context.channel)
                .or_else(ambient::get::<ChannelRef>);
            match channel {
                Some(channel) => {
                    messages.send_message(&channel, &user_error.message);
                    Resolution::Handled
                }
                None => Resolution::Unhandled,
            }
        });
        chain
    }

    /// Register a handler for errors of concrete type `E` (startup only)
    pub fn register<E, F>(&mut self, handler: F)
    where
        E: std::error::Error + 'static,
        F: Fn(&DynError, &E) -> Resolution + Send + Sync + 'static,
    {
        self.registry.register::<E, F>(handler);
    }

    pub fn registry(&self) -> &ExceptionHandlerRegistry {
        &self.registry
    }

    /// Synchronous site: the dispatcher holds the command and its context
    /// explicitly.
    pub fn resolve_command_failure(
        &self,
        error: &DynError,
        command_name: &str,
        context: &ExecutionContext,
    ) -> ResolutionOutcome {
        if self.walk(error) {
            return ResolutionOutcome::Handled;
        }

        self.report_default(
            error,
            Some(context.correlation_id),
            Some(&context.channel),
            Some(command_name),
        );
        ResolutionOutcome::Defaulted
    }

    /// Asynchronous site: recover whatever context the submitting code copied
    /// onto this thread. Nothing installed means best-effort logging only.
    pub fn resolve_uncaught(&self, error: &DynError) -> ResolutionOutcome {
        if self.walk(error) {
            return ResolutionOutcome::Handled;
        }

        let context = Current::optional();
        let correlation_id = context.as_ref().map(|c| c.correlation_id);
        let channel = context
            .map(|c| c.channel)
            .or_else(ambient::get::<ChannelRef>);

        self.report_default(error, correlation_id, channel.as_ref(), None);
        ResolutionOutcome::Defaulted
    }

    /// Walk the cause chain from the root; true if some handler returned
    /// `Handled`. An error with no registered handler is skipped through to its
    /// cause; `Unhandled` stops the walk entirely.
    fn walk(&self, root: &DynError) -> bool {
        let mut current = Some(root);
        while let Some(error) = current {
            if let Some(entry) = self.registry.find(error) {
                match entry.invoke(root, error) {
                    Resolution::Handled => return true,
                    Resolution::Unhandled => return false,
                    Resolution::SkipToCause => {
                        tracing::debug!(
                            "handler {} skipped to cause of: {}",
                            entry.type_name(),
                            error
                        );
                    }
                }
            }
            current = error.source();
        }

        false
    }

    fn report_default(
        &self,
        error: &DynError,
        correlation_id: Option<CorrelationId>,
        channel: Option<&ChannelRef>,
        command_name: Option<&str>,
    ) {
        match correlation_id {
            Some(id) => tracing::error!(
                correlation_id = %id,
                "unhandled error during command execution: {}",
                render_chain(error)
            ),
            None => tracing::error!(
                "unhandled error with no execution context: {}",
                render_chain(error)
            ),
        }

        if let Some(channel) = channel {
            let report = FailureReport {
                correlation_id,
                command_name: command_name.map(str::to_string),
                message: GENERIC_FAILURE_MESSAGE.to_string(),
            };
            self.messages.send_failure_notification(channel, &report);
        }
    }
}

fn render_chain(error: &DynError) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
