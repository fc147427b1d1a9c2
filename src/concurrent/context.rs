//! Per-invocation execution context and its thread-scoped accessor
//!
//! An `ExecutionContext` is created when a command invocation starts and
//! installed into the current thread's ambient store so that any collaborator
//! downstream can recover "which command, which channel, which guild" without
//! parameter plumbing. It is a value type: handing work to another thread means
//! installing a [`ExecutionContext::fork`] there, never sharing a reference.

use crate::concurrent::ambient;
use crate::core::error::LookupError;
use crate::core::types::{
    ChannelRef, CorrelationId, GuildId, ScriptParameters, ScriptValue, SessionHandle, UserRef,
};

/// Context for the command invocation executed by the current thread
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub correlation_id: CorrelationId,
    pub guild_id: GuildId,
    pub channel: ChannelRef,
    pub user: UserRef,
    session: Option<SessionHandle>,
    pub script_parameters: ScriptParameters,
}

impl ExecutionContext {
    pub fn new(guild_id: GuildId, channel: ChannelRef, user: UserRef) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            guild_id,
            channel,
            user,
            session: None,
            script_parameters: ScriptParameters::new(),
        }
    }

    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_script_parameter(mut self, name: impl Into<String>, value: ScriptValue) -> Self {
        self.script_parameters.insert(name.into(), value);
        self
    }

    pub fn set_session(&mut self, session: SessionHandle) {
        self.session = Some(session);
    }

    /// The persistence session attached to this context, if any. Sessions are
    /// thread-confined; forked copies never carry one.
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Copy of this context for installation on another thread.
    ///
    /// Same correlation id — the forked work still belongs to the same
    /// invocation — but without the session handle.
    pub fn fork(&self) -> Self {
        Self {
            correlation_id: self.correlation_id,
            guild_id: self.guild_id,
            channel: self.channel.clone(),
            user: self.user.clone(),
            session: None,
            script_parameters: self.script_parameters.clone(),
        }
    }
}

/// Static access to the current thread's `ExecutionContext`
pub struct Current;

impl Current {
    pub fn install(context: ExecutionContext) {
        ambient::install(context);
    }

    pub fn optional() -> Option<ExecutionContext> {
        ambient::get::<ExecutionContext>()
    }

    /// Absence here is a bug in the caller's install/remove discipline
    pub fn require() -> Result<ExecutionContext, LookupError> {
        ambient::require::<ExecutionContext>()
    }

    pub fn remove() -> Option<ExecutionContext> {
        ambient::remove::<ExecutionContext>()
    }

    pub fn is_installed() -> bool {
        ambient::is_installed::<ExecutionContext>()
    }
}

/// Installs a context on creation and removes it when dropped, so removal
/// happens on every exit path of the invocation, including unwinds.
#[must_use = "dropping the scope immediately removes the context again"]
pub struct ContextScope(());

impl ContextScope {
    pub fn install(context: ExecutionContext) -> Self {
        Current::install(context);
        Self(())
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        Current::remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context() -> ExecutionContext {
        ExecutionContext::new(
            GuildId(1),
            ChannelRef::new(GuildId(1), 10),
            UserRef::new(100, "tester"),
        )
    }

    #[test]
    fn test_current_scoping() {
        assert!(Current::optional().is_none());

        let context = test_context();
        let id = context.correlation_id;
        Current::install(context);
        assert_eq!(Current::optional().map(|c| c.correlation_id), Some(id));

        Current::remove();
        assert!(Current::optional().is_none());
    }

    #[test]
    fn test_require_fails_without_context() {
        assert!(Current::optional().is_none());
        let err = Current::require().unwrap_err();
        assert!(err.to_string().contains("ExecutionContext"));
    }

    #[test]
    fn test_scope_removes_on_drop() {
        {
            let _scope = ContextScope::install(test_context());
            assert!(Current::is_installed());
        }
        assert!(!Current::is_installed());
    }

    #[test]
    fn test_scope_removes_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _scope = ContextScope::install(test_context());
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(!Current::is_installed());
    }

    #[test]
    fn test_fork_keeps_id_drops_session() {
        struct FakeSession;

        let context = test_context().with_session(SessionHandle::new(FakeSession));
        let fork = context.fork();

        assert_eq!(fork.correlation_id, context.correlation_id);
        assert_eq!(fork.channel, context.channel);
        assert!(context.session().is_some());
        assert!(fork.session().is_none());
    }

    #[test]
    fn test_no_cross_thread_leakage() {
        let context = test_context();
        Current::install(context);

        let seen_elsewhere = std::thread::spawn(|| Current::optional().is_some())
            .join()
            .unwrap();
        assert!(!seen_elsewhere);

        Current::remove();
    }
}
