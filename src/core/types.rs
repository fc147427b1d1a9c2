//! Core type definitions used throughout the codebase

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one command invocation, carried into async work and
/// error reports to allow attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for guilds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
pub struct GuildId(pub u64);

/// Reference to a text channel where reports and replies are sent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef {
    pub guild_id: GuildId,
    pub channel_id: u64,
}

impl ChannelRef {
    pub fn new(guild_id: GuildId, channel_id: u64) -> Self {
        Self {
            guild_id,
            channel_id,
        }
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.guild_id, self.channel_id)
    }
}

/// Reference to the user that issued a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub user_id: u64,
    pub name: String,
}

impl UserRef {
    pub fn new(user_id: u64, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
        }
    }
}

/// Value passed to the scripting collaborator via `ExecutionContext::script_parameters`
pub type ScriptValue = serde_json::Value;

/// Named parameter map handed to the scripting collaborator
pub type ScriptParameters = AHashMap<String, ScriptValue>;

/// Opaque handle to a persistence session owned by an external collaborator.
///
/// The core never inspects the session; it only carries the handle so that
/// collaborators running on the command thread can reach it. Sessions are
/// thread-confined, which is why [`crate::concurrent::ExecutionContext::fork`]
/// does not carry the handle to other threads.
#[derive(Clone)]
pub struct SessionHandle(Arc<dyn Any + Send + Sync>);

impl SessionHandle {
    pub fn new<S: Any + Send + Sync>(session: S) -> Self {
        Self(Arc::new(session))
    }

    /// Downcast to the collaborator's concrete session type.
    pub fn downcast_ref<S: Any>(&self) -> Option<&S> {
        self.0.downcast_ref::<S>()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionHandle(..)")
    }
}
