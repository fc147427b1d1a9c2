//! Chain-of-responsibility command interceptors
//!
//! The chain is assembled once from the ordered specification list in
//! [`PipelineConfig`]: each configured node owns the node built from the rest
//! of the list, and the last configured node owns the fixed terminal executor.
//! Node construction goes through an explicit factory table keyed by the
//! node-kind string; factories resolve extra parameters by type against the
//! [`ComponentRegistry`].

use std::time::Instant;

use ahash::AHashMap;

use crate::command::Command;
use crate::concurrent::context::Current;
use crate::core::config::{ExceptionPolicy, InterceptorSpec, PipelineConfig};
use crate::core::error::{BoxError, ChainBuildError};
use crate::registry::ComponentRegistry;

/// A link in the assembled chain. Invoking `intercept` on the head runs the
/// whole pipeline.
pub trait CommandInterceptor: Send + Sync {
    fn intercept(&self, command: &mut dyn Command) -> Result<(), BoxError>;
}

/// The node-specific logic a configured interceptor contributes.
///
/// A node never invokes its successor itself; the chain does, according to the
/// node's configured exception policy.
pub trait ChainableInterceptor: Send + Sync {
    fn perform_chained(&self, command: &mut dyn Command) -> Result<(), BoxError>;
}

/// Factory assembling one node from its configured parameters
pub type InterceptorFactory = Box<
    dyn Fn(&ComponentRegistry, &toml::Table) -> Result<Box<dyn ChainableInterceptor>, ChainBuildError>
        + Send
        + Sync,
>;

#[derive(Default)]
pub struct InterceptorFactoryRegistry {
    factories: AHashMap<String, InterceptorFactory>,
}

impl InterceptorFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in node kinds (`monitoring`)
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("monitoring", |_components, _params| {
            Ok(Box::new(MonitoringInterceptor))
        });
        registry
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&ComponentRegistry, &toml::Table) -> Result<Box<dyn ChainableInterceptor>, ChainBuildError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    fn create(
        &self,
        kind: &str,
        components: &ComponentRegistry,
        params: &toml::Table,
    ) -> Result<Box<dyn ChainableInterceptor>, ChainBuildError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| ChainBuildError::UnknownKind(kind.to_string()))?;
        factory(components, params)
    }
}

struct ChainLink {
    kind: String,
    policy: ExceptionPolicy,
    node: Box<dyn ChainableInterceptor>,
    next: Box<dyn CommandInterceptor>,
}

impl CommandInterceptor for ChainLink {
    fn intercept(&self, command: &mut dyn Command) -> Result<(), BoxError> {
        if let Err(error) = self.node.perform_chained(command) {
            match self.policy {
                ExceptionPolicy::Rethrow => return Err(error),
                ExceptionPolicy::LogAndContinue => {
                    tracing::warn!(
                        "interceptor {} failed for command {}, continuing chain: {}",
                        self.kind,
                        command.name(),
                        error
                    );
                }
            }
        }

        self.next.intercept(command)
    }
}

/// Fixed final link: runs the command itself. Always present, always
/// propagates the command's error to the chain's caller.
struct TerminalExecutorNode;

impl CommandInterceptor for TerminalExecutorNode {
    fn intercept(&self, command: &mut dyn Command) -> Result<(), BoxError> {
        let started = Instant::now();
        match command.execute() {
            Ok(()) => {
                tracing::debug!(
                    "executed command {} in {:?}",
                    command.name(),
                    started.elapsed()
                );
                Ok(())
            }
            Err(error) => {
                tracing::debug!(
                    "command {} failed after {:?}",
                    command.name(),
                    started.elapsed()
                );
                Err(error)
            }
        }
    }
}

/// The assembled, immutable pipeline. Safe for concurrent invocation from
/// multiple command threads.
pub struct CommandInterceptorChain {
    head: Box<dyn CommandInterceptor>,
    links: usize,
}

impl CommandInterceptorChain {
    pub fn build(
        config: &PipelineConfig,
        factories: &InterceptorFactoryRegistry,
        components: &ComponentRegistry,
    ) -> Result<Self, ChainBuildError> {
        Ok(Self {
            head: build_link(&config.interceptors, factories, components)?,
            links: config.interceptors.len() + 1,
        })
    }

    /// Number of effective links, configured nodes plus the terminal executor
    pub fn links(&self) -> usize {
        self.links
    }

    pub fn intercept(&self, command: &mut dyn Command) -> Result<(), BoxError> {
        self.head.intercept(command)
    }
}

impl CommandInterceptor for CommandInterceptorChain {
    fn intercept(&self, command: &mut dyn Command) -> Result<(), BoxError> {
        self.head.intercept(command)
    }
}

fn build_link(
    specs: &[InterceptorSpec],
    factories: &InterceptorFactoryRegistry,
    components: &ComponentRegistry,
) -> Result<Box<dyn CommandInterceptor>, ChainBuildError> {
    match specs.split_first() {
        None => Ok(Box::new(TerminalExecutorNode)),
        Some((spec, rest)) => {
            let next = build_link(rest, factories, components)?;
            let node = factories.create(&spec.kind, components, &spec.params)?;
            Ok(Box::new(ChainLink {
                kind: spec.kind.clone(),
                policy: spec.policy,
                node,
                next,
            }))
        }
    }
}

/// Built-in observability node: logs each dispatched command with its
/// correlation id and issuing user. Meant for `log_and_continue` policy.
pub struct MonitoringInterceptor;

impl ChainableInterceptor for MonitoringInterceptor {
    fn perform_chained(&self, command: &mut dyn Command) -> Result<(), BoxError> {
        match Current::optional() {
            Some(context) => tracing::debug!(
                correlation_id = %context.correlation_id,
                "dispatching command {} for user {}",
                command.name(),
                context.user.name
            ),
            None => tracing::debug!(
                "dispatching command {} with no execution context",
                command.name()
            ),
        }
        Ok(())
    }
}
