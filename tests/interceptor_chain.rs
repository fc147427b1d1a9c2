//! Integration tests for the command interceptor pipeline

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cadence::command::{
    ChainableInterceptor, Command, CommandDispatcher, CommandInterceptorChain, DispatchOutcome,
    InterceptorFactoryRegistry,
};
use cadence::concurrent::ExecutionContext;
use cadence::core::config::PipelineConfig;
use cadence::core::error::{BoxError, UserError};
use cadence::core::types::{ChannelRef, GuildId, UserRef};
use cadence::exceptions::ExceptionResolutionChain;
use cadence::messaging::{FailureReport, MessageService};
use cadence::registry::ComponentRegistry;

#[derive(Default)]
struct RecordingMessages {
    notifications: Mutex<Vec<FailureReport>>,
    messages: Mutex<Vec<String>>,
}

impl MessageService for RecordingMessages {
    fn send_message(&self, _channel: &ChannelRef, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn send_failure_notification(&self, _channel: &ChannelRef, report: &FailureReport) {
        self.notifications.lock().unwrap().push(report.clone());
    }
}

struct StepNode {
    label: &'static str,
    trace: Arc<Mutex<Vec<&'static str>>>,
    fail: bool,
}

impl ChainableInterceptor for StepNode {
    fn perform_chained(&self, _command: &mut dyn Command) -> Result<(), BoxError> {
        self.trace.lock().unwrap().push(self.label);
        if self.fail {
            Err(Box::new(UserError::new(format!("{} rejected", self.label))))
        } else {
            Ok(())
        }
    }
}

struct TracingCommand {
    executions: Arc<AtomicUsize>,
}

impl Command for TracingCommand {
    fn name(&self) -> &str {
        "trace"
    }

    fn execute(&mut self) -> Result<(), BoxError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn factories(trace: &Arc<Mutex<Vec<&'static str>>>, failing: &'static str) -> InterceptorFactoryRegistry {
    let mut factories = InterceptorFactoryRegistry::with_builtins();
    for label in ["validation", "history", "metrics"] {
        let trace = Arc::clone(trace);
        factories.register(label, move |_, _| {
            Ok(Box::new(StepNode {
                label,
                trace: Arc::clone(&trace),
                fail: label == failing,
            }))
        });
    }
    factories
}

fn context() -> ExecutionContext {
    ExecutionContext::new(
        GuildId(9),
        ChannelRef::new(GuildId(9), 90),
        UserRef::new(900, "chain-tester"),
    )
}

const THREE_NODE_CONFIG: &str = r#"
[[interceptor]]
kind = "validation"

[[interceptor]]
kind = "history"

[[interceptor]]
kind = "metrics"
policy = "log_and_continue"
"#;

/// N configured nodes produce N+1 effective links and, when every node
/// succeeds, the terminal node executes the command exactly once
#[test]
fn test_chain_completeness() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig::from_toml_str(THREE_NODE_CONFIG).unwrap();
    let chain = CommandInterceptorChain::build(
        &config,
        &factories(&trace, "none"),
        &ComponentRegistry::new(),
    )
    .unwrap();

    assert_eq!(chain.links(), 4);

    let executions = Arc::new(AtomicUsize::new(0));
    let mut command = TracingCommand {
        executions: Arc::clone(&executions),
    };
    chain.intercept(&mut command).unwrap();

    assert_eq!(
        trace.lock().unwrap().as_slice(),
        ["validation", "history", "metrics"]
    );
    assert_eq!(executions.load(Ordering::SeqCst), 1);
}

/// A rethrowing node prevents all later nodes and the terminal executor from
/// running, and its error reaches the chain's caller unchanged
#[test]
fn test_rethrow_policy() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig::from_toml_str(THREE_NODE_CONFIG).unwrap();
    let chain = CommandInterceptorChain::build(
        &config,
        &factories(&trace, "history"),
        &ComponentRegistry::new(),
    )
    .unwrap();

    let executions = Arc::new(AtomicUsize::new(0));
    let mut command = TracingCommand {
        executions: Arc::clone(&executions),
    };
    let error = chain.intercept(&mut command).unwrap_err();

    assert_eq!(error.to_string(), "history rejected");
    assert_eq!(trace.lock().unwrap().as_slice(), ["validation", "history"]);
    assert_eq!(executions.load(Ordering::SeqCst), 0);
}

/// A log-and-continue node that fails does not stop the chain and its error
/// never reaches the caller
#[test]
fn test_log_and_continue_policy() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig::from_toml_str(THREE_NODE_CONFIG).unwrap();
    let chain = CommandInterceptorChain::build(
        &config,
        &factories(&trace, "metrics"),
        &ComponentRegistry::new(),
    )
    .unwrap();

    let executions = Arc::new(AtomicUsize::new(0));
    let mut command = TracingCommand {
        executions: Arc::clone(&executions),
    };
    chain.intercept(&mut command).unwrap();

    assert_eq!(
        trace.lock().unwrap().as_slice(),
        ["validation", "history", "metrics"]
    );
    assert_eq!(executions.load(Ordering::SeqCst), 1);
}

/// A command failure escaping the chain is resolved: the user-fault handler
/// reports to the channel and the dispatcher removes the context afterwards
#[test]
fn test_dispatcher_routes_failure_through_resolution() {
    let messages = Arc::new(RecordingMessages::default());
    let resolver = Arc::new(ExceptionResolutionChain::with_defaults(
        Arc::clone(&messages) as Arc<dyn MessageService>,
    ));

    let chain = CommandInterceptorChain::build(
        &PipelineConfig::default(),
        &InterceptorFactoryRegistry::new(),
        &ComponentRegistry::new(),
    )
    .unwrap();
    let dispatcher = CommandDispatcher::new(chain, resolver);

    struct RejectedCommand;

    impl Command for RejectedCommand {
        fn name(&self) -> &str {
            "rejected"
        }

        fn execute(&mut self) -> Result<(), BoxError> {
            Err(Box::new(UserError::new("that playlist does not exist")))
        }
    }

    let outcome = dispatcher.dispatch(&mut RejectedCommand, context());

    assert_eq!(outcome, DispatchOutcome::Failed);
    assert_eq!(
        messages.messages.lock().unwrap().as_slice(),
        ["that playlist does not exist"]
    );
    assert!(messages.notifications.lock().unwrap().is_empty());
    assert!(!cadence::concurrent::Current::is_installed());
}

/// An unexpected failure falls through to default handling: a generic
/// notification carrying the invocation's correlation id
#[test]
fn test_unexpected_failure_gets_generic_notification() {
    #[derive(Debug, thiserror::Error)]
    #[error("database connection lost")]
    struct DatabaseError;

    let messages = Arc::new(RecordingMessages::default());
    let resolver = Arc::new(ExceptionResolutionChain::with_defaults(
        Arc::clone(&messages) as Arc<dyn MessageService>,
    ));

    let chain = CommandInterceptorChain::build(
        &PipelineConfig::default(),
        &InterceptorFactoryRegistry::new(),
        &ComponentRegistry::new(),
    )
    .unwrap();
    let dispatcher = CommandDispatcher::new(chain, resolver);

    struct DoomedCommand;

    impl Command for DoomedCommand {
        fn name(&self) -> &str {
            "doomed"
        }

        fn execute(&mut self) -> Result<(), BoxError> {
            Err(Box::new(DatabaseError))
        }
    }

    let context = context();
    let correlation_id = context.correlation_id;
    let outcome = dispatcher.dispatch(&mut DoomedCommand, context);

    assert_eq!(outcome, DispatchOutcome::Failed);
    let notifications = messages.notifications.lock().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].correlation_id, Some(correlation_id));
    assert_eq!(notifications[0].command_name.as_deref(), Some("doomed"));
}
