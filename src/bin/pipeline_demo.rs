//! Headless pipeline driver - wires a full command path end to end
//!
//! Builds the interceptor chain from an inline configuration, dispatches a
//! succeeding and a failing command, and runs a pooled bulk load with a bad
//! item to show asynchronous failure attribution.

use std::sync::Arc;
use std::time::Duration;

use cadence::command::{
    ChainableInterceptor, Command, CommandDispatcher, CommandInterceptorChain,
    InterceptorFactoryRegistry,
};
use cadence::concurrent::{ExecutionContext, ThreadExecutionQueue, WorkerPool};
use cadence::core::config::PipelineConfig;
use cadence::core::error::{BoxError, ChainBuildError, UserError};
use cadence::core::types::{ChannelRef, GuildId, UserRef};
use cadence::exceptions::ExceptionResolutionChain;
use cadence::loading::{BulkLoadingTask, ItemLoader, PooledLoadingStrategy};
use cadence::messaging::{FailureReport, MessageService};
use cadence::registry::ComponentRegistry;

const PIPELINE: &str = r#"
[[interceptor]]
kind = "permission"

[[interceptor]]
kind = "monitoring"
policy = "log_and_continue"
"#;

/// Stands in for the chat transport: prints what would be sent
struct ConsoleMessageService;

impl MessageService for ConsoleMessageService {
    fn send_message(&self, channel: &ChannelRef, message: &str) {
        println!("  -> [{channel}] {message}");
    }

    fn send_failure_notification(&self, channel: &ChannelRef, report: &FailureReport) {
        println!("  -> [{channel}] {}", report.message);
    }
}

/// Stands in for the permission collaborator
struct PermissionList {
    banned_user: u64,
}

struct PermissionInterceptor {
    permissions: Arc<PermissionList>,
}

impl ChainableInterceptor for PermissionInterceptor {
    fn perform_chained(&self, command: &mut dyn Command) -> Result<(), BoxError> {
        let context = cadence::concurrent::Current::require()?;
        if context.user.user_id == self.permissions.banned_user {
            return Err(Box::new(UserError::new(format!(
                "you are not allowed to use {}",
                command.name()
            ))));
        }
        Ok(())
    }
}

struct EchoCommand {
    message: String,
}

impl Command for EchoCommand {
    fn name(&self) -> &str {
        "echo"
    }

    fn execute(&mut self) -> Result<(), BoxError> {
        println!("  echo: {}", self.message);
        Ok(())
    }
}

struct TrackLoader;

impl ItemLoader<String> for TrackLoader {
    fn load_item(&mut self, item: &String) -> Result<(), BoxError> {
        if item == "missing-track" {
            return Err(Box::new(UserError::new(format!("no result for {item}"))));
        }
        println!("  loaded {item}");
        Ok(())
    }

    fn handle_cancellation(&mut self) {
        println!("  loader cleaned up remaining items");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let messages: Arc<dyn MessageService> = Arc::new(ConsoleMessageService);
    let resolver = Arc::new(ExceptionResolutionChain::with_defaults(Arc::clone(
        &messages,
    )));

    let mut components = ComponentRegistry::new();
    components.register(PermissionList { banned_user: 666 });

    let mut factories = InterceptorFactoryRegistry::with_builtins();
    factories.register("permission", |components, _params| {
        let permissions = components
            .require::<PermissionList>()
            .map_err(|_| ChainBuildError::MissingComponent {
                kind: "permission".to_string(),
                component: "PermissionList",
            })?;
        Ok(Box::new(PermissionInterceptor { permissions }))
    });

    let config = PipelineConfig::from_toml_str(PIPELINE)?;
    let chain = CommandInterceptorChain::build(&config, &factories, &components)?;
    println!("built chain with {} links", chain.links());

    let dispatcher = CommandDispatcher::new(chain, Arc::clone(&resolver));
    let guild = GuildId(1);
    let channel = ChannelRef::new(guild, 100);

    println!("\n--- command from a regular user ---");
    let context = ExecutionContext::new(guild, channel.clone(), UserRef::new(1, "alice"));
    let mut command = EchoCommand {
        message: "hello".to_string(),
    };
    let outcome = dispatcher.dispatch(&mut command, context);
    println!("outcome: {outcome:?}");

    println!("\n--- command from the banned user ---");
    let context = ExecutionContext::new(guild, channel.clone(), UserRef::new(666, "mallory"));
    let mut command = EchoCommand {
        message: "should not print".to_string(),
    };
    let outcome = dispatcher.dispatch(&mut command, context);
    println!("outcome: {outcome:?}");

    println!("\n--- pooled bulk load with a failing item ---");
    let pool = Arc::new(WorkerPool::new("demo-loader", 2)?);
    let queue = ThreadExecutionQueue::new("demo-guild-queue", 2, pool);
    let strategy = PooledLoadingStrategy::new(queue, resolver);

    let context = ExecutionContext::new(guild, channel, UserRef::new(1, "alice"));
    let _scope = cadence::concurrent::ContextScope::install(context);

    let mut task = BulkLoadingTask::new(TrackLoader);
    task.add_items(
        ["track-1", "track-2", "missing-track", "track-4"]
            .map(String::from),
    );
    let handle = strategy.execute(task);
    let state = handle.wait_timeout(Duration::from_secs(10));
    println!("terminal state: {state:?}");

    Ok(())
}
