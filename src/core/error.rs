use thiserror::Error;

/// Boxed error crossing the interceptor and loading boundaries. Cause chains
/// are walked via `std::error::Error::source`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Programmer-error signal raised by `require` on an absent ambient key.
///
/// Distinct from ordinary absence, which callers query via `get`/`optional`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no ambient value of type `{type_name}` installed on thread `{thread_name}`")]
pub struct LookupError {
    pub type_name: &'static str,
    pub thread_name: String,
}

impl LookupError {
    pub fn for_type(type_name: &'static str) -> Self {
        Self {
            type_name,
            thread_name: std::thread::current()
                .name()
                .unwrap_or("<unnamed>")
                .to_string(),
        }
    }
}

/// Failure loading or validating the pipeline configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read pipeline config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse pipeline config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("interceptor kind `{0}` configured more than once")]
    DuplicateKind(String),
}

/// Failure assembling the interceptor chain from its specification list
#[derive(Error, Debug)]
pub enum ChainBuildError {
    #[error("no factory registered for interceptor kind `{0}`")]
    UnknownKind(String),

    #[error("interceptor `{kind}` requires component `{component}` which is not registered")]
    MissingComponent {
        kind: String,
        component: &'static str,
    },

    #[error("invalid parameters for interceptor `{kind}`: {message}")]
    InvalidParams { kind: String, message: String },
}

/// Raised by `ComponentRegistry::require` when a type was never registered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no component of type `{0}` registered")]
pub struct ComponentLookupError(pub &'static str);

/// Failure building the worker pool at startup
#[derive(Error, Debug)]
#[error("failed to build worker pool `{name}`: {source}")]
pub struct PoolBuildError {
    pub name: String,
    #[source]
    pub source: rayon::ThreadPoolBuildError,
}

/// User-fault error carrying a message meant for the originating channel.
///
/// Raised by command logic or item loaders when the user asked for something
/// that cannot be done (bad input, missing resource). The built-in exception
/// handler reports the message and considers the error handled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UserError {
    pub message: String,
}

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BoxError>;
