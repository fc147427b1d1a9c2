//! Polymorphic exception handling
//!
//! One resolution procedure backs both failure sites: synchronous command
//! failures (the dispatcher holds the context explicitly) and uncaught
//! worker-thread failures (the context is recovered from the ambient store, if
//! anyone installed it).

pub mod handler;
pub mod resolver;

pub use handler::{ExceptionHandlerRegistry, Resolution};
pub use resolver::{ExceptionResolutionChain, ResolutionOutcome};
