//! Typed exception handler registry
//!
//! Handlers are registered per concrete error type; an error is matched by
//! downcast against the registered types in registration order. At most one
//! handler exists per type — later registrations overwrite.

use std::any::TypeId;

/// Error trait object walked via `source()` during resolution
pub type DynError = dyn std::error::Error + 'static;

/// Outcome of one handler invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The handler performed any user-facing reporting; resolution stops.
    Handled,
    /// Resolution stops and default handling applies.
    Unhandled,
    /// Continue matching from this error's cause.
    SkipToCause,
}

pub(crate) struct HandlerEntry {
    type_id: TypeId,
    type_name: &'static str,
    matches: Box<dyn Fn(&DynError) -> bool + Send + Sync>,
    handle: Box<dyn Fn(&DynError, &DynError) -> Resolution + Send + Sync>,
}

impl HandlerEntry {
    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn invoke(&self, root: &DynError, matched: &DynError) -> Resolution {
        (self.handle)(root, matched)
    }
}

#[derive(Default)]
pub struct ExceptionHandlerRegistry {
    entries: Vec<HandlerEntry>,
}

impl ExceptionHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for errors of concrete type `E`.
    ///
    /// `handler` receives the root error of the chain being resolved and the
    /// matched error (the root itself or one of its causes). Registering a
    /// second handler for the same type replaces the first.
    pub fn register<E, F>(&mut self, handler: F)
    where
        E: std::error::Error + 'static,
        F: Fn(&DynError, &E) -> Resolution + Send + Sync + 'static,
    {
        let entry = HandlerEntry {
            type_id: TypeId::of::<E>(),
            type_name: std::any::type_name::<E>(),
            matches: Box::new(|error| error.is::<E>()),
            handle: Box::new(move |root, matched| match matched.downcast_ref::<E>() {
                Some(concrete) => handler(root, concrete),
                None => Resolution::SkipToCause,
            }),
        };

        match self
            .entries
            .iter_mut()
            .find(|existing| existing.type_id == entry.type_id)
        {
            Some(existing) => {
                tracing::debug!("replacing exception handler for {}", entry.type_name);
                *existing = entry;
            }
            None => self.entries.push(entry),
        }
    }

    pub(crate) fn find(&self, error: &DynError) -> Option<&HandlerEntry> {
        self.entries.iter().find(|entry| (entry.matches)(error))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
