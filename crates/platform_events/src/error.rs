//! Error types raised by pattern compilation, dispatch and factories.

use thiserror::Error;

/// Boxed error produced by a handler and carried through dispatch untouched.
pub type HandlerFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum EventError {
    /// A namespace or event pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Every priority slot above the requested one is taken.
    #[error("No free priority slot at or above {0}")]
    PriorityExhausted(i32),

    /// A handler failed. Dispatch stops and the failure reaches the caller.
    #[error("Handler execution error: {0}")]
    Handler(#[source] HandlerFailure),

    /// A veto event was blocked by one of its listeners.
    #[error("Action blocked by a listener on {namespace}:{event}")]
    ActionBlocked { namespace: String, event: String },

    /// A required factory produced nothing usable.
    #[error("Factory could not produce '{0}'")]
    FactoryUnavailable(String),
}

impl EventError {
    /// Wraps any error raised inside a handler.
    pub fn handler<E>(error: E) -> Self
    where
        E: Into<HandlerFailure>,
    {
        Self::Handler(error.into())
    }

    pub fn blocked(namespace: &str, event: &str) -> Self {
        Self::ActionBlocked {
            namespace: namespace.to_string(),
            event: event.to_string(),
        }
    }

    /// Returns true when the error represents a veto rather than a failure.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::ActionBlocked { .. })
    }
}
