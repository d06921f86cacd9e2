//! Error types for persistence, caching and entity handling.

use platform_events::EventError;
use thiserror::Error;

/// Errors raised by cache providers.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors reported by a storage backend or the engine wrapping it.
#[derive(Error, Debug)]
pub enum BackendError {
    /// A link to the store could not be established.
    #[error("Connection error on {link} link: {message}")]
    Connection {
        /// Link that failed.
        link: String,
        /// Backend-provided reason.
        message: String,
    },

    /// The backend rejected or failed a query.
    #[error("Query failed: {message} [{query}]")]
    Query {
        /// Transcript of the failing query.
        query: String,
        /// Backend-provided reason.
        message: String,
    },

    /// A predicate used an operator the backend does not understand.
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Query cache error: {0}")]
    Cache(#[from] CacheError),
}

impl BackendError {
    #[must_use]
    pub fn connection(link: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            link: link.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn query(query: impl ToString, message: impl Into<String>) -> Self {
        Self::Query {
            query: query.to_string(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by entity lifecycle and search operations.
///
/// A veto from a lifecycle listener is not an error; those operations return
/// `Ok(None)` / `Ok(false)` instead.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Entity of class {class} has no type and cannot be saved")]
    MissingType { class: String },

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("Cannot create {kind}: partner entity has not been saved")]
    UnsavedPartner { kind: &'static str },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Event system error: {0}")]
    Event(#[from] EventError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DataError {
    #[must_use]
    pub fn invalid_row(reason: impl Into<String>) -> Self {
        Self::InvalidRow(reason.into())
    }

    #[must_use]
    pub fn unsaved_partner(kind: &'static str) -> Self {
        Self::UnsavedPartner { kind }
    }
}
