//! The contract a storage engine implements.

use super::query::Query;
use crate::error::BackendError;
use crate::Guid;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Which connection a query travels over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    ReadWrite,
    Read,
    Write,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadWrite => "readwrite",
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

/// One result row, column name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Integer column, accepting numeric strings.
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.0.get(column)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text column. Numbers are rendered as text.
    pub fn get_string(&self, column: &str) -> Option<String> {
        match self.0.get(column)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// What executing a query produced.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(Vec<Row>),
    /// Identifier of the created row, if the store assigns one.
    Inserted(Option<Guid>),
    /// Rows touched by an update or delete.
    Affected(u64),
}

/// A storage engine able to run [`Query`] values.
pub trait StorageBackend: Send + Sync {
    /// Engine name used in logs.
    fn name(&self) -> &str;

    /// Opens the given link. Called lazily, once per link.
    fn establish_link(&self, link: LinkKind) -> Result<(), BackendError>;

    /// Runs a query over an established link.
    fn execute(&self, link: LinkKind, query: &Query) -> Result<QueryOutcome, BackendError>;

    /// Cleans a user-supplied string before it is placed in a query.
    ///
    /// The default trims surrounding whitespace, matching SQL-style stores.
    fn sanitize(&self, value: &str) -> String {
        value.trim().to_string()
    }
}
