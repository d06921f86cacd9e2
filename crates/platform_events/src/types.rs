//! Values passed into and returned from handlers.

use crate::error::EventError;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Handler ordering key. Lower values run first.
pub type Priority = i32;

/// Priority used when a caller does not pick one.
pub const DEFAULT_PRIORITY: Priority = 500;

/// Event listener: returning `Ok(false)` vetoes the event.
pub type EventHandler =
    Arc<dyn Fn(&str, &str, &Params<'_>) -> Result<bool, EventError> + Send + Sync + 'static>;

/// Hook listener: returning `Ok(Some(value))` replaces the running value,
/// `Ok(None)` leaves it untouched.
pub type HookHandler = Arc<
    dyn Fn(&str, &str, &Params<'_>, &HookValue) -> Result<Option<HookValue>, EventError>
        + Send
        + Sync
        + 'static,
>;

/// Named parameters handed to every listener of a dispatch, plus an optional
/// borrowed subject (the entity a lifecycle event is about).
#[derive(Default, Clone)]
pub struct Params<'a> {
    values: Map<String, Value>,
    object: Option<&'a dyn Any>,
}

impl<'a> Params<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Attaches the subject object.
    pub fn with_object(mut self, object: &'a dyn Any) -> Self {
        self.object = Some(object);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Downcasts the subject, if one was attached and has type `T`.
    pub fn object<T: Any>(&self) -> Option<&'a T> {
        self.object.and_then(|object| object.downcast_ref::<T>())
    }

    pub fn has_object(&self) -> bool {
        self.object.is_some()
    }
}

impl fmt::Debug for Params<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Params")
            .field("values", &self.values)
            .field("object", &self.object.is_some())
            .finish()
    }
}

impl From<Map<String, Value>> for Params<'_> {
    fn from(values: Map<String, Value>) -> Self {
        Self {
            values,
            object: None,
        }
    }
}

/// The running value folded through a hook chain.
#[derive(Clone, Default)]
pub enum HookValue {
    #[default]
    Null,
    Bool(bool),
    Json(Value),
    /// A constructed service or domain object.
    Object(Arc<dyn Any + Send + Sync>),
}

impl HookValue {
    /// Wraps any shareable value. Trait objects are stored as their `Arc`,
    /// e.g. `HookValue::object(cache as Arc<dyn Cache>)`.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Self::Object(Arc::new(value))
    }

    /// True for `Null` and for JSON `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Json(Value::Null))
    }

    /// Loose truthiness: null, `false`, zero, empty strings and empty arrays
    /// are unset. Factories use this to decide whether to pass a value through.
    pub fn is_set(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(value) => *value,
            Self::Json(value) => json_truthy(value),
            Self::Object(_) => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Json(Value::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Json(Value::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Object(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Clones the wrapped object out when it has type `T`.
    pub fn object_cloned<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }
}

fn json_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(value) => *value,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(value) => !value.is_empty() && value != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

impl fmt::Debug for HookValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl From<bool> for HookValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Value> for HookValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for HookValue {
    fn from(value: &str) -> Self {
        Self::Json(Value::String(value.to_string()))
    }
}

impl From<String> for HookValue {
    fn from(value: String) -> Self {
        Self::Json(Value::String(value))
    }
}
