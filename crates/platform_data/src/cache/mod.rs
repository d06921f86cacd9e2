//! Key/value cache providers.
//!
//! Caches are obtained through the factory registry (see [`factory`]) so a
//! plugin can swap the implementation behind any logical cache name.

pub mod factory;
mod file;
mod memory;

pub use factory::{register_cache_factories, CacheSettings, CACHE_FACTORIES};
pub use file::FileCache;
pub use memory::MemoryCache;

use crate::error::CacheError;
use serde_json::Value;

/// A namespaced key/value store.
pub trait Cache: Send + Sync {
    /// Namespace this cache writes into.
    fn namespace(&self) -> &str;

    /// Stores `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &Value) -> Result<(), CacheError>;

    /// Loads the value stored under `key`.
    fn load(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Removes `key`. Returns whether something was removed.
    fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Removes every key in the namespace.
    fn clear(&self) -> Result<(), CacheError>;

    /// Number of keys in the namespace.
    fn size(&self) -> Result<usize, CacheError>;

    /// Stores `value` only if `key` is absent. Returns whether it was stored.
    fn add(&self, key: &str, value: &Value) -> Result<bool, CacheError> {
        if self.load(key)?.is_some() {
            return Ok(false);
        }
        self.save(key, value)?;
        Ok(true)
    }
}
