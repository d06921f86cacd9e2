//! Named service construction on top of the hook dispatcher.
//!
//! A factory is a hook listener in the reserved [`FACTORY_NAMESPACE`] keyed by
//! a resource name such as `cache:database` or `database:engine:default`.
//! Asking for a resource triggers that hook with a null starting value.
//!
//! Because hooks fold, a factory registered later sees what earlier ones
//! produced and may replace it. Built-in factories check
//! [`HookValue::is_set`] and pass an upstream value through unchanged; a
//! plugin that wants to override one should register *after* it without that
//! check, or at a higher priority number.

use crate::error::EventError;
use crate::system::EventSystem;
use crate::types::{HookValue, Params, Priority, DEFAULT_PRIORITY};
use std::any::Any;
use tracing::debug;

/// Hook namespace reserved for factories.
pub const FACTORY_NAMESPACE: &str = "factory";

impl EventSystem {
    /// Registers a factory for `name` at the default priority.
    pub fn on_factory<F>(&self, name: &str, handler: F) -> Result<Priority, EventError>
    where
        F: Fn(&str, &str, &Params<'_>, &HookValue) -> Result<Option<HookValue>, EventError>
            + Send
            + Sync
            + 'static,
    {
        self.register_factory(name, handler, DEFAULT_PRIORITY)
    }

    /// Registers a factory for `name` at `priority`.
    pub fn register_factory<F>(
        &self,
        name: &str,
        handler: F,
        priority: Priority,
    ) -> Result<Priority, EventError>
    where
        F: Fn(&str, &str, &Params<'_>, &HookValue) -> Result<Option<HookValue>, EventError>
            + Send
            + Sync
            + 'static,
    {
        self.register_hook(FACTORY_NAMESPACE, name, handler, priority)
    }

    /// Runs the factory chain for `name` and returns whatever it produced.
    pub fn factory(&self, name: &str, params: &Params<'_>) -> Result<HookValue, EventError> {
        let value = self.trigger_hook(FACTORY_NAMESPACE, name, params, HookValue::Null)?;
        debug!("🏭 Factory {} produced {:?}", name, value);
        Ok(value)
    }

    /// Runs the factory chain and downcasts the result.
    ///
    /// `Ok(None)` when nothing was produced, caching was disabled (`false`), or
    /// the product is not a `T`. Trait objects are requested as their `Arc`,
    /// e.g. `factory_object::<Arc<dyn Cache>>("cache")`.
    pub fn factory_object<T>(&self, name: &str, params: &Params<'_>) -> Result<Option<T>, EventError>
    where
        T: Any + Clone,
    {
        Ok(self.factory(name, params)?.object_cloned::<T>())
    }

    /// Like [`EventSystem::factory_object`] but a missing product is an error.
    pub fn require_factory<T>(&self, name: &str, params: &Params<'_>) -> Result<T, EventError>
    where
        T: Any + Clone,
    {
        self.factory_object::<T>(name, params)?
            .ok_or_else(|| EventError::FactoryUnavailable(name.to_string()))
    }

    /// Whether any factory listener would answer for `name`.
    pub fn has_factory(&self, name: &str) -> bool {
        self.has_hook_listeners(FACTORY_NAMESPACE, name)
    }
}
