/// Handler registration methods
use super::core::EventSystem;
use crate::error::EventError;
use crate::types::{HookValue, Params, Priority, DEFAULT_PRIORITY};
use std::sync::Arc;
use tracing::debug;

impl EventSystem {
    /// Registers an event listener at the default priority.
    pub fn on_event<F>(&self, namespace: &str, event: &str, handler: F) -> Result<Priority, EventError>
    where
        F: Fn(&str, &str, &Params<'_>) -> Result<bool, EventError> + Send + Sync + 'static,
    {
        self.register_event(namespace, event, handler, DEFAULT_PRIORITY)
    }

    /// Registers an event listener for a (namespace, event) pattern pair.
    ///
    /// Both arguments accept `*` and `all` wildcards. Returns the priority the
    /// listener was stored under, which is higher than requested when the slot
    /// was already taken.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use platform_events::{EventSystem, Params};
    ///
    /// let events = EventSystem::new();
    /// events
    ///     .register_event("obj:*", "deleting", |_, _, _| Ok(false), 10)
    ///     .unwrap();
    /// assert!(!events.trigger_event("obj:blog", "deleting", &Params::new()).unwrap());
    /// ```
    pub fn register_event<F>(
        &self,
        namespace: &str,
        event: &str,
        handler: F,
        priority: Priority,
    ) -> Result<Priority, EventError>
    where
        F: Fn(&str, &str, &Params<'_>) -> Result<bool, EventError> + Send + Sync + 'static,
    {
        let assigned = self
            .events
            .register(namespace, event, Arc::new(handler), priority)?;
        debug!("📝 Registered event handler for {}:{} at {}", namespace, event, assigned);
        Ok(assigned)
    }

    /// Registers a hook listener at the default priority.
    pub fn on_hook<F>(&self, namespace: &str, hook: &str, handler: F) -> Result<Priority, EventError>
    where
        F: Fn(&str, &str, &Params<'_>, &HookValue) -> Result<Option<HookValue>, EventError>
            + Send
            + Sync
            + 'static,
    {
        self.register_hook(namespace, hook, handler, DEFAULT_PRIORITY)
    }

    /// Registers a hook listener for a (namespace, hook) pattern pair.
    pub fn register_hook<F>(
        &self,
        namespace: &str,
        hook: &str,
        handler: F,
        priority: Priority,
    ) -> Result<Priority, EventError>
    where
        F: Fn(&str, &str, &Params<'_>, &HookValue) -> Result<Option<HookValue>, EventError>
            + Send
            + Sync
            + 'static,
    {
        let assigned = self
            .hooks
            .register(namespace, hook, Arc::new(handler), priority)?;
        debug!("📝 Registered hook handler for {}:{} at {}", namespace, hook, assigned);
        Ok(assigned)
    }

    /// Whether an event bucket exists for exactly this pattern pair.
    pub fn is_event_handled(&self, namespace: &str, event: &str) -> Result<bool, EventError> {
        self.events.is_registered(namespace, event)
    }

    /// Whether a hook bucket exists for exactly this pattern pair.
    pub fn is_hook_handled(&self, namespace: &str, hook: &str) -> Result<bool, EventError> {
        self.hooks.is_registered(namespace, hook)
    }

    /// Whether triggering this concrete event would reach any listener.
    pub fn has_event_listeners(&self, namespace: &str, event: &str) -> bool {
        self.events.has_matching(namespace, event)
    }

    /// Whether triggering this concrete hook would reach any listener.
    pub fn has_hook_listeners(&self, namespace: &str, hook: &str) -> bool {
        self.hooks.has_matching(namespace, hook)
    }
}
