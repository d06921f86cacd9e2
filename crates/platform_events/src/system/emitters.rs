//! Event and hook dispatch.
use super::core::EventSystem;
use super::stats::{EventSystemStats, StatsCounters};
use crate::error::EventError;
use crate::types::{HookValue, Params};
use tracing::{debug, trace};

impl EventSystem {
    /// Triggers an event on a concrete (namespace, event) pair.
    ///
    /// Matching listeners run in merged priority order. The first one to
    /// return `Ok(false)` stops the chain and the call returns `Ok(false)`.
    /// With no listeners, or none vetoing, the result is `Ok(true)`.
    ///
    /// Handler errors are not caught: the first one ends dispatch and is
    /// returned as-is.
    pub fn trigger_event(
        &self,
        namespace: &str,
        event: &str,
        params: &Params<'_>,
    ) -> Result<bool, EventError> {
        StatsCounters::bump(&self.stats.events_triggered, 1);
        let chain = self.events.matching(namespace, event);

        for entry in &chain {
            trace!("📤 {}:{} -> handler at {}", namespace, event, entry.slot);
            StatsCounters::bump(&self.stats.handlers_invoked, 1);

            if !(entry.handler)(namespace, event, params)? {
                StatsCounters::bump(&self.stats.events_vetoed, 1);
                debug!("🚫 {}:{} vetoed by handler at {}", namespace, event, entry.slot);
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Like [`EventSystem::trigger_event`] but turns a veto into
    /// [`EventError::ActionBlocked`].
    pub fn ensure_event(
        &self,
        namespace: &str,
        event: &str,
        params: &Params<'_>,
    ) -> Result<(), EventError> {
        if self.trigger_event(namespace, event, params)? {
            Ok(())
        } else {
            Err(EventError::blocked(namespace, event))
        }
    }

    /// Triggers a hook, folding `default` through every matching listener.
    ///
    /// Each listener sees the current value; returning a non-null `Some`
    /// replaces it for the next one. `Some(HookValue::Null)` counts as no
    /// answer. All listeners always run.
    pub fn trigger_hook(
        &self,
        namespace: &str,
        hook: &str,
        params: &Params<'_>,
        default: HookValue,
    ) -> Result<HookValue, EventError> {
        StatsCounters::bump(&self.stats.hooks_triggered, 1);
        let chain = self.hooks.matching(namespace, hook);

        let mut current = default;
        for entry in &chain {
            trace!("🪝 {}:{} -> handler at {}", namespace, hook, entry.slot);
            StatsCounters::bump(&self.stats.handlers_invoked, 1);

            let result = (entry.handler)(namespace, hook, params, &current)?;
            if let Some(next) = result.filter(|value| !value.is_null()) {
                current = next;
            }
        }

        Ok(current)
    }

    /// Snapshot of registry sizes and dispatch counters.
    pub fn get_stats(&self) -> EventSystemStats {
        EventSystemStats {
            event_handlers: self.events.len(),
            hook_handlers: self.hooks.len(),
            events_triggered: StatsCounters::load(&self.stats.events_triggered),
            events_vetoed: StatsCounters::load(&self.stats.events_vetoed),
            hooks_triggered: StatsCounters::load(&self.stats.hooks_triggered),
            handlers_invoked: StatsCounters::load(&self.stats.handlers_invoked),
        }
    }
}
