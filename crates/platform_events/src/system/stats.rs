//! Dispatch counters.
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of dispatch activity.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSystemStats {
    /// Registered event listeners
    pub event_handlers: usize,
    /// Registered hook listeners
    pub hook_handlers: usize,
    /// Events triggered since start
    pub events_triggered: u64,
    /// Events stopped by a listener returning false
    pub events_vetoed: u64,
    /// Hooks triggered since start
    pub hooks_triggered: u64,
    /// Handler invocations across events and hooks
    pub handlers_invoked: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub(crate) events_triggered: AtomicU64,
    pub(crate) events_vetoed: AtomicU64,
    pub(crate) hooks_triggered: AtomicU64,
    pub(crate) handlers_invoked: AtomicU64,
}

impl StatsCounters {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub(crate) fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
