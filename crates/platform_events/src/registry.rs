//! Priority-ordered handler chains keyed by (namespace pattern, event pattern).
//!
//! One registry type backs both the event and the hook tables. Buckets keep
//! their insertion order, which matters: when several buckets match a dispatch
//! their chains are merged in that order, and a handler whose priority slot is
//! already taken in the merged chain is pushed up to the next free slot.

use crate::error::EventError;
use crate::pattern::{Pattern, PatternSyntax};
use crate::types::Priority;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

struct EventBucket<H> {
    event: Pattern,
    handlers: BTreeMap<Priority, H>,
}

struct NamespaceBucket<H> {
    namespace: Pattern,
    events: Vec<EventBucket<H>>,
}

/// A handler picked for a dispatch together with the slot it runs in.
#[derive(Debug, Clone)]
pub struct MatchedHandler<H> {
    /// Slot in the merged chain, after collision shifting.
    pub slot: i64,
    /// Priority the handler was registered with.
    pub priority: Priority,
    pub handler: H,
}

pub struct HandlerRegistry<H> {
    syntax: PatternSyntax,
    buckets: RwLock<Vec<NamespaceBucket<H>>>,
}

impl<H: Clone> HandlerRegistry<H> {
    pub fn new(syntax: PatternSyntax) -> Self {
        Self {
            syntax,
            buckets: RwLock::new(Vec::new()),
        }
    }

    pub fn syntax(&self) -> PatternSyntax {
        self.syntax
    }

    /// Adds a handler and returns the priority it was actually given.
    ///
    /// An occupied priority is never overwritten: the newcomer takes the next
    /// free slot above it in the same bucket.
    pub fn register(
        &self,
        namespace: &str,
        event: &str,
        handler: H,
        priority: Priority,
    ) -> Result<Priority, EventError> {
        let namespace_pattern = Pattern::compile(namespace, self.syntax)?;
        let event_pattern = Pattern::compile(event, self.syntax)?;

        let mut buckets = self.buckets.write();

        let ns_index = match buckets
            .iter()
            .position(|bucket| bucket.namespace == namespace_pattern)
        {
            Some(index) => index,
            None => {
                buckets.push(NamespaceBucket {
                    namespace: namespace_pattern,
                    events: Vec::new(),
                });
                buckets.len() - 1
            }
        };
        let ns_bucket = &mut buckets[ns_index];

        let ev_index = match ns_bucket
            .events
            .iter()
            .position(|bucket| bucket.event == event_pattern)
        {
            Some(index) => index,
            None => {
                ns_bucket.events.push(EventBucket {
                    event: event_pattern,
                    handlers: BTreeMap::new(),
                });
                ns_bucket.events.len() - 1
            }
        };
        let handlers = &mut ns_bucket.events[ev_index].handlers;

        let mut assigned = priority;
        while handlers.contains_key(&assigned) {
            assigned = assigned
                .checked_add(1)
                .ok_or(EventError::PriorityExhausted(priority))?;
        }
        handlers.insert(assigned, handler);

        if assigned != priority {
            debug!(
                "Priority {} taken on {}:{}, handler moved to {}",
                priority, namespace, event, assigned
            );
        }
        Ok(assigned)
    }

    /// True when a bucket exists for exactly this compiled pattern pair.
    ///
    /// This is a key lookup, not a match: `obj:*` being registered does not
    /// make `obj:blog` handled. See [`HandlerRegistry::has_matching`].
    pub fn is_registered(&self, namespace: &str, event: &str) -> Result<bool, EventError> {
        let namespace_pattern = Pattern::compile(namespace, self.syntax)?;
        let event_pattern = Pattern::compile(event, self.syntax)?;

        let buckets = self.buckets.read();
        Ok(buckets
            .iter()
            .filter(|bucket| bucket.namespace == namespace_pattern)
            .flat_map(|bucket| bucket.events.iter())
            .any(|bucket| bucket.event == event_pattern && !bucket.handlers.is_empty()))
    }

    /// True when any bucket would be selected for a dispatch on this pair.
    pub fn has_matching(&self, namespace: &str, event: &str) -> bool {
        let buckets = self.buckets.read();
        buckets
            .iter()
            .filter(|bucket| bucket.namespace.matches(namespace))
            .flat_map(|bucket| bucket.events.iter())
            .any(|bucket| bucket.event.matches(event) && !bucket.handlers.is_empty())
    }

    /// Collects and orders every handler whose bucket matches the concrete
    /// (namespace, event) pair.
    ///
    /// Handlers are cloned out so the lock is released before any of them
    /// runs; a handler may register further handlers or dispatch again.
    pub fn matching(&self, namespace: &str, event: &str) -> Vec<MatchedHandler<H>> {
        let mut merged: BTreeMap<i64, (Priority, H)> = BTreeMap::new();

        {
            let buckets = self.buckets.read();
            for ns_bucket in buckets.iter().filter(|b| b.namespace.matches(namespace)) {
                for ev_bucket in ns_bucket.events.iter().filter(|b| b.event.matches(event)) {
                    for (priority, handler) in &ev_bucket.handlers {
                        let mut slot = i64::from(*priority);
                        while merged.contains_key(&slot) {
                            slot += 1;
                        }
                        merged.insert(slot, (*priority, handler.clone()));
                    }
                }
            }
        }

        merged
            .into_iter()
            .map(|(slot, (priority, handler))| MatchedHandler {
                slot,
                priority,
                handler,
            })
            .collect()
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.buckets
            .read()
            .iter()
            .flat_map(|bucket| bucket.events.iter())
            .map(|bucket| bucket.handlers.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered (namespace, event) pattern sources in bucket order.
    pub fn patterns(&self) -> Vec<(String, String)> {
        self.buckets
            .read()
            .iter()
            .flat_map(|ns| {
                ns.events
                    .iter()
                    .map(move |ev| (ns.namespace.source().to_string(), ev.event.source().to_string()))
            })
            .collect()
    }
}
