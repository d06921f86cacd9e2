/// Core EventSystem implementation
use super::stats::StatsCounters;
use crate::pattern::PatternSyntax;
use crate::registry::HandlerRegistry;
use crate::types::{EventHandler, HookHandler};

/// The dispatch hub shared by the whole application.
///
/// Holds two independent registries: events, whose listeners may veto, and
/// hooks, whose listeners fold a value. Both are keyed by wildcard
/// (namespace, name) pattern pairs and ordered by priority.
///
/// Registration takes a short write lock, so plugins can register through a
/// shared `Arc<EventSystem>` while booting. Dispatch clones the matching chain
/// out of the registry before running it.
pub struct EventSystem {
    /// Veto-style listeners
    pub(super) events: HandlerRegistry<EventHandler>,
    /// Value-folding listeners
    pub(super) hooks: HandlerRegistry<HookHandler>,
    /// Dispatch counters
    pub(super) stats: StatsCounters,
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("syntax", &self.events.syntax())
            .field("event_handlers", &self.events.len())
            .field("hook_handlers", &self.hooks.len())
            .finish()
    }
}

impl EventSystem {
    /// Creates an event system using the legacy pattern rules.
    pub fn new() -> Self {
        Self::with_syntax(PatternSyntax::default())
    }

    /// Creates an event system with an explicit pattern syntax.
    pub fn with_syntax(syntax: PatternSyntax) -> Self {
        Self {
            events: HandlerRegistry::new(syntax),
            hooks: HandlerRegistry::new(syntax),
            stats: StatsCounters::default(),
        }
    }

    #[inline]
    pub fn syntax(&self) -> PatternSyntax {
        self.events.syntax()
    }

    /// Registered event pattern pairs, in bucket order.
    pub fn event_patterns(&self) -> Vec<(String, String)> {
        self.events.patterns()
    }

    /// Registered hook pattern pairs, in bucket order.
    pub fn hook_patterns(&self) -> Vec<(String, String)> {
        self.hooks.patterns()
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}
