/// Event system module - registration, dispatch and statistics
mod core;
mod emitters;
mod handlers;
mod stats;
mod tests;

pub use self::core::EventSystem;
pub use self::stats::EventSystemStats;

use crate::pattern::PatternSyntax;
use std::sync::Arc;

/// Helper function to create a shareable event system
pub fn create_event_system(syntax: PatternSyntax) -> Arc<EventSystem> {
    Arc::new(EventSystem::with_syntax(syntax))
}
