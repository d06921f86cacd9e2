//! # Platform Event System
//!
//! Synchronous publish/subscribe core used by every other platform crate.
//!
//! ## Concepts
//!
//! * **Events** are veto points. Listeners return `Ok(true)` to let the action
//!   continue and `Ok(false)` to block it; the first veto stops the chain.
//! * **Hooks** are value transforms. Every listener runs and may replace the
//!   running value.
//! * **Factories** are hooks in the `factory` namespace used to build named
//!   services (caches, database engines) without naming concrete types.
//!
//! Listeners are keyed by a (namespace, name) pair of wildcard patterns, see
//! [`pattern`]. At dispatch time every matching bucket is merged into one
//! priority-ordered chain.
//!
//! ## Example
//!
//! ```rust
//! use platform_events::{EventSystem, HookValue, Params};
//!
//! let events = EventSystem::new();
//!
//! events
//!     .on_hook("obj:*", "property:url", |_, _, params, _| {
//!         let guid = params.get_i64("guid").unwrap_or_default();
//!         Ok(Some(HookValue::from(format!("/blog/{guid}"))))
//!     })
//!     .unwrap();
//!
//! let url = events
//!     .trigger_hook("obj:blog", "property:url", &Params::new().with("guid", 4), HookValue::Null)
//!     .unwrap();
//! assert_eq!(url.as_str(), Some("/blog/4"));
//! ```

pub mod error;
pub mod factory;
pub mod pattern;
pub mod registry;
pub mod system;
pub mod types;

pub use error::{EventError, HandlerFailure};
pub use factory::FACTORY_NAMESPACE;
pub use pattern::{Pattern, PatternSyntax};
pub use registry::{HandlerRegistry, MatchedHandler};
pub use system::{create_event_system, EventSystem, EventSystemStats};
pub use types::{EventHandler, HookHandler, HookValue, Params, Priority, DEFAULT_PRIORITY};

/// Namespace of the application lifecycle events (`boot`, `init`, `shutdown`).
pub const SYSTEM_NAMESPACE: &str = "system";
