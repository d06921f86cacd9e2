//! # Platform Data
//!
//! Schema-less entity storage on top of [`platform_events`].
//!
//! Entities live in two tables: one row per entity (guid, type path, handling
//! class, creation time) and one metadata row per attribute value. Searches
//! are described with [`search::ObjectQuery`] and translated into join-based
//! selects that a [`database::StorageBackend`] executes. Engines and caches
//! are built through the factory registry, so plugins can replace them.
//!
//! ```rust
//! use platform_data::{register_data_factories, DataContext, DataSettings, Entity, EntityKinds};
//! use platform_data::cache::CacheSettings;
//! use platform_events::EventSystem;
//! use std::sync::Arc;
//!
//! let events = Arc::new(EventSystem::new());
//! let settings = DataSettings::default();
//! let cache = CacheSettings { disable_cache: true, ..CacheSettings::default() };
//! register_data_factories(&events, &cache, &settings.database).unwrap();
//!
//! let ctx = DataContext::new(events, Arc::new(EntityKinds::new()), settings);
//! let mut post = Entity::builder("Entity")
//!     .with_type("obj:blog")
//!     .attribute("title", "Hello")
//!     .build();
//! let guid = post.save(&ctx).unwrap().unwrap();
//!
//! let loaded = ctx.get_object(guid).unwrap().unwrap();
//! assert_eq!(loaded.get_str("title"), Some("Hello"));
//! ```

pub mod cache;
pub mod context;
pub mod database;
pub mod entity;
pub mod error;
pub mod search;

pub use context::{DataContext, DataSettings};
pub use entity::{AttributeValue, Entity, EntityBuilder, EntityKinds, EntityState, Persistable, ViewRenderer, Viewable};
pub use error::{BackendError, CacheError, DataError};
pub use search::{ObjectQuery, QueryDescriptor, ResultPage};

use platform_events::{EventError, EventSystem};

/// Store-assigned entity identifier.
pub type Guid = i64;

/// Registers the built-in cache and database engine factories.
pub fn register_data_factories(
    events: &EventSystem,
    cache: &cache::CacheSettings,
    database: &database::DatabaseSettings,
) -> Result<(), EventError> {
    cache::register_cache_factories(events, cache)?;
    database::register_database_factories(events, database)
}
