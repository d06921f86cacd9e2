//! Built-in database engine factories.

use super::{DatabaseEngine, MemoryBackend, StorageBackend};
use once_cell::sync::OnceCell;
use platform_events::{EventError, EventSystem, HookValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Engine names served by [`register_database_factories`].
pub const DATABASE_FACTORIES: [&str; 3] = [
    "database:engine",
    "database:engine:default",
    "database:engine:memory",
];

/// Name of the fallback engine factory.
pub const DEFAULT_ENGINE_FACTORY: &str = "database:engine:default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Suffix of the preferred `database:engine:<name>` factory
    #[serde(default = "default_engine")]
    pub engine: String,
    /// Configured links. More than one splits reads from writes.
    #[serde(default = "default_links")]
    pub links: Vec<String>,
    /// Keep a transcript of executed queries
    #[serde(default)]
    pub debug: bool,
}

fn default_engine() -> String {
    "memory".to_string()
}

fn default_links() -> Vec<String> {
    vec!["readwrite".to_string()]
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            links: default_links(),
            debug: false,
        }
    }
}

impl DatabaseSettings {
    pub fn split_links(&self) -> bool {
        self.links.len() > 1
    }

    /// Factory name of the preferred engine.
    pub fn engine_factory(&self) -> String {
        format!("database:engine:{}", self.engine)
    }
}

/// Registers engine factories backed by one shared [`MemoryBackend`].
///
/// The backend is created on first request, so every engine produced by
/// these factories sees the same data.
pub fn register_database_factories(
    events: &EventSystem,
    settings: &DatabaseSettings,
) -> Result<(), EventError> {
    let backend: Arc<OnceCell<Arc<MemoryBackend>>> = Arc::new(OnceCell::new());

    for name in DATABASE_FACTORIES {
        let settings = settings.clone();
        let backend = Arc::clone(&backend);
        events.on_factory(name, move |_, requested, _, current| {
            if current.is_set() {
                return Ok(None);
            }
            let shared = backend.get_or_init(|| Arc::new(MemoryBackend::new()));
            let storage: Arc<dyn StorageBackend> = shared.clone();
            let engine = DatabaseEngine::new(storage, settings.split_links()).with_debug(settings.debug);
            debug!("🏭 {} produced a {} engine", requested, engine.backend_name());
            Ok(Some(HookValue::object(Arc::new(engine))))
        })?;
    }
    debug!("🗄️ Registered {} database factories", DATABASE_FACTORIES.len());
    Ok(())
}
