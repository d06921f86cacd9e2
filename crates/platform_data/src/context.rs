//! The explicit application context handed to entity and search operations.

use crate::cache::Cache;
use crate::database::factory::DEFAULT_ENGINE_FACTORY;
use crate::database::{DatabaseEngine, DatabaseSettings};
use crate::entity::EntityKinds;
use crate::error::DataError;
use once_cell::sync::OnceCell;
use platform_events::{EventError, EventSystem, Params};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Factory that provides the query cache.
pub const QUERY_CACHE_FACTORY: &str = "cache:database";

/// Settings the data layer reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSettings {
    /// Base URL, ending in `/`
    pub wwwroot: String,
    pub database: DatabaseSettings,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            wwwroot: "http://localhost/".to_string(),
            database: DatabaseSettings::default(),
        }
    }
}

/// Everything entity and search operations need: the event system, the
/// entity kinds and a lazily acquired database engine.
pub struct DataContext {
    events: Arc<EventSystem>,
    kinds: Arc<EntityKinds>,
    settings: DataSettings,
    engine: OnceCell<Arc<DatabaseEngine>>,
}

impl DataContext {
    pub fn new(events: Arc<EventSystem>, kinds: Arc<EntityKinds>, settings: DataSettings) -> Self {
        Self {
            events,
            kinds,
            settings,
            engine: OnceCell::new(),
        }
    }

    /// Uses `engine` instead of asking the factories.
    pub fn with_engine(self, engine: Arc<DatabaseEngine>) -> Self {
        if self.engine.set(engine).is_err() {
            debug!("🔧 Engine already set, keeping the existing one");
        }
        self
    }

    pub fn events(&self) -> &Arc<EventSystem> {
        &self.events
    }

    pub fn kinds(&self) -> &Arc<EntityKinds> {
        &self.kinds
    }

    pub fn settings(&self) -> &DataSettings {
        &self.settings
    }

    pub fn wwwroot(&self) -> &str {
        &self.settings.wwwroot
    }

    /// The database engine, acquired on first use.
    ///
    /// Tries `database:engine:<configured>` and then
    /// `database:engine:default`, and puts the `cache:database` query cache
    /// in front of it when that factory yields one.
    pub fn database(&self) -> Result<Arc<DatabaseEngine>, DataError> {
        self.engine
            .get_or_try_init(|| self.acquire_engine())
            .map(Arc::clone)
    }

    fn acquire_engine(&self) -> Result<Arc<DatabaseEngine>, DataError> {
        let params = Params::new();
        let preferred = self.settings.database.engine_factory();

        let engine = match self.events.factory_object::<Arc<DatabaseEngine>>(&preferred, &params)? {
            Some(engine) => engine,
            None => {
                debug!("🔎 {} produced nothing, trying {}", preferred, DEFAULT_ENGINE_FACTORY);
                self.events
                    .factory_object::<Arc<DatabaseEngine>>(DEFAULT_ENGINE_FACTORY, &params)?
                    .ok_or(EventError::FactoryUnavailable(preferred))?
            }
        };

        if let Some(cache) = self
            .events
            .factory_object::<Arc<dyn Cache>>(QUERY_CACHE_FACTORY, &params)?
        {
            engine.attach_cache(cache);
        }

        info!("🗄️ Database engine ready ({})", engine.backend_name());
        Ok(engine)
    }
}

impl std::fmt::Debug for DataContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataContext")
            .field("settings", &self.settings)
            .field("kinds", &self.kinds)
            .field("engine", &self.engine.get())
            .finish()
    }
}
