//! Built-in cache factories.
//!
//! | name | product |
//! |---|---|
//! | `cache`, `cache:filecache`, `cache:viewpaths`, `cache:languages` | [`FileCache`] namespaced by the requested name |
//! | `cache:simplevariable`, `cache:database` | [`MemoryCache`] in the `database` namespace |
//!
//! With caching disabled every one of them yields `false`, overriding whatever
//! an earlier factory produced. Otherwise an upstream product is passed through.

use super::{Cache, FileCache, MemoryCache};
use platform_events::{EventError, EventSystem, HookValue};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Logical cache names served by [`register_cache_factories`].
pub const CACHE_FACTORIES: [&str; 6] = [
    "cache:languages",
    "cache:viewpaths",
    "cache:database",
    "cache",
    "cache:filecache",
    "cache:simplevariable",
];

/// Settings consumed by the built-in cache factories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Turns every built-in cache into `false`
    #[serde(default)]
    pub disable_cache: bool,
    /// Root directory for file caches
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
}

fn default_cache_path() -> PathBuf {
    std::env::temp_dir().join("platform-cache")
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            disable_cache: false,
            cache_path: default_cache_path(),
        }
    }
}

/// Registers a factory for each name in [`CACHE_FACTORIES`].
pub fn register_cache_factories(
    events: &EventSystem,
    settings: &CacheSettings,
) -> Result<(), EventError> {
    for name in CACHE_FACTORIES {
        let settings = settings.clone();
        events.on_factory(name, move |_, requested, _, current| {
            Ok(Some(build_cache(&settings, requested, current)))
        })?;
    }
    debug!("🗄️ Registered {} cache factories", CACHE_FACTORIES.len());
    Ok(())
}

fn build_cache(settings: &CacheSettings, requested: &str, current: &HookValue) -> HookValue {
    if settings.disable_cache {
        return HookValue::Bool(false);
    }
    if current.is_set() {
        return current.clone();
    }

    let cache: Arc<dyn Cache> = match requested {
        "cache:simplevariable" | "cache:database" => Arc::new(MemoryCache::new("database")),
        _ => Arc::new(FileCache::new(&settings.cache_path, requested)),
    };
    HookValue::object(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_events::Params;
    use serde_json::json;
    use tempfile::TempDir;

    fn settings(root: &TempDir) -> CacheSettings {
        CacheSettings {
            disable_cache: false,
            cache_path: root.path().to_path_buf(),
        }
    }

    fn cache(events: &EventSystem, name: &str) -> Option<Arc<dyn Cache>> {
        events
            .factory_object::<Arc<dyn Cache>>(name, &Params::new())
            .unwrap()
    }

    #[test]
    fn file_caches_are_namespaced_by_name() {
        let root = TempDir::new().unwrap();
        let events = EventSystem::new();
        register_cache_factories(&events, &settings(&root)).unwrap();

        let viewpaths = cache(&events, "cache:viewpaths").unwrap();
        assert_eq!(viewpaths.namespace(), "cache:viewpaths");
        viewpaths.save("paths", &json!(["a"])).unwrap();

        let languages = cache(&events, "cache:languages").unwrap();
        assert_eq!(languages.load("paths").unwrap(), None);
        assert_eq!(cache(&events, "cache").unwrap().namespace(), "cache");
    }

    #[test]
    fn database_cache_is_in_memory() {
        let root = TempDir::new().unwrap();
        let events = EventSystem::new();
        register_cache_factories(&events, &settings(&root)).unwrap();

        let db = cache(&events, "cache:database").unwrap();
        assert_eq!(db.namespace(), "database");
        db.save("q", &json!(1)).unwrap();
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn disabled_cache_overrides_upstream() {
        let root = TempDir::new().unwrap();
        let events = EventSystem::new();
        events
            .register_factory(
                "cache:database",
                |_, _, _, _| {
                    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new("custom"));
                    Ok(Some(HookValue::object(cache)))
                },
                1,
            )
            .unwrap();

        let mut disabled = settings(&root);
        disabled.disable_cache = true;
        register_cache_factories(&events, &disabled).unwrap();

        let value = events.factory("cache:database", &Params::new()).unwrap();
        assert_eq!(value.as_bool(), Some(false));
        assert!(cache(&events, "cache:database").is_none());
    }

    #[test]
    fn upstream_cache_passes_through() {
        let root = TempDir::new().unwrap();
        let events = EventSystem::new();
        events
            .register_factory(
                "cache:database",
                |_, _, _, _| {
                    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new("custom"));
                    Ok(Some(HookValue::object(cache)))
                },
                1,
            )
            .unwrap();
        register_cache_factories(&events, &settings(&root)).unwrap();

        assert_eq!(cache(&events, "cache:database").unwrap().namespace(), "custom");
    }
}
