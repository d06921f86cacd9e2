use super::Cache;
use crate::error::CacheError;
use dashmap::DashMap;
use serde_json::Value;

/// Process-local cache. Each instance is its own store.
#[derive(Debug)]
pub struct MemoryCache {
    namespace: String,
    entries: DashMap<String, Value>,
}

impl MemoryCache {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: DashMap::new(),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new("default")
    }
}

impl Cache for MemoryCache {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }

    fn size(&self) -> Result<usize, CacheError> {
        Ok(self.entries.len())
    }

    fn add(&self, key: &str, value: &Value) -> Result<bool, CacheError> {
        use dashmap::mapref::entry::Entry;

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value.clone());
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_load_delete() {
        let cache = MemoryCache::new("database");
        assert_eq!(cache.namespace(), "database");

        cache.save("a", &json!([1, 2])).unwrap();
        assert_eq!(cache.load("a").unwrap(), Some(json!([1, 2])));
        assert_eq!(cache.size().unwrap(), 1);

        assert!(cache.delete("a").unwrap());
        assert!(!cache.delete("a").unwrap());
        assert_eq!(cache.load("a").unwrap(), None);
    }

    #[test]
    fn add_keeps_existing_value() {
        let cache = MemoryCache::default();
        assert!(cache.add("k", &json!("first")).unwrap());
        assert!(!cache.add("k", &json!("second")).unwrap());
        assert_eq!(cache.load("k").unwrap(), Some(json!("first")));
    }

    #[test]
    fn clear_empties_everything() {
        let cache = MemoryCache::default();
        cache.save("a", &json!(1)).unwrap();
        cache.save("b", &json!(2)).unwrap();
        cache.clear().unwrap();
        assert_eq!(cache.size().unwrap(), 0);
    }
}
