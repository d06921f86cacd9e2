//! Named entity constructors used to rehydrate rows.

use super::Entity;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Handling class of the plain, untyped entity.
pub const GENERIC_CLASS: &str = "Entity";

type Constructor = Arc<dyn Fn() -> Entity + Send + Sync>;

/// Maps a handling class marker to the constructor that builds a fresh,
/// correctly typed entity of that class.
pub struct EntityKinds {
    constructors: DashMap<String, Constructor>,
}

impl EntityKinds {
    /// Registry that only knows [`GENERIC_CLASS`].
    pub fn new() -> Self {
        let kinds = Self {
            constructors: DashMap::new(),
        };
        kinds.register(GENERIC_CLASS, || Entity::new(GENERIC_CLASS));
        kinds
    }

    /// Registers or replaces the constructor for `class`.
    pub fn register<F>(&self, class: &str, constructor: F)
    where
        F: Fn() -> Entity + Send + Sync + 'static,
    {
        if self
            .constructors
            .insert(class.to_string(), Arc::new(constructor))
            .is_some()
        {
            debug!("🔧 Replaced entity kind {}", class);
        } else {
            debug!("📝 Registered entity kind {}", class);
        }
    }

    pub fn contains(&self, class: &str) -> bool {
        self.constructors.contains_key(class)
    }

    /// Builds a fresh entity of `class`.
    pub fn create(&self, class: &str) -> Option<Entity> {
        let constructor = self.constructors.get(class).map(|entry| Arc::clone(entry.value()))?;
        Some(constructor())
    }

    pub fn classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = self.constructors.iter().map(|e| e.key().clone()).collect();
        classes.sort();
        classes
    }
}

impl Default for EntityKinds {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EntityKinds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityKinds").field("classes", &self.classes()).finish()
    }
}
