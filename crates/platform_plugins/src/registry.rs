//! Named plugin constructors.

use crate::error::PluginSystemError;
use crate::plugin::Plugin;
use std::collections::BTreeMap;
use tracing::debug;

type Constructor = Box<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Every plugin the binary knows how to build, keyed by name.
#[derive(Default)]
pub struct PluginRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor. A name can only be taken once.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> Result<(), PluginSystemError>
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        if self.constructors.contains_key(name) {
            return Err(PluginSystemError::PluginAlreadyExists(name.to_string()));
        }
        self.constructors.insert(name.to_string(), Box::new(constructor));
        debug!("📝 Registered plugin constructor: {}", name);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Plugin>, PluginSystemError> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| PluginSystemError::PluginNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry").field("plugins", &self.names()).finish()
    }
}
