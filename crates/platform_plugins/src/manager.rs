//! Plugin manager: boots enabled plugins in order and shuts them down in
//! reverse.

use crate::error::PluginSystemError;
use crate::plugin::{Plugin, PluginContext};
use crate::registry::PluginRegistry;
use crate::CORE_VERSION;
use parking_lot::Mutex;
use platform_events::Params;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Namespace of the events the manager fires (`loaded`, `unloaded`).
pub const PLUGIN_NAMESPACE: &str = "plugin";

/// Name and version of a booted plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
}

struct LoadedPlugin {
    info: PluginInfo,
    plugin: Box<dyn Plugin>,
}

/// Boots plugins from a [`PluginRegistry`].
///
/// The enabled list is the boot order. Unknown names are logged and
/// skipped; a plugin whose dependencies are not enabled, or that needs a
/// newer core, stops the load with a typed error.
pub struct PluginManager {
    context: PluginContext,
    registry: PluginRegistry,
    loaded: Mutex<Vec<LoadedPlugin>>,
}

impl PluginManager {
    pub fn new(context: PluginContext, registry: PluginRegistry) -> Self {
        Self {
            context,
            registry,
            loaded: Mutex::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    /// Boots every enabled plugin in list order. Returns how many booted.
    pub fn load_enabled(&self) -> Result<usize, PluginSystemError> {
        let enabled = self.context.enabled_plugins().to_vec();
        info!("🔌 Loading {} enabled plugin(s)", enabled.len());

        let mut booted = 0;
        for name in &enabled {
            if self.load_plugin(name)? {
                booted += 1;
            }
        }

        info!("🎉 Plugin loading complete: {}/{} plugins booted", booted, enabled.len());
        Ok(booted)
    }

    /// Boots one plugin. `Ok(false)` when the registry does not know it.
    pub fn load_plugin(&self, name: &str) -> Result<bool, PluginSystemError> {
        if self.is_plugin_loaded(name) {
            return Err(PluginSystemError::PluginAlreadyLoaded(name.to_string()));
        }

        let mut plugin = match self.registry.create(name) {
            Ok(plugin) => plugin,
            Err(PluginSystemError::PluginNotFound(_)) => {
                warn!("⚠️ Enabled plugin {} is not registered, skipping", name);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        if plugin.name() != name {
            warn!("⚠️ Plugin registered as {} calls itself {}", name, plugin.name());
        }

        if let Some(required) = plugin.required_core_version() {
            self.context.depends_core(name, required)?;
        }
        for dependency in plugin.dependencies() {
            self.context.depends(name, dependency)?;
        }

        info!("🔧 Booting plugin: {}", name);
        plugin
            .boot(&self.context)
            .map_err(|e| PluginSystemError::initialization(name, e))?;

        let info = PluginInfo {
            name: name.to_string(),
            version: plugin.version().to_string(),
        };
        self.loaded.lock().push(LoadedPlugin {
            info: info.clone(),
            plugin,
        });

        let params = Params::new().with("name", info.name.as_str()).with("version", info.version.as_str());
        self.context.events().trigger_event(PLUGIN_NAMESPACE, "loaded", &params)?;
        info!("✅ Plugin booted: {} v{}", info.name, info.version);
        Ok(true)
    }

    /// Shuts plugins down, last booted first. Failures are logged and the
    /// remaining plugins still shut down.
    pub fn shutdown(&self) -> Result<(), PluginSystemError> {
        let mut loaded = std::mem::take(&mut *self.loaded.lock());
        info!("🛑 Shutting down {} plugins", loaded.len());

        while let Some(mut entry) = loaded.pop() {
            let name = entry.info.name.clone();
            match entry.plugin.shutdown(&self.context) {
                Ok(()) => debug!("✅ Plugin shutdown completed: {}", name),
                Err(e) => error!("❌ Plugin shutdown failed for {}: {}", name, e),
            }

            let params = Params::new().with("name", name.as_str());
            if let Err(e) = self.context.events().trigger_event(PLUGIN_NAMESPACE, "unloaded", &params) {
                error!("❌ unloaded listener failed for {}: {}", name, e);
            }
        }

        info!("🧹 Plugin cleanup completed");
        Ok(())
    }

    pub fn plugin_count(&self) -> usize {
        self.loaded.lock().len()
    }

    /// Booted plugins in boot order.
    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.loaded.lock().iter().map(|entry| entry.info.clone()).collect()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.loaded.lock().iter().map(|entry| entry.info.name.clone()).collect()
    }

    pub fn is_plugin_loaded(&self, name: &str) -> bool {
        self.loaded.lock().iter().any(|entry| entry.info.name == name)
    }

    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        self.context.is_plugin_enabled(name)
    }

    pub fn core_version(&self) -> u32 {
        CORE_VERSION
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("registry", &self.registry)
            .field("loaded", &self.plugin_names())
            .finish()
    }
}
