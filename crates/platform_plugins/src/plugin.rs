//! The plugin contract and the context plugins boot against.

use crate::error::PluginSystemError;
use crate::CORE_VERSION;
use platform_data::DataContext;
use platform_events::EventSystem;
use std::sync::Arc;

/// Shared services handed to every plugin.
#[derive(Debug, Clone)]
pub struct PluginContext {
    events: Arc<EventSystem>,
    data: Arc<DataContext>,
    enabled: Arc<[String]>,
}

impl PluginContext {
    pub fn new(events: Arc<EventSystem>, data: Arc<DataContext>, enabled: Vec<String>) -> Self {
        Self {
            events,
            data,
            enabled: enabled.into(),
        }
    }

    pub fn events(&self) -> &Arc<EventSystem> {
        &self.events
    }

    pub fn data(&self) -> &Arc<DataContext> {
        &self.data
    }

    /// Enabled plugin names in boot order.
    pub fn enabled_plugins(&self) -> &[String] {
        &self.enabled
    }

    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        self.enabled.iter().any(|enabled| enabled == name)
    }

    /// Fails unless `dependency` is enabled.
    pub fn depends(&self, plugin: &str, dependency: &str) -> Result<(), PluginSystemError> {
        if self.is_plugin_enabled(dependency) {
            Ok(())
        } else {
            Err(PluginSystemError::MissingDependency {
                plugin: plugin.to_string(),
                dependency: dependency.to_string(),
            })
        }
    }

    /// Fails when the running core is older than `required`.
    pub fn depends_core(&self, plugin: &str, required: u32) -> Result<(), PluginSystemError> {
        if CORE_VERSION < required {
            Err(PluginSystemError::CoreVersion {
                plugin: plugin.to_string(),
                required,
                core: CORE_VERSION,
            })
        } else {
            Ok(())
        }
    }
}

/// A statically linked extension.
///
/// Plugins register their listeners, hooks and factories in [`Plugin::boot`].
/// Dependencies and the core version are checked by the manager before
/// `boot` runs.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Plugins that must be enabled for this one to boot.
    fn dependencies(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Oldest core version this plugin runs on.
    fn required_core_version(&self) -> Option<u32> {
        None
    }

    fn boot(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError>;

    fn shutdown(&mut self, _ctx: &PluginContext) -> Result<(), PluginSystemError> {
        Ok(())
    }
}
