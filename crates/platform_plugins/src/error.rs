//! Error types for the plugin system.

use platform_data::DataError;
use platform_events::EventError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginSystemError {
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Plugin {plugin} depends on {dependency}, which is not enabled")]
    MissingDependency { plugin: String, dependency: String },

    #[error("Plugin {plugin} requires core version {required}, running {core}")]
    CoreVersion { plugin: String, required: u32, core: u32 },

    #[error("Plugin already exists: {0}")]
    PluginAlreadyExists(String),

    #[error("Plugin already loaded: {0}")]
    PluginAlreadyLoaded(String),

    #[error("Plugin initialization error: {0}")]
    InitializationError(String),

    #[error("Event system error: {0}")]
    Event(#[from] EventError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

impl PluginSystemError {
    #[must_use]
    pub fn initialization(plugin: &str, reason: impl std::fmt::Display) -> Self {
        Self::InitializationError(format!("{plugin}: {reason}"))
    }
}
