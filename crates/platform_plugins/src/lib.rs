//! Plugin system for the platform framework.
//!
//! Plugins are compiled in and registered by name in a [`PluginRegistry`].
//! The configured list of enabled plugins decides which of them boot and in
//! what order; each plugin then registers listeners, hooks and factories on
//! the shared event system.

mod error;
mod manager;
mod plugin;
mod registry;
mod tests;

pub use error::PluginSystemError;
pub use manager::{PluginInfo, PluginManager, PLUGIN_NAMESPACE};
pub use plugin::{Plugin, PluginContext};
pub use registry::PluginRegistry;

/// Types every plugin touches during boot.
pub use platform_data::DataContext;
pub use platform_events::{EventSystem, HookValue, Params};

/// Machine version of the core, compared against
/// [`Plugin::required_core_version`].
pub const CORE_VERSION: u32 = 2011121901;
