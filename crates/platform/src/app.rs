//! Main application logic and lifecycle management.
//!
//! The `Application` owns the event system, the data context and the plugin
//! manager, and drives the boot sequence:
//!
//! 1. core `system:boot` listeners (temp directory, cache and database
//!    factories) run through `ensure_event`, so a veto aborts startup
//! 2. enabled plugins boot in configured order
//! 3. `system:init` fires
//! 4. the command runs
//! 5. `system:shutdown` fires and plugins shut down in reverse order

use crate::cli::{AppCommand, CliArgs};
use crate::commands;
use crate::config::AppConfig;
use crate::logging::display_banner;
use platform_data::cache::{register_cache_factories, CacheSettings};
use platform_data::database::{register_database_factories, DatabaseSettings};
use platform_data::{DataContext, EntityKinds};
use platform_events::{create_event_system, EventError, EventSystem, Params, SYSTEM_NAMESPACE};
use platform_plugins::{PluginContext, PluginManager, PluginRegistry};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

pub struct Application {
    config: AppConfig,
    command: AppCommand,
    events: Arc<EventSystem>,
    data: Arc<DataContext>,
    plugins: PluginManager,
}

impl Application {
    /// Loads the configuration named by `args`, applies CLI overrides and
    /// boots the platform.
    pub fn new(args: CliArgs) -> anyhow::Result<Self> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path)?;

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        for plugin in args.plugins {
            if !config.plugins.enabled.contains(&plugin) {
                config.plugins.enabled.push(plugin);
            }
        }

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;
        info!("✅ Configuration loaded and validated successfully");

        display_banner();
        Self::boot(config, args.command)
    }

    /// Boots the platform from an already validated configuration.
    pub fn boot(config: AppConfig, command: AppCommand) -> anyhow::Result<Self> {
        let events = create_event_system(config.events.pattern_syntax);
        register_boot_listeners(&events, &config.cache, &config.database)?;

        info!("🚀 Booting platform");
        events.ensure_event(SYSTEM_NAMESPACE, "boot", &Params::new())?;

        let data = Arc::new(DataContext::new(
            Arc::clone(&events),
            Arc::new(EntityKinds::new()),
            config.data_settings(),
        ));

        let mut registry = PluginRegistry::new();
        plugin_audit::register_plugins(&mut registry)?;
        let context = PluginContext::new(
            Arc::clone(&events),
            Arc::clone(&data),
            config.plugins.enabled.clone(),
        );
        let plugins = PluginManager::new(context, registry);
        plugins.load_enabled()?;

        events.trigger_event(SYSTEM_NAMESPACE, "init", &Params::new())?;
        info!(
            "✅ Platform ready: {} plugin(s), wwwroot {}",
            plugins.plugin_count(),
            config.site.wwwroot
        );

        Ok(Self {
            config,
            command,
            events,
            data,
            plugins,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn events(&self) -> &Arc<EventSystem> {
        &self.events
    }

    pub fn data(&self) -> &Arc<DataContext> {
        &self.data
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    /// Runs the configured command and returns its JSON report.
    pub fn execute(&self) -> anyhow::Result<Value> {
        match &self.command {
            AppCommand::Check => {
                info!("🔎 Running check");
                Ok(serde_json::to_value(commands::check(&self.events, &self.plugins))?)
            }
            AppCommand::Query { fixtures, query } => {
                info!("🔎 Running query {} over {}", query.display(), fixtures.display());
                let fixtures = commands::read_fixtures(fixtures)?;
                let descriptor = commands::read_descriptor(query)?;
                Ok(serde_json::to_value(commands::query(&self.data, &fixtures, descriptor)?)?)
            }
        }
    }

    /// Fires `system:shutdown` and shuts plugins down. Failures are logged.
    pub fn shutdown(&self) {
        info!("🛑 Shutting down platform");
        if let Err(e) = self.events.trigger_event(SYSTEM_NAMESPACE, "shutdown", &Params::new()) {
            error!("❌ shutdown listener failed: {}", e);
        }
        if let Err(e) = self.plugins.shutdown() {
            error!("❌ Plugin shutdown failed: {}", e);
        }
        let stats = self.events.get_stats();
        info!(
            "📊 Final stats: {} events ({} vetoed), {} hooks, {} handler calls",
            stats.events_triggered, stats.events_vetoed, stats.hooks_triggered, stats.handlers_invoked
        );
    }

    /// Executes the command, prints its report to stdout and shuts down.
    pub fn run(self) -> anyhow::Result<()> {
        let outcome = self.execute();
        self.shutdown();

        let report = outcome?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}

/// Registers the core `system:boot` listeners.
///
/// The temp directory listener runs first (priority 1). The factory
/// listeners hold a weak handle on the event system they register into.
pub fn register_boot_listeners(
    events: &Arc<EventSystem>,
    cache: &CacheSettings,
    database: &DatabaseSettings,
) -> Result<(), EventError> {
    let temp_dir = cache.cache_path.clone();
    events.register_event(
        SYSTEM_NAMESPACE,
        "boot",
        move |_, _, _| {
            std::fs::create_dir_all(&temp_dir).map_err(EventError::handler)?;
            debug!("🗄️ Temp directory ready: {}", temp_dir.display());
            Ok(true)
        },
        1,
    )?;

    let weak: Weak<EventSystem> = Arc::downgrade(events);
    let settings = cache.clone();
    events.on_event(SYSTEM_NAMESPACE, "boot", move |_, _, _| {
        if let Some(events) = weak.upgrade() {
            register_cache_factories(&events, &settings)?;
        }
        Ok(true)
    })?;

    let weak: Weak<EventSystem> = Arc::downgrade(events);
    let settings = database.clone();
    events.on_event(SYSTEM_NAMESPACE, "boot", move |_, _, _| {
        if let Some(events) = weak.upgrade() {
            register_database_factories(&events, &settings)?;
        }
        Ok(true)
    })?;

    Ok(())
}
