//! # Platform
//!
//! Application shell around the platform crates: command-line parsing,
//! TOML configuration, tracing setup and the boot sequence that wires the
//! event system, the data layer and the bundled plugins together.
//!
//! ## Quick Start
//!
//! ```bash
//! # Boot with the default configuration and print registry statistics
//! platform check
//!
//! # Enable the audit plugin and run a query over fixture entities
//! platform --plugin audit query --fixtures posts.json --query recent.json
//!
//! # JSON logging
//! platform --json-logs --log-level debug check
//! ```
//!
//! The configuration file (default `platform.toml`) is created with default
//! values when it does not exist.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

pub use app::Application;
pub use cli::{AppCommand, CliArgs};
pub use config::{AppConfig, ConfigError, EventSettings, LoggingSettings, PluginSettings, SiteSettings};

/// Parses arguments, sets up logging and runs the application.
pub fn init() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Logging comes from the file as-is; CLI overrides are applied on top.
    let mut logging = AppConfig::load_from_file(&args.config_path)
        .map(|config| config.logging)
        .unwrap_or_default();
    if let Some(level) = &args.log_level {
        logging.level = level.clone();
    }
    logging::setup_logging(&logging, args.json_logs)?;

    Application::new(args)?.run()
}
