//! Subscriber installation for the `platform` binary.
//!
//! Workspace crates log at the configured level while third-party crates are
//! held at `warn`. Logs go to stderr; stdout carries the command report.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose events follow `LoggingSettings::level`.
const WORKSPACE_TARGETS: &[&str] = &[
    "platform",
    "platform_events",
    "platform_data",
    "platform_plugins",
    "plugin_audit",
];

/// Level for everything outside the workspace.
const DEPENDENCY_LEVEL: &str = "warn";

/// Filter directives for `settings`: a quiet default, the workspace crates at
/// the configured level, then per-target overrides.
pub fn filter_directives(settings: &LoggingSettings) -> String {
    let mut directives = vec![DEPENDENCY_LEVEL.to_string()];
    directives.extend(
        WORKSPACE_TARGETS
            .iter()
            .filter(|target| !settings.targets.contains_key(**target))
            .map(|target| format!("{target}={}", settings.level)),
    );
    directives.extend(
        settings
            .targets
            .iter()
            .map(|(target, level)| format!("{target}={level}")),
    );
    directives.join(",")
}

/// Installs the global subscriber. `RUST_LOG` replaces the computed filter
/// when set; `json_format` forces JSON output.
pub fn setup_logging(settings: &LoggingSettings, json_format: bool) -> anyhow::Result<()> {
    let directives = filter_directives(settings);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&directives)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json_format || settings.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .compact(),
            )
            .try_init()?;
    }

    info!("🔧 Logging initialized: {}", directives);
    Ok(())
}

/// Logs the startup banner.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("🌐 platform v{} starting", version);
    info!("   wildcard events and hooks, pluggable engines and caches, static plugins");
}
