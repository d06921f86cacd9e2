//! Audit plugins.
//!
//! * `audit` counts every entity lifecycle event that completes and serves
//!   the running tally through the `audit:log` factory.
//! * `readonly` vetoes every entity write. It depends on `audit` so blocked
//!   writes still show up in the logs of a running site.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use platform_events::{HookValue, Params};
use platform_plugins::{Plugin, PluginContext, PluginRegistry, PluginSystemError, CORE_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod readonly;

pub use readonly::ReadOnlyPlugin;

/// Factory name under which the shared [`AuditLog`] is published.
pub const AUDIT_LOG_FACTORY: &str = "audit:log";

/// Lifecycle events counted by [`AuditPlugin`].
pub const AUDITED_EVENTS: [&str; 3] = ["saved", "updated", "deleted"];

/// Running count of lifecycle events, keyed `"{type path}:{event}"`.
#[derive(Debug)]
pub struct AuditLog {
    counts: DashMap<String, u64>,
    started: DateTime<Utc>,
}

/// Point-in-time copy of an [`AuditLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub started: DateTime<Utc>,
    pub total: u64,
    pub counts: BTreeMap<String, u64>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            counts: DashMap::new(),
            started: Utc::now(),
        }
    }

    pub fn record(&self, namespace: &str, event: &str) {
        *self.counts.entry(format!("{namespace}:{event}")).or_insert(0) += 1;
    }

    pub fn count(&self, namespace: &str, event: &str) -> u64 {
        self.counts
            .get(&format!("{namespace}:{event}"))
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|entry| *entry.value()).sum()
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    pub fn snapshot(&self) -> AuditSummary {
        let counts: BTreeMap<String, u64> = self
            .counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        AuditSummary {
            started: self.started,
            total: counts.values().sum(),
            counts,
        }
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts completed entity writes.
pub struct AuditPlugin {
    log: Arc<AuditLog>,
}

impl AuditPlugin {
    pub fn new() -> Self {
        Self::with_log(Arc::new(AuditLog::new()))
    }

    /// Uses an existing log, so callers can read the tally directly.
    pub fn with_log(log: Arc<AuditLog>) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &Arc<AuditLog> {
        &self.log
    }
}

impl Default for AuditPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for AuditPlugin {
    fn name(&self) -> &str {
        "audit"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn boot(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError> {
        let events = ctx.events();

        for event in AUDITED_EVENTS {
            let log = Arc::clone(&self.log);
            events.on_event("*", event, move |namespace, event, params| {
                log.record(namespace, event);
                debug!(
                    "📝 AuditPlugin: {} {} (guid {:?})",
                    event,
                    namespace,
                    params.get_i64("guid")
                );
                Ok(true)
            })?;
        }

        let log = Arc::clone(&self.log);
        events.on_factory(AUDIT_LOG_FACTORY, move |_, _, _, current| {
            if current.is_set() {
                return Ok(None);
            }
            Ok(Some(HookValue::object(Arc::clone(&log))))
        })?;

        info!("📝 AuditPlugin: ✅ Auditing {} lifecycle events", AUDITED_EVENTS.len());
        Ok(())
    }

    fn shutdown(&mut self, _ctx: &PluginContext) -> Result<(), PluginSystemError> {
        let summary = self.log.snapshot();
        match serde_json::to_string(&summary.counts) {
            Ok(counts) => info!(
                "📝 AuditPlugin: {} events since {}: {}",
                summary.total, summary.started, counts
            ),
            Err(e) => warn!("⚠️ AuditPlugin: could not serialize summary: {}", e),
        }
        Ok(())
    }
}

/// Looks up the shared audit log through the factory registry.
pub fn audit_log(ctx: &PluginContext) -> Option<Arc<AuditLog>> {
    ctx.events()
        .factory_object::<Arc<AuditLog>>(AUDIT_LOG_FACTORY, &Params::new())
        .ok()
        .flatten()
}

/// Adds both plugins to `registry` under their own names.
pub fn register_plugins(registry: &mut PluginRegistry) -> Result<(), PluginSystemError> {
    registry.register("audit", || Box::new(AuditPlugin::new()))?;
    registry.register("readonly", || Box::new(ReadOnlyPlugin::new(CORE_VERSION)))?;
    Ok(())
}
