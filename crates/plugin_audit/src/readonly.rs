use crate::audit_log;
use platform_plugins::{Plugin, PluginContext, PluginSystemError};
use tracing::{info, warn};

const VETOED_EVENTS: [&str; 3] = ["saving", "updating", "deleting"];

/// Blocks every entity save, update and delete.
pub struct ReadOnlyPlugin {
    required_core: u32,
}

impl ReadOnlyPlugin {
    pub fn new(required_core: u32) -> Self {
        Self { required_core }
    }
}

impl Plugin for ReadOnlyPlugin {
    fn name(&self) -> &str {
        "readonly"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn dependencies(&self) -> Vec<&str> {
        vec!["audit"]
    }

    fn required_core_version(&self) -> Option<u32> {
        Some(self.required_core)
    }

    fn boot(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError> {
        for event in VETOED_EVENTS {
            ctx.events().on_event("*", event, |namespace, event, params| {
                warn!(
                    "🚫 ReadOnlyPlugin: blocked {} of {} (guid {:?})",
                    event,
                    namespace,
                    params.get_i64("guid")
                );
                Ok(false)
            })?;
        }

        if audit_log(ctx).is_none() {
            warn!("⚠️ ReadOnlyPlugin: audit log unavailable, blocked writes are only logged");
        }
        info!("🔒 ReadOnlyPlugin: entity writes are disabled");
        Ok(())
    }
}
