#[cfg(test)]
mod tests {
    use crate::*;
    use parking_lot::Mutex;
    use platform_data::{DataSettings, EntityKinds};
    use std::sync::Arc;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        dependencies: Vec<&'static str>,
        core: Option<u32>,
        fail_boot: bool,
        journal: Journal,
    }

    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        fn dependencies(&self) -> Vec<&str> {
            self.dependencies.clone()
        }

        fn required_core_version(&self) -> Option<u32> {
            self.core
        }

        fn boot(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError> {
            if self.fail_boot {
                return Err(PluginSystemError::InitializationError("boom".to_string()));
            }
            let journal = Arc::clone(&self.journal);
            let name = self.name;
            ctx.events().on_event("system", "init", move |_, _, _| {
                journal.lock().push(format!("{name}:init"));
                Ok(true)
            })?;
            self.journal.lock().push(format!("{}:boot", self.name));
            Ok(())
        }

        fn shutdown(&mut self, _ctx: &PluginContext) -> Result<(), PluginSystemError> {
            self.journal.lock().push(format!("{}:shutdown", self.name));
            Ok(())
        }
    }

    fn recorder(name: &'static str, journal: &Journal) -> Recorder {
        Recorder {
            name,
            dependencies: Vec::new(),
            core: None,
            fail_boot: false,
            journal: Arc::clone(journal),
        }
    }

    fn context(enabled: &[&str]) -> PluginContext {
        let events = Arc::new(EventSystem::new());
        let data = Arc::new(DataContext::new(
            Arc::clone(&events),
            Arc::new(EntityKinds::new()),
            DataSettings::default(),
        ));
        PluginContext::new(events, data, enabled.iter().map(|s| s.to_string()).collect())
    }

    fn registry(journal: &Journal) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        for name in ["alpha", "beta"] {
            let journal = Arc::clone(journal);
            registry
                .register(name, move || Box::new(recorder(name, &journal)))
                .unwrap();
        }
        let journal_for_gamma = Arc::clone(journal);
        registry
            .register("gamma", move || {
                let mut plugin = recorder("gamma", &journal_for_gamma);
                plugin.dependencies = vec!["alpha"];
                Box::new(plugin)
            })
            .unwrap();
        let journal_for_future = Arc::clone(journal);
        registry
            .register("future", move || {
                let mut plugin = recorder("future", &journal_for_future);
                plugin.core = Some(CORE_VERSION + 1);
                Box::new(plugin)
            })
            .unwrap();
        let journal_for_broken = Arc::clone(journal);
        registry
            .register("broken", move || {
                let mut plugin = recorder("broken", &journal_for_broken);
                plugin.fail_boot = true;
                Box::new(plugin)
            })
            .unwrap();
        registry
    }

    #[test]
    fn plugins_boot_in_enabled_order_and_shut_down_in_reverse() {
        let journal = Journal::default();
        let manager = PluginManager::new(context(&["beta", "alpha", "gamma"]), registry(&journal));

        assert_eq!(manager.load_enabled().unwrap(), 3);
        assert_eq!(manager.plugin_names(), vec!["beta", "alpha", "gamma"]);

        manager
            .context()
            .events()
            .trigger_event("system", "init", &Params::new())
            .unwrap();
        manager.shutdown().unwrap();

        assert_eq!(
            *journal.lock(),
            vec![
                "beta:boot",
                "alpha:boot",
                "gamma:boot",
                "beta:init",
                "alpha:init",
                "gamma:init",
                "gamma:shutdown",
                "alpha:shutdown",
                "beta:shutdown",
            ]
        );
        assert_eq!(manager.plugin_count(), 0);
    }

    #[test]
    fn unknown_plugins_are_skipped() {
        let journal = Journal::default();
        let manager = PluginManager::new(context(&["alpha", "missing"]), registry(&journal));

        assert_eq!(manager.load_enabled().unwrap(), 1);
        assert!(manager.is_plugin_loaded("alpha"));
        assert!(!manager.is_plugin_loaded("missing"));
        assert!(manager.is_plugin_enabled("missing"));
    }

    #[test]
    fn missing_dependency_is_a_typed_error() {
        let journal = Journal::default();
        let manager = PluginManager::new(context(&["gamma"]), registry(&journal));

        let err = manager.load_enabled().unwrap_err();
        assert!(matches!(
            err,
            PluginSystemError::MissingDependency { ref plugin, ref dependency }
                if plugin == "gamma" && dependency == "alpha"
        ));
        assert!(journal.lock().is_empty());
    }

    #[test]
    fn newer_core_requirement_is_rejected() {
        let journal = Journal::default();
        let manager = PluginManager::new(context(&["future"]), registry(&journal));

        let err = manager.load_enabled().unwrap_err();
        assert!(matches!(
            err,
            PluginSystemError::CoreVersion { required, core, .. }
                if required == CORE_VERSION + 1 && core == CORE_VERSION
        ));
    }

    #[test]
    fn boot_failures_are_wrapped() {
        let journal = Journal::default();
        let manager = PluginManager::new(context(&["broken"]), registry(&journal));

        let err = manager.load_enabled().unwrap_err();
        assert!(matches!(err, PluginSystemError::InitializationError(ref msg) if msg.contains("broken")));
        assert_eq!(manager.plugin_count(), 0);
    }

    #[test]
    fn loading_twice_is_rejected() {
        let journal = Journal::default();
        let manager = PluginManager::new(context(&["alpha"]), registry(&journal));
        manager.load_enabled().unwrap();

        assert!(matches!(
            manager.load_plugin("alpha"),
            Err(PluginSystemError::PluginAlreadyLoaded(_))
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let journal = Journal::default();
        let mut registry = registry(&journal);
        let again = Arc::clone(&journal);
        let err = registry
            .register("alpha", move || Box::new(recorder("alpha", &again)))
            .unwrap_err();
        assert!(matches!(err, PluginSystemError::PluginAlreadyExists(_)));
        assert_eq!(registry.names(), vec!["alpha", "beta", "broken", "future", "gamma"]);
    }

    #[test]
    fn load_events_are_announced() {
        let journal = Journal::default();
        let ctx = context(&["alpha"]);
        let seen = Journal::default();
        let sink = Arc::clone(&seen);
        ctx.events()
            .on_event(PLUGIN_NAMESPACE, "*", move |_, event, params| {
                let name = params.get_str("name").unwrap_or_default();
                sink.lock().push(format!("{event}:{name}"));
                Ok(true)
            })
            .unwrap();

        let manager = PluginManager::new(ctx, registry(&journal));
        manager.load_enabled().unwrap();
        manager.shutdown().unwrap();
        assert_eq!(*seen.lock(), vec!["loaded:alpha", "unloaded:alpha"]);
    }

    #[test]
    fn context_dependency_checks() {
        let ctx = context(&["alpha"]);
        assert!(ctx.depends("x", "alpha").is_ok());
        assert!(ctx.depends("x", "beta").is_err());
        assert!(ctx.depends_core("x", CORE_VERSION).is_ok());
        assert!(ctx.depends_core("x", CORE_VERSION + 1).is_err());
    }
}
