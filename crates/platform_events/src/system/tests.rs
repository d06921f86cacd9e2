//! Dispatch behaviour tests for the event system

#[cfg(test)]
mod tests {
    use crate::{EventError, EventSystem, HookValue, Params, PatternSyntax};
    use serde_json::json;
    use std::fmt;
    use std::sync::{Arc, Mutex};

    type Trail = Arc<Mutex<Vec<&'static str>>>;

    fn trail() -> Trail {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn recording(trail: &Trail, name: &'static str, verdict: bool) -> impl Fn(&str, &str, &Params<'_>) -> Result<bool, EventError> + Send + Sync + 'static {
        let trail = trail.clone();
        move |_, _, _| {
            trail.lock().unwrap().push(name);
            Ok(verdict)
        }
    }

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn no_listeners_means_allowed() {
        let events = EventSystem::new();
        assert!(events.trigger_event("obj:blog", "saving", &Params::new()).unwrap());
    }

    #[test]
    fn same_priority_runs_in_registration_order() {
        let events = EventSystem::new();
        let calls = trail();

        assert_eq!(events.register_event("obj", "saved", recording(&calls, "A", true), 10).unwrap(), 10);
        assert_eq!(events.register_event("obj", "saved", recording(&calls, "B", true), 10).unwrap(), 11);

        assert!(events.trigger_event("obj", "saved", &Params::new()).unwrap());
        assert_eq!(*calls.lock().unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn veto_stops_later_handlers() {
        let events = EventSystem::new();
        let calls = trail();

        events.register_event("obj:*", "deleting", recording(&calls, "first", true), 1).unwrap();
        events.register_event("obj:*", "deleting", recording(&calls, "veto", false), 2).unwrap();
        events.register_event("obj:*", "deleting", recording(&calls, "never", true), 3).unwrap();

        assert!(!events.trigger_event("obj:blog", "deleting", &Params::new()).unwrap());
        assert_eq!(*calls.lock().unwrap(), vec!["first", "veto"]);

        let stats = events.get_stats();
        assert_eq!(stats.events_vetoed, 1);
        assert_eq!(stats.handlers_invoked, 2);
    }

    #[test]
    fn ensure_event_reports_blocked_action() {
        let events = EventSystem::new();
        events.on_event("system", "boot", |_, _, _| Ok(false)).unwrap();

        let err = events.ensure_event("system", "boot", &Params::new()).unwrap_err();
        assert!(err.is_blocked());
        assert_eq!(err.to_string(), "Action blocked by a listener on system:boot");
        assert!(events.ensure_event("system", "init", &Params::new()).is_ok());
    }

    #[test]
    fn handler_errors_propagate_and_stop_dispatch() {
        let events = EventSystem::new();
        let calls = trail();

        events.register_event("obj", "saving", |_, _, _| Err(EventError::handler(Boom)), 1).unwrap();
        events.register_event("obj", "saving", recording(&calls, "after", true), 2).unwrap();

        let err = events.trigger_event("obj", "saving", &Params::new()).unwrap_err();
        assert!(matches!(err, EventError::Handler(_)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn hooks_fold_through_every_handler() {
        let events = EventSystem::new();
        let calls = trail();

        let seen = calls.clone();
        events
            .register_hook("obj:*", "property:title", move |_, _, _, current| {
                seen.lock().unwrap().push("upper");
                Ok(current.as_str().map(|s| HookValue::from(s.to_uppercase())))
            }, 10)
            .unwrap();

        let seen = calls.clone();
        events
            .register_hook("obj:*", "property:title", move |_, _, _, _| {
                seen.lock().unwrap().push("ignored");
                Ok(None)
            }, 20)
            .unwrap();

        let seen = calls.clone();
        events
            .register_hook("all", "property:title", move |_, _, _, current| {
                seen.lock().unwrap().push("suffix");
                Ok(Some(HookValue::from(format!("{}!", current.as_str().unwrap_or_default()))))
            }, 30)
            .unwrap();

        let value = events
            .trigger_hook("obj:blog", "property:title", &Params::new(), HookValue::from("hello"))
            .unwrap();

        assert_eq!(value.as_str(), Some("HELLO!"));
        assert_eq!(*calls.lock().unwrap(), vec!["upper", "ignored", "suffix"]);
    }

    #[test]
    fn hook_with_false_result_does_not_short_circuit() {
        let events = EventSystem::new();
        let calls = trail();

        let seen = calls.clone();
        events
            .register_hook("obj", "canedit", move |_, _, _, _| {
                seen.lock().unwrap().push("deny");
                Ok(Some(HookValue::Bool(false)))
            }, 1)
            .unwrap();
        let seen = calls.clone();
        events
            .register_hook("obj", "canedit", move |_, _, _, _| {
                seen.lock().unwrap().push("observer");
                Ok(None)
            }, 2)
            .unwrap();

        let value = events.trigger_hook("obj", "canedit", &Params::new(), HookValue::Bool(true)).unwrap();
        assert_eq!(value.as_bool(), Some(false));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn null_hook_answers_keep_the_running_value() {
        let events = EventSystem::new();
        events
            .register_hook("obj", "property:icon", |_, _, _, _| Ok(Some(HookValue::from("set"))), 1)
            .unwrap();
        events
            .register_hook("obj", "property:icon", |_, _, _, _| Ok(Some(HookValue::Null)), 2)
            .unwrap();
        events
            .register_hook("obj", "property:icon", |_, _, _, _| Ok(Some(HookValue::from(json!(null)))), 3)
            .unwrap();

        let value = events
            .trigger_hook("obj", "property:icon", &Params::new(), HookValue::Null)
            .unwrap();
        assert_eq!(value.as_str(), Some("set"));
    }

    #[test]
    fn wildcard_namespace_matches_subtypes_only() {
        let events = EventSystem::new();
        let calls = trail();
        events.on_event("obj:*", "saved", recording(&calls, "hit", true)).unwrap();

        events.trigger_event("obj:user", "saved", &Params::new()).unwrap();
        events.trigger_event("obj:user:admin", "saved", &Params::new()).unwrap();
        events.trigger_event("other:obj", "saved", &Params::new()).unwrap();

        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn handlers_receive_concrete_names_and_params() {
        let events = EventSystem::new();
        let captured = Arc::new(Mutex::new(None));

        let sink = captured.clone();
        events
            .on_event("all", "all", move |namespace, event, params| {
                *sink.lock().unwrap() = Some((
                    namespace.to_string(),
                    event.to_string(),
                    params.get("title").cloned(),
                ));
                Ok(true)
            })
            .unwrap();

        events
            .trigger_event("obj:blog", "saved", &Params::new().with("title", "Hello"))
            .unwrap();

        assert_eq!(
            captured.lock().unwrap().clone(),
            Some(("obj:blog".to_string(), "saved".to_string(), Some(json!("Hello"))))
        );
    }

    #[test]
    fn handlers_may_register_during_dispatch() {
        let events = Arc::new(EventSystem::new());
        let inner = events.clone();

        events
            .on_event("system", "boot", move |_, _, _| {
                inner.on_event("system", "init", |_, _, _| Ok(false))?;
                Ok(true)
            })
            .unwrap();

        assert!(events.trigger_event("system", "init", &Params::new()).unwrap());
        assert!(events.trigger_event("system", "boot", &Params::new()).unwrap());
        assert!(!events.trigger_event("system", "init", &Params::new()).unwrap());
    }

    #[test]
    fn handled_checks_use_compiled_keys() {
        let events = EventSystem::new();
        events.on_event("obj:*", "saved", |_, _, _| Ok(true)).unwrap();
        events.on_hook("obj", "property:url", |_, _, _, _| Ok(None)).unwrap();

        assert!(events.is_event_handled("obj:all", "saved").unwrap());
        assert!(!events.is_event_handled("obj:blog", "saved").unwrap());
        assert!(events.has_event_listeners("obj:blog", "saved"));
        assert!(events.is_hook_handled("obj", "property:url").unwrap());
        assert!(!events.has_hook_listeners("obj:blog", "property:url"));
    }

    #[test]
    fn strict_syntax_keeps_embedded_all_literal() {
        let legacy = EventSystem::with_syntax(PatternSyntax::Legacy);
        let strict = EventSystem::with_syntax(PatternSyntax::Strict);
        for events in [&legacy, &strict] {
            events.on_event("ballot", "cast", |_, _, _| Ok(false)).unwrap();
        }

        assert!(!legacy.trigger_event("bot", "cast", &Params::new()).unwrap());
        assert!(strict.trigger_event("bot", "cast", &Params::new()).unwrap());
        assert!(!strict.trigger_event("ballot", "cast", &Params::new()).unwrap());
    }

    #[test]
    fn stats_track_registrations_and_dispatches() {
        let events = EventSystem::new();
        events.on_event("a", "b", |_, _, _| Ok(true)).unwrap();
        events.on_hook("a", "b", |_, _, _, _| Ok(None)).unwrap();
        events.on_hook("a", "c", |_, _, _, _| Ok(None)).unwrap();

        events.trigger_event("a", "b", &Params::new()).unwrap();
        events.trigger_hook("a", "c", &Params::new(), HookValue::Null).unwrap();

        let stats = events.get_stats();
        assert_eq!(stats.event_handlers, 1);
        assert_eq!(stats.hook_handlers, 2);
        assert_eq!(stats.events_triggered, 1);
        assert_eq!(stats.hooks_triggered, 1);
        assert_eq!(stats.handlers_invoked, 2);
    }
}
