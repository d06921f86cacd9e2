#[cfg(test)]
mod tests {
    use crate::cache::{Cache, MemoryCache};
    use crate::database::query::{
        Column, Condition, Delete, Insert, Operand, Operator, OrderTarget, Query, Select,
        SortOrder, Table, Update, AGGREGATE_COLUMN,
    };
    use crate::database::*;
    use crate::error::BackendError;
    use parking_lot::Mutex;
    use platform_events::{EventSystem, Params};
    use std::sync::Arc;

    fn insert_entity(engine: &DatabaseEngine, type_path: &str, created_ts: i64) -> i64 {
        engine
            .insert(&Insert::Entity {
                type_path: type_path.to_string(),
                handling_class: "Entity".to_string(),
                created_ts,
            })
            .unwrap()
            .unwrap()
    }

    fn insert_meta(engine: &DatabaseEngine, guid: i64, name: &str, value: &str) {
        engine
            .insert(&Insert::Metadata {
                guid,
                name: name.to_string(),
                value: value.to_string(),
            })
            .unwrap();
    }

    fn memory_engine() -> DatabaseEngine {
        DatabaseEngine::new(Arc::new(MemoryBackend::new()), false)
    }

    fn meta(alias: &str, name: &str, operator: &str, operand: impl Into<Operand>) -> Condition {
        Condition::Metadata {
            alias: alias.to_string(),
            name: name.to_string(),
            operator: Operator::parse(operator),
            operand: operand.into(),
        }
    }

    fn guids(rows: &[Row]) -> Vec<i64> {
        rows.iter().filter_map(|row| row.get_i64("guid")).collect()
    }

    #[test]
    fn type_filter_uses_case_insensitive_like() {
        let engine = memory_engine();
        let blog = insert_entity(&engine, "obj:blog", 1);
        insert_entity(&engine, "obj:page", 2);
        let user = insert_entity(&engine, "user", 3);

        let query = Select::new(Table::Entities)
            .filter(Condition::TypeLike(vec!["OBJ:B%".to_string(), "us_r".to_string()]));
        let rows = engine.select(&query).unwrap();
        assert_eq!(guids(&rows), vec![blog, user]);
    }

    #[test]
    fn metadata_predicates_join_per_alias() {
        let engine = memory_engine();
        let alice = insert_entity(&engine, "obj:blog", 1);
        insert_meta(&engine, alice, "owner", "alice");
        insert_meta(&engine, alice, "title", "Hello");
        let bob = insert_entity(&engine, "obj:blog", 2);
        insert_meta(&engine, bob, "owner", "bob");
        insert_meta(&engine, bob, "title", "Hello");

        let query = Select::new(Table::Entities)
            .join("m0")
            .join("m1")
            .filter(meta("m0", "owner", "=", "alice"))
            .filter(meta("m1", "title", "like", "hel%"));
        assert_eq!(guids(&engine.select(&query).unwrap()), vec![alice]);
    }

    #[test]
    fn multi_valued_attributes_duplicate_rows() {
        let engine = memory_engine();
        let guid = insert_entity(&engine, "obj:blog", 1);
        insert_meta(&engine, guid, "tags", "rust");
        insert_meta(&engine, guid, "tags", "sql");

        let query = Select::new(Table::Entities)
            .join("m0")
            .filter(meta("m0", "tags", "in", vec!["rust".to_string(), "sql".to_string()]));
        assert_eq!(guids(&engine.select(&query).unwrap()), vec![guid, guid]);
    }

    #[test]
    fn comparisons_are_numeric_when_possible() {
        let engine = memory_engine();
        let small = insert_entity(&engine, "item", 1);
        insert_meta(&engine, small, "price", "9");
        let large = insert_entity(&engine, "item", 2);
        insert_meta(&engine, large, "price", "10");

        let query = Select::new(Table::Entities)
            .join("m0")
            .filter(meta("m0", "price", ">", "9.5"));
        assert_eq!(guids(&engine.select(&query).unwrap()), vec![large]);

        let query = Select::new(Table::Entities)
            .join("m0")
            .filter(meta("m0", "price", "not", "9"));
        assert_eq!(guids(&engine.select(&query).unwrap()), vec![large]);
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let engine = memory_engine();
        let guid = insert_entity(&engine, "item", 1);
        insert_meta(&engine, guid, "price", "9");

        let query = Select::new(Table::Entities)
            .join("m0")
            .filter(meta("m0", "price", "between", "1"));
        let err = engine.select(&query).unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedOperator(op) if op == "between"));
    }

    #[test]
    fn unknown_operator_is_rejected_even_without_matching_rows() {
        let engine = memory_engine();
        insert_entity(&engine, "item", 1);

        let query = Select::new(Table::Entities)
            .join("m0")
            .filter(meta("m0", "missing", "~~", "x"));
        let err = engine.select(&query).unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedOperator(op) if op == "~~"));

        let empty = memory_engine();
        assert!(empty.select(&query.clone().count()).is_err());
    }

    #[test]
    fn ordering_count_and_pagination() {
        let engine = memory_engine();
        let mut created = Vec::new();
        for (ts, title) in [(30, "b"), (10, "c"), (20, "a")] {
            let guid = insert_entity(&engine, "obj:blog", ts);
            insert_meta(&engine, guid, "title", title);
            created.push(guid);
        }

        let by_ts = Select::new(Table::Entities).order(OrderTarget::Column(Column::CreatedTs), SortOrder::Desc);
        assert_eq!(guids(&engine.select(&by_ts).unwrap()), vec![created[0], created[2], created[1]]);

        let by_title = Select::new(Table::Entities)
            .join("sort")
            .filter(Condition::MetadataName {
                alias: "sort".to_string(),
                name: "title".to_string(),
            })
            .order(OrderTarget::Joined("sort".to_string()), SortOrder::Asc)
            .paginate(Some(2), Some(1));
        assert_eq!(guids(&engine.select(&by_title).unwrap()), vec![created[0], created[1]]);

        let count = Select::new(Table::Entities).count();
        let row = engine.select_one(&count).unwrap().unwrap();
        assert_eq!(row.get_i64(AGGREGATE_COLUMN), Some(3));
    }

    #[test]
    fn metadata_rows_come_back_in_insertion_order() {
        let engine = memory_engine();
        let guid = insert_entity(&engine, "obj", 1);
        insert_meta(&engine, guid, "tags", "b");
        insert_meta(&engine, guid, "tags", "a");

        let rows = engine.select(&Select::metadata(guid)).unwrap();
        let values: Vec<String> = rows.iter().filter_map(|r| r.get_string("value")).collect();
        assert_eq!(values, vec!["b", "a"]);

        assert_eq!(engine.delete(&Delete::metadata(guid)).unwrap(), 2);
        assert_eq!(engine.delete(&Delete::entity(guid)).unwrap(), 1);
        assert_eq!(engine.delete(&Delete::entity(guid)).unwrap(), 0);
    }

    #[test]
    fn update_overwrites_core_columns() {
        let engine = memory_engine();
        let guid = insert_entity(&engine, "obj", 1);
        let update = Update {
            guid,
            set: vec![(Column::CreatedTs, serde_json::json!(99))],
        };
        assert!(engine.update(&update).unwrap());

        let row = engine.select_one(&Select::entity(guid)).unwrap().unwrap();
        assert_eq!(row.get_i64("created_ts"), Some(99));
        assert!(!engine.update(&Update { guid: 404, set: vec![] }).unwrap());
    }

    #[test]
    fn selects_are_served_from_the_cache() {
        let engine = memory_engine();
        assert!(engine.attach_cache(Arc::new(MemoryCache::new("database"))));
        assert!(!engine.attach_cache(Arc::new(MemoryCache::new("second"))));
        let guid = insert_entity(&engine, "obj", 1);

        let query = Select::entity(guid);
        let first = engine.select(&query).unwrap();
        let second = engine.select(&query).unwrap();
        assert_eq!(first, second);

        let stats = engine.stats();
        // one insert plus one select reached the backend
        assert_eq!(stats.total_queries, 2);
        assert_eq!(stats.total_queries_inc_cached, 3);
        assert_eq!(stats.query_details.iter().find(|(q, _)| *q == query.to_string()).map(|(_, n)| *n), Some(1));
    }

    #[test]
    fn any_write_clears_the_whole_cache() {
        let engine = memory_engine();
        let cache = Arc::new(MemoryCache::new("database"));
        engine.attach_cache(cache.clone());
        let guid = insert_entity(&engine, "obj", 1);
        let other = insert_entity(&engine, "other", 2);

        let query = Select::entity(guid);
        engine.select(&query).unwrap();
        assert_eq!(cache.size().unwrap(), 1);

        // unrelated write
        insert_meta(&engine, other, "name", "x");
        assert_eq!(cache.size().unwrap(), 0);

        engine.select(&query).unwrap();
        assert_eq!(engine.stats().total_queries, 5);
    }

    #[test]
    fn missing_single_row_is_cached_as_none() {
        let engine = memory_engine();
        engine.attach_cache(Arc::new(MemoryCache::new("database")));

        let query = Select::entity(42);
        assert!(engine.select_one(&query).unwrap().is_none());
        assert!(engine.select_one(&query).unwrap().is_none());
        assert_eq!(engine.stats().total_queries, 1);
    }

    #[test]
    fn debug_transcript_is_reset_on_take() {
        let engine = memory_engine().with_debug(true);
        insert_entity(&engine, "obj", 1);
        engine.select(&Select::new(Table::Entities)).unwrap();

        let transcript = engine.take_transcript();
        assert_eq!(transcript.len(), 2);
        assert!(transcript[1].starts_with("SELECT"));
        assert!(engine.take_transcript().is_empty());
    }

    /// Backend that refuses split links and records the link of every query.
    struct ReadWriteOnly {
        inner: MemoryBackend,
        used: Mutex<Vec<LinkKind>>,
    }

    impl StorageBackend for ReadWriteOnly {
        fn name(&self) -> &str {
            "readwrite-only"
        }

        fn establish_link(&self, link: LinkKind) -> Result<(), BackendError> {
            match link {
                LinkKind::ReadWrite => Ok(()),
                other => Err(BackendError::connection(other.to_string(), "refused")),
            }
        }

        fn execute(&self, link: LinkKind, query: &Query) -> Result<QueryOutcome, BackendError> {
            self.used.lock().push(link);
            self.inner.execute(link, query)
        }
    }

    #[test]
    fn split_links_fall_back_to_readwrite() {
        let backend = Arc::new(ReadWriteOnly {
            inner: MemoryBackend::new(),
            used: Mutex::new(Vec::new()),
        });
        let engine = DatabaseEngine::new(backend.clone(), true);
        insert_entity(&engine, "obj", 1);
        engine.select(&Select::new(Table::Entities)).unwrap();

        assert_eq!(*backend.used.lock(), vec![LinkKind::ReadWrite, LinkKind::ReadWrite]);
    }

    #[test]
    fn split_links_are_used_when_available() {
        struct Recording(MemoryBackend, Mutex<Vec<LinkKind>>);
        impl StorageBackend for Recording {
            fn name(&self) -> &str {
                "recording"
            }
            fn establish_link(&self, _link: LinkKind) -> Result<(), BackendError> {
                Ok(())
            }
            fn execute(&self, link: LinkKind, query: &Query) -> Result<QueryOutcome, BackendError> {
                self.1.lock().push(link);
                self.0.execute(link, query)
            }
        }

        let backend = Arc::new(Recording(MemoryBackend::new(), Mutex::new(Vec::new())));
        let engine = DatabaseEngine::new(backend.clone(), true);
        insert_entity(&engine, "obj", 1);
        engine.select(&Select::new(Table::Entities)).unwrap();

        assert_eq!(*backend.1.lock(), vec![LinkKind::Write, LinkKind::Read]);
    }

    #[test]
    fn engine_factories_share_one_backend() {
        let events = EventSystem::new();
        register_database_factories(&events, &DatabaseSettings::default()).unwrap();

        let first = events
            .require_factory::<Arc<DatabaseEngine>>("database:engine:memory", &Params::new())
            .unwrap();
        let guid = insert_entity(&first, "obj", 1);

        let second = events
            .require_factory::<Arc<DatabaseEngine>>("database:engine:default", &Params::new())
            .unwrap();
        assert!(second.select_one(&Select::entity(guid)).unwrap().is_some());
        assert_eq!(second.backend_name(), "memory");
    }

    #[test]
    fn settings_split_links_with_more_than_one() {
        let mut settings = DatabaseSettings::default();
        assert!(!settings.split_links());
        assert_eq!(settings.engine_factory(), "database:engine:memory");
        settings.links = vec!["read".to_string(), "write".to_string()];
        assert!(settings.split_links());
    }

    #[test]
    fn cache_trait_object_attaches() {
        let engine = memory_engine();
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new("database"));
        engine.attach_cache(cache);
        assert_eq!(engine.cache().map(|c| c.namespace().to_string()), Some("database".to_string()));
    }
}
