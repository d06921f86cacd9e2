//! Engine wrapper: link management, query cache and statistics.

use super::backend::{LinkKind, QueryOutcome, Row, StorageBackend};
use super::query::{Delete, Insert, Query, Select, Update};
use crate::cache::Cache;
use crate::error::BackendError;
use crate::Guid;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cache key prefix for single-row lookups.
const ROW_KEY_PREFIX: &str = "row:";

/// Query counters exposed for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Queries that reached the backend
    pub total_queries: u64,
    /// Every query, including those answered from the cache
    pub total_queries_inc_cached: u64,
    /// Backend executions per query transcript
    pub query_details: Vec<(String, u64)>,
}

/// Wraps a [`StorageBackend`] with lazily established links, a query cache
/// in front of reads and bookkeeping.
///
/// Every write clears the *whole* query cache before it runs, whatever it
/// touches.
pub struct DatabaseEngine {
    backend: Arc<dyn StorageBackend>,
    split_links: bool,
    debug: bool,
    established: Mutex<BTreeSet<LinkKind>>,
    cache: OnceCell<Arc<dyn Cache>>,
    total_queries: AtomicU64,
    total_queries_inc_cached: AtomicU64,
    query_details: DashMap<String, u64>,
    transcript: Mutex<Vec<String>>,
}

impl std::fmt::Debug for DatabaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseEngine")
            .field("backend", &self.backend.name())
            .field("split_links", &self.split_links)
            .field("cache", &self.cache.get().map(|c| c.namespace().to_string()))
            .finish()
    }
}

impl DatabaseEngine {
    /// Creates an engine. With `split_links` reads and writes use separate
    /// links; otherwise both share the read/write link.
    pub fn new(backend: Arc<dyn StorageBackend>, split_links: bool) -> Self {
        Self {
            backend,
            split_links,
            debug: false,
            established: Mutex::new(BTreeSet::new()),
            cache: OnceCell::new(),
            total_queries: AtomicU64::new(0),
            total_queries_inc_cached: AtomicU64::new(0),
            query_details: DashMap::new(),
            transcript: Mutex::new(Vec::new()),
        }
    }

    /// Records every executed query transcript when enabled.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Puts a query cache in front of reads. Only the first attach wins.
    pub fn attach_cache(&self, cache: Arc<dyn Cache>) -> bool {
        let namespace = cache.namespace().to_string();
        let attached = self.cache.set(cache).is_ok();
        if attached {
            debug!("🗄️ Query cache attached ({})", namespace);
        }
        attached
    }

    pub fn cache(&self) -> Option<&Arc<dyn Cache>> {
        self.cache.get()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Runs a select, answering from the cache when possible.
    pub fn select(&self, query: &Select) -> Result<Vec<Row>, BackendError> {
        let key = query.to_string();
        if let Some(rows) = self.cached(&key)? {
            return decode(&key, rows);
        }

        let rows = match self.execute(LinkKind::Read, &Query::Select(query.clone()))? {
            QueryOutcome::Rows(rows) => rows,
            other => return Err(BackendError::query(&key, format!("expected rows, got {other:?}"))),
        };

        if let Some(cache) = self.cache.get() {
            let value = encode(&key, &rows)?;
            cache.save(&key, &value)?;
        }
        Ok(rows)
    }

    /// Runs a select and maps every row.
    pub fn select_with<T, E, F>(&self, query: &Select, mut mapper: F) -> Result<Vec<T>, E>
    where
        E: From<BackendError>,
        F: FnMut(Row) -> Result<T, E>,
    {
        self.select(query)?.into_iter().map(&mut mapper).collect()
    }

    /// Runs a select and returns its first row. An empty answer is cached too.
    pub fn select_one(&self, query: &Select) -> Result<Option<Row>, BackendError> {
        let key = format!("{ROW_KEY_PREFIX}{query}");
        if let Some(row) = self.cached(&key)? {
            return decode(&key, row);
        }

        let row = match self.execute(LinkKind::Read, &Query::Select(query.clone()))? {
            QueryOutcome::Rows(rows) => rows.into_iter().next(),
            other => return Err(BackendError::query(&key, format!("expected rows, got {other:?}"))),
        };

        if let Some(cache) = self.cache.get() {
            let value = encode(&key, &row)?;
            cache.save(&key, &value)?;
        }
        Ok(row)
    }

    /// Inserts a row and returns the identifier the store assigned.
    pub fn insert(&self, query: &Insert) -> Result<Option<Guid>, BackendError> {
        let query = Query::Insert(query.clone());
        match self.write(&query)? {
            QueryOutcome::Inserted(id) => Ok(id),
            other => Err(BackendError::query(&query, format!("expected an insert id, got {other:?}"))),
        }
    }

    /// Updates an entities row. Returns whether a row changed.
    pub fn update(&self, query: &Update) -> Result<bool, BackendError> {
        let query = Query::Update(query.clone());
        match self.write(&query)? {
            QueryOutcome::Affected(count) => Ok(count > 0),
            other => Err(BackendError::query(&query, format!("expected affected rows, got {other:?}"))),
        }
    }

    /// Deletes rows. Returns how many were removed.
    pub fn delete(&self, query: &Delete) -> Result<u64, BackendError> {
        let query = Query::Delete(*query);
        match self.write(&query)? {
            QueryOutcome::Affected(count) => Ok(count),
            other => Err(BackendError::query(&query, format!("expected affected rows, got {other:?}"))),
        }
    }

    /// Cleans a user-supplied string with the backend's rules.
    pub fn sanitize(&self, value: &str) -> String {
        self.backend.sanitize(value)
    }

    /// Drops every cached query result.
    pub fn clear_cache(&self) -> Result<(), BackendError> {
        if let Some(cache) = self.cache.get() {
            cache.clear()?;
        }
        Ok(())
    }

    pub fn stats(&self) -> EngineStats {
        let mut query_details: Vec<(String, u64)> = self
            .query_details
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        query_details.sort();

        EngineStats {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            total_queries_inc_cached: self.total_queries_inc_cached.load(Ordering::Relaxed),
            query_details,
        }
    }

    /// Executed query transcripts since the last call. Empty unless debug is on.
    pub fn take_transcript(&self) -> Vec<String> {
        std::mem::take(&mut *self.transcript.lock())
    }

    fn cached(&self, key: &str) -> Result<Option<Value>, BackendError> {
        self.total_queries_inc_cached.fetch_add(1, Ordering::Relaxed);
        match self.cache.get() {
            Some(cache) => {
                let hit = cache.load(key)?;
                if hit.is_some() {
                    debug!("🎯 Query cache hit: {}", key);
                }
                Ok(hit)
            }
            None => Ok(None),
        }
    }

    fn write(&self, query: &Query) -> Result<QueryOutcome, BackendError> {
        self.total_queries_inc_cached.fetch_add(1, Ordering::Relaxed);
        self.clear_cache()?;
        self.execute(LinkKind::Write, query)
    }

    fn execute(&self, requested: LinkKind, query: &Query) -> Result<QueryOutcome, BackendError> {
        let link = self.link(requested)?;
        let transcript = query.to_string();

        self.total_queries.fetch_add(1, Ordering::Relaxed);
        *self.query_details.entry(transcript.clone()).or_insert(0) += 1;
        if self.debug {
            debug!("🔎 [{}] {}", link, transcript);
            self.transcript.lock().push(transcript);
        }

        self.backend.execute(link, query)
    }

    /// Picks the link for a request, establishing it on first use. A split
    /// link that cannot be opened falls back to the read/write link.
    fn link(&self, requested: LinkKind) -> Result<LinkKind, BackendError> {
        let wanted = if self.split_links {
            requested
        } else {
            LinkKind::ReadWrite
        };

        let mut established = self.established.lock();
        if established.contains(&wanted) {
            return Ok(wanted);
        }

        match self.backend.establish_link(wanted) {
            Ok(()) => {
                info!("🔌 Established {} link to {}", wanted, self.backend.name());
                established.insert(wanted);
                Ok(wanted)
            }
            Err(e) if wanted != LinkKind::ReadWrite => {
                warn!("⚠️ Could not open {} link ({}), falling back to readwrite", wanted, e);
                if !established.contains(&LinkKind::ReadWrite) {
                    self.backend.establish_link(LinkKind::ReadWrite)?;
                    established.insert(LinkKind::ReadWrite);
                }
                Ok(LinkKind::ReadWrite)
            }
            Err(e) => Err(e),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|e| BackendError::query(key, e.to_string()))
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Value, BackendError> {
    serde_json::to_value(value).map_err(|e| BackendError::query(key, e.to_string()))
}
