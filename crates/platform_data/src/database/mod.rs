//! Storage for entities: a backend-neutral query model, the engine that runs
//! it with caching and statistics, and an in-memory backend.

mod backend;
mod engine;
pub mod factory;
mod memory;
pub mod query;
mod tests;

pub use self::backend::{LinkKind, QueryOutcome, Row, StorageBackend};
pub use self::engine::{DatabaseEngine, EngineStats};
pub use self::factory::{register_database_factories, DatabaseSettings, DATABASE_FACTORIES};
pub use self::memory::MemoryBackend;
