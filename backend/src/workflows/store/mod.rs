// Definition Store and Audit Sink - the engine's persistence seams
//
// The engine only reads definitions and never performs read-modify-write on
// them: `increment_stats` must be atomic in every implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use ruleflow_shared::{Definition, ExecutionRecord};

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryAuditSink, InMemoryDefinitionStore};
pub use postgres::{PgAuditSink, PgDefinitionStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// Enabled definitions registered for `trigger_key`, in any order.
    async fn list_eligible(&self, trigger_key: &str) -> StoreResult<Vec<Definition>>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Definition>>;

    /// Atomically add one to `execution_count` and set `last_executed_at`.
    async fn increment_stats(&self, id: Uuid, executed_at: DateTime<Utc>) -> StoreResult<()>;
}

/// Append-only destination for execution records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: &ExecutionRecord) -> StoreResult<()>;
}
