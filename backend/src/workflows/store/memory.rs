// In-memory store and audit sink

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use ruleflow_shared::{Definition, ExecutionRecord};

use super::{AuditSink, DefinitionStore, StoreError, StoreResult};
use crate::validation::validate_definition;
use crate::workflows::actions::ActionRegistry;

/// Definitions held in a map behind a lock.
///
/// `increment_stats` mutates under the write lock, so concurrent increments
/// are serialised and none are lost.
#[derive(Debug, Default)]
pub struct InMemoryDefinitionStore {
    definitions: RwLock<HashMap<Uuid, Definition>>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definitions(definitions: impl IntoIterator<Item = Definition>) -> Self {
        Self {
            definitions: RwLock::new(definitions.into_iter().map(|d| (d.id, d)).collect()),
        }
    }

    /// Load a JSON array of definitions, dropping any entry that does not
    /// parse or fails validation against `registry`.
    pub async fn from_json_file(path: impl AsRef<Path>, registry: &ActionRegistry) -> StoreResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let entries: Vec<Value> = serde_json::from_str(&raw)?;
        let total = entries.len();

        let accepted: Vec<Definition> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(i, entry)| match serde_json::from_value::<Definition>(entry) {
                Ok(definition) => Some(definition),
                Err(e) => {
                    warn!("Rejected definition #{} in {}: {}", i, path.display(), e);
                    None
                }
            })
            .filter(|definition| match validate_definition(definition, registry) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Rejected definition '{}' ({}): {}", definition.name, definition.id, e);
                    false
                }
            })
            .collect();

        info!("Loaded {} of {} definitions from {}", accepted.len(), total, path.display());
        Ok(Self::with_definitions(accepted))
    }

    pub async fn all(&self) -> Vec<Definition> {
        self.definitions.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl DefinitionStore for InMemoryDefinitionStore {
    async fn list_eligible(&self, trigger_key: &str) -> StoreResult<Vec<Definition>> {
        Ok(self
            .definitions
            .read()
            .await
            .values()
            .filter(|d| d.enabled && d.trigger_key == trigger_key)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Definition>> {
        Ok(self.definitions.read().await.get(&id).cloned())
    }

    async fn increment_stats(&self, id: Uuid, executed_at: DateTime<Utc>) -> StoreResult<()> {
        let mut definitions = self.definitions.write().await;
        let definition = definitions
            .get_mut(&id)
            .ok_or_else(|| StoreError::Unavailable(format!("definition {} no longer exists", id)))?;
        definition.execution_count += 1;
        definition.last_executed_at = Some(executed_at);
        Ok(())
    }
}

/// Keeps execution records in append order.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    records: RwLock<Vec<ExecutionRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<ExecutionRecord> {
        self.records.read().await.clone()
    }

    pub async fn for_definition(&self, definition_id: Uuid) -> Vec<ExecutionRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.definition_id == definition_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append(&self, record: &ExecutionRecord) -> StoreResult<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }
}
