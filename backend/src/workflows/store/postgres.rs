// Postgres-backed store and audit sink

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

use ruleflow_shared::{Definition, ExecutionRecord};

use super::{AuditSink, DefinitionStore, StoreError, StoreResult};

#[derive(Debug, FromRow)]
struct DefinitionRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    trigger_key: String,
    // Decoded per row so one malformed definition cannot fail a whole fetch.
    conditions: Json<Value>,
    actions: Json<Value>,
    priority: i32,
    enabled: bool,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    execution_count: i64,
    last_executed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<DefinitionRow> for Definition {
    type Error = serde_json::Error;

    fn try_from(row: DefinitionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            trigger_key: row.trigger_key,
            conditions: serde_json::from_value(row.conditions.0)?,
            actions: serde_json::from_value(row.actions.0)?,
            priority: row.priority,
            enabled: row.enabled,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            execution_count: row.execution_count,
            last_executed_at: row.last_executed_at,
            created_at: row.created_at,
        })
    }
}

/// Decode fetched rows, dropping (and logging) any whose JSONB does not parse.
fn decode_rows(rows: Vec<DefinitionRow>) -> Vec<Definition> {
    rows.into_iter()
        .filter_map(|row| {
            let (id, name) = (row.id, row.name.clone());
            match Definition::try_from(row) {
                Ok(definition) => Some(definition),
                Err(e) => {
                    warn!("Skipping malformed definition '{}' ({}): {}", name, id, e);
                    None
                }
            }
        })
        .collect()
}

const SELECT_DEFINITION: &str = r#"
    SELECT
        id, name, description, trigger_key, conditions, actions, priority, enabled,
        valid_from, valid_until, execution_count, last_executed_at, created_at
    FROM automation_definitions
"#;

#[derive(Debug, Clone)]
pub struct PgDefinitionStore {
    pool: PgPool,
}

impl PgDefinitionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a definition. Authoring normally happens elsewhere;
    /// this exists for seeding and tests.
    pub async fn save(&self, definition: &Definition) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO automation_definitions
            (id, name, description, trigger_key, conditions, actions, priority, enabled,
             valid_from, valid_until, execution_count, last_executed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE
            SET name = $2, description = $3, trigger_key = $4, conditions = $5, actions = $6,
                priority = $7, enabled = $8, valid_from = $9, valid_until = $10
            "#,
        )
        .bind(definition.id)
        .bind(&definition.name)
        .bind(&definition.description)
        .bind(&definition.trigger_key)
        .bind(Json(&definition.conditions))
        .bind(Json(&definition.actions))
        .bind(definition.priority)
        .bind(definition.enabled)
        .bind(definition.valid_from)
        .bind(definition.valid_until)
        .bind(definition.execution_count)
        .bind(definition.last_executed_at)
        .bind(definition.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl DefinitionStore for PgDefinitionStore {
    async fn list_eligible(&self, trigger_key: &str) -> StoreResult<Vec<Definition>> {
        let query = format!("{} WHERE trigger_key = $1 AND enabled = true", SELECT_DEFINITION);
        let rows = sqlx::query_as::<_, DefinitionRow>(&query)
            .bind(trigger_key)
            .fetch_all(&self.pool)
            .await?;

        Ok(decode_rows(rows))
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Definition>> {
        let query = format!("{} WHERE id = $1", SELECT_DEFINITION);
        let row = sqlx::query_as::<_, DefinitionRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Definition::try_from).transpose()?)
    }

    async fn increment_stats(&self, id: Uuid, executed_at: DateTime<Utc>) -> StoreResult<()> {
        // Single-statement increment; concurrent callers never lose updates.
        let result = sqlx::query(
            "UPDATE automation_definitions
             SET execution_count = execution_count + 1, last_executed_at = $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(executed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Unavailable(format!("definition {} no longer exists", id)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn append(&self, record: &ExecutionRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO execution_records
            (id, definition_id, definition_name, trigger_key, triggered_by, status,
             action_results, log, error, executed_at, duration_ms)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(record.definition_id)
        .bind(&record.definition_name)
        .bind(&record.trigger_key)
        .bind(&record.triggered_by)
        .bind(record.status.as_str())
        .bind(Json(&record.action_results))
        .bind(Json(&record.log))
        .bind(&record.error)
        .bind(record.executed_at)
        .bind(record.duration_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
