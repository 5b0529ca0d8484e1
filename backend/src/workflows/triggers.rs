// Workflow Triggers - Event envelope handed to the engine by trigger sources

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

/// Well-known trigger keys. Definitions may use any string; these are the
/// ones emitted by the constructors below.
pub mod keys {
    pub const ORDER_CREATED: &str = "order_created";
    pub const USER_REGISTERED: &str = "user_registered";
    pub const PRODUCT_STOCK_CHANGED: &str = "product_stock_changed";
    pub const PRICING: &str = "pricing";
    pub const FRAUD_CHECK: &str = "fraud_check";
}

/// Payload for trigger events
pub type EventPayload = Value;

/// A trigger invocation: which definitions to select and the payload they see.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub event_id: Uuid,
    pub trigger_key: String,
    pub payload: EventPayload,
    pub source: EventSource,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
}

/// Source of the trigger event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    System,
    User(Uuid),
    Api,
    Webhook,
    Scheduler,
    Manual,
}

impl EventSource {
    fn label(&self) -> String {
        match self {
            Self::System => "system".to_string(),
            Self::User(id) => format!("user:{}", id),
            Self::Api => "api".to_string(),
            Self::Webhook => "webhook".to_string(),
            Self::Scheduler => "scheduler".to_string(),
            Self::Manual => "manual".to_string(),
        }
    }
}

impl TriggerEvent {
    pub fn new(trigger_key: impl Into<String>, payload: EventPayload, source: EventSource) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            trigger_key: trigger_key.into(),
            payload,
            source,
            timestamp: Utc::now(),
            correlation_id: None,
        }
    }

    pub fn order_created(order: Value, source: EventSource) -> Self {
        Self::new(keys::ORDER_CREATED, order, source)
    }

    pub fn user_registered(user: Value) -> Self {
        Self::new(keys::USER_REGISTERED, user, EventSource::System)
    }

    pub fn product_stock_changed(product_id: &str, stock: i64) -> Self {
        Self::new(
            keys::PRODUCT_STOCK_CHANGED,
            json!({
                "id": product_id,
                "stock": stock
            }),
            EventSource::System,
        )
    }

    /// Cron tick for `trigger_key`.
    pub fn scheduled(trigger_key: &str) -> Self {
        let now = Utc::now();
        let mut event = Self::new(
            trigger_key,
            json!({
                "scheduledAt": now,
                "triggerKey": trigger_key
            }),
            EventSource::Scheduler,
        );
        event.timestamp = now;
        event
    }

    /// Manual test run of a single definition.
    pub fn manual(trigger_key: &str, payload: EventPayload) -> Self {
        Self::new(trigger_key, payload, EventSource::Manual)
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Reference stored as `triggeredBy` on execution records.
    ///
    /// Uses the payload's `id` when it has one, otherwise the event id.
    pub fn reference(&self) -> String {
        match self.payload.get("id") {
            Some(Value::String(id)) => format!("{}/{}", self.source.label(), id),
            Some(id @ Value::Number(_)) => format!("{}/{}", self.source.label(), id),
            _ => format!("{}/event:{}", self.source.label(), self.event_id),
        }
    }
}
