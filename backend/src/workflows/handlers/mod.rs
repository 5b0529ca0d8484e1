// Built-in action handlers
//
// Each handler is registered under a tag; adding a capability means adding
// a handler and one `register` call below.

use serde_json::Value;
use std::sync::Arc;

use super::actions::ActionRegistry;
use super::conditions::get_field;
use super::gateway::{EntityGateway, Notifier};

pub mod alerts;
pub mod inventory;
pub mod orders;
pub mod pricing;
pub mod segments;
pub mod webhook;

pub use alerts::AlertHandler;
pub use inventory::ReorderStockHandler;
pub use orders::BlockOrderHandler;
pub use pricing::DiscountHandler;
pub use segments::SegmentHandler;
pub use webhook::WebhookHandler;

pub const APPLY_DISCOUNT: &str = "apply_discount";
pub const REORDER_STOCK: &str = "reorder_stock";
pub const ASSIGN_SEGMENT: &str = "assign_segment";
pub const BLOCK_ORDER: &str = "block_order";
pub const SEND_ALERT: &str = "send_alert";
pub const CALL_WEBHOOK: &str = "call_webhook";

/// Registry containing every built-in handler.
pub fn builtin_registry(
    gateway: Arc<dyn EntityGateway>,
    notifier: Arc<dyn Notifier>,
    http: reqwest::Client,
) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry
        .register(APPLY_DISCOUNT, DiscountHandler)
        .register(REORDER_STOCK, ReorderStockHandler::new(gateway.clone()))
        .register(ASSIGN_SEGMENT, SegmentHandler::new(gateway.clone()))
        .register(BLOCK_ORDER, BlockOrderHandler::new(gateway))
        .register(SEND_ALERT, AlertHandler::new(notifier))
        .register(CALL_WEBHOOK, WebhookHandler::new(http));
    registry
}

/// Non-empty string setting from an action config.
pub(crate) fn config_str<'a>(config: &'a Value, key: &str) -> Option<&'a str> {
    config
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Entity identifier at `path`; strings and numbers are accepted.
pub(crate) fn entity_id(payload: &Value, path: &str) -> Option<String> {
    match get_field(payload, path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
