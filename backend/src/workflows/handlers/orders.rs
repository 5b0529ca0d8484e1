// Orders - hold an order for manual review

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{config_str, entity_id};
use crate::workflows::actions::{ActionError, ActionHandler, ActionResult};
use crate::workflows::gateway::EntityGateway;

const DEFAULT_REASON: &str = "Blocked by automation";

/// `block_order`
pub struct BlockOrderHandler {
    gateway: Arc<dyn EntityGateway>,
}

impl BlockOrderHandler {
    pub fn new(gateway: Arc<dyn EntityGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ActionHandler for BlockOrderHandler {
    async fn execute(&self, config: &Value, payload: &Value) -> Result<ActionResult, ActionError> {
        let reason = config_str(config, "reason").unwrap_or(DEFAULT_REASON);
        let order_field = config_str(config, "orderField").unwrap_or("id");
        let Some(order_id) = entity_id(payload, order_field) else {
            return Ok(ActionResult::failure(&format!("Missing order id at '{}'", order_field)));
        };

        self.gateway.block_order(&order_id, reason).await?;

        Ok(ActionResult::success(Some(json!({
            "orderId": order_id,
            "blocked": true,
            "reason": reason,
        }))))
    }
}
