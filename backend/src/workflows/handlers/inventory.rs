// Inventory - reorder stock when a product falls to its reorder point

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{config_str, entity_id};
use crate::workflows::actions::{ActionError, ActionHandler, ActionResult};
use crate::workflows::conditions::get_field;
use crate::workflows::gateway::EntityGateway;

/// `reorder_stock`: when `stock <= threshold`, asks the gateway to reorder
/// `quantity` units. Above the threshold the action succeeds without
/// reordering.
pub struct ReorderStockHandler {
    gateway: Arc<dyn EntityGateway>,
}

impl ReorderStockHandler {
    pub fn new(gateway: Arc<dyn EntityGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ActionHandler for ReorderStockHandler {
    async fn execute(&self, config: &Value, payload: &Value) -> Result<ActionResult, ActionError> {
        let Some(quantity) = config.get("quantity").and_then(Value::as_i64).filter(|q| *q > 0) else {
            return Ok(ActionResult::failure("Missing or invalid quantity"));
        };
        let threshold = config.get("threshold").and_then(Value::as_f64).unwrap_or(0.0);
        let product_field = config_str(config, "productField").unwrap_or("id");
        let stock_field = config_str(config, "stockField").unwrap_or("stock");

        let Some(product_id) = entity_id(payload, product_field) else {
            return Ok(ActionResult::failure(&format!("Missing product id at '{}'", product_field)));
        };
        let Some(stock) = get_field(payload, stock_field).filter(|v| v.is_number()) else {
            return Ok(ActionResult::failure(&format!("Missing stock level at '{}'", stock_field)));
        };

        if stock.as_f64().is_some_and(|level| level > threshold) {
            return Ok(ActionResult::success(Some(json!({
                "productId": product_id,
                "currentStock": stock,
                "reordered": false,
            }))));
        }

        self.gateway.reorder_stock(&product_id, quantity).await?;

        Ok(ActionResult::success(Some(json!({
            "productId": product_id,
            "currentStock": stock,
            "reorderQuantity": quantity,
            "reordered": true,
        }))))
    }
}
