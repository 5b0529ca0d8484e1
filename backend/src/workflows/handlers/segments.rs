// Segments - place a user into a marketing/customer segment

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{config_str, entity_id};
use crate::workflows::actions::{ActionError, ActionHandler, ActionResult};
use crate::workflows::gateway::EntityGateway;

/// `assign_segment`
pub struct SegmentHandler {
    gateway: Arc<dyn EntityGateway>,
}

impl SegmentHandler {
    pub fn new(gateway: Arc<dyn EntityGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ActionHandler for SegmentHandler {
    async fn execute(&self, config: &Value, payload: &Value) -> Result<ActionResult, ActionError> {
        let Some(segment) = config_str(config, "segment") else {
            return Ok(ActionResult::failure("Missing segment"));
        };
        let user_field = config_str(config, "userField").unwrap_or("id");
        let Some(user_id) = entity_id(payload, user_field) else {
            return Ok(ActionResult::failure(&format!("Missing user id at '{}'", user_field)));
        };

        self.gateway.assign_segment(&user_id, segment).await?;

        Ok(ActionResult::success(Some(json!({
            "userId": user_id,
            "segment": segment,
        }))))
    }
}
