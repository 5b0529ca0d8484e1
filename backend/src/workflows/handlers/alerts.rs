// Alerts - operator notifications

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::config_str;
use crate::workflows::actions::{ActionError, ActionHandler, ActionResult};
use crate::workflows::gateway::{Alert, AlertSeverity, Notifier};

/// `send_alert`: `message` is required; `severity` defaults to `info` and
/// `channel` to `ops`. Placeholders in the message are resolved by the
/// dispatcher before this runs.
pub struct AlertHandler {
    notifier: Arc<dyn Notifier>,
}

impl AlertHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl ActionHandler for AlertHandler {
    async fn execute(&self, config: &Value, _payload: &Value) -> Result<ActionResult, ActionError> {
        let Some(message) = config_str(config, "message") else {
            return Ok(ActionResult::failure("Missing message"));
        };
        let severity = match config_str(config, "severity") {
            None => AlertSeverity::Info,
            Some(raw) => match AlertSeverity::parse(raw) {
                Some(severity) => severity,
                None => return Ok(ActionResult::failure(&format!("Unknown severity '{}'", raw))),
            },
        };

        let alert = Alert {
            channel: config_str(config, "channel").unwrap_or("ops").to_string(),
            severity,
            message: message.to_string(),
        };
        self.notifier.notify(&alert).await?;

        Ok(ActionResult::success(Some(json!({
            "channel": alert.channel,
            "severity": alert.severity,
            "message": alert.message,
        }))))
    }
}
