// Workflow Executor - Dispatches an ordered action list against a payload

use futures::FutureExt;
use regex::Regex;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::actions::{Action, ActionOutcome, ActionRegistry, ActionResult, ActionStatus};
use super::conditions::get_field;

static TEMPLATE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^}]+?)\s*\}\}").expect("template pattern is valid"));

/// Runs actions strictly in sequence, isolating each one's failure.
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    registry: Arc<ActionRegistry>,
    default_timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(registry: Arc<ActionRegistry>, default_timeout: Duration) -> Self {
        Self {
            registry,
            default_timeout,
        }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Execute every action, ordered by `order` (stable, default 0).
    ///
    /// Always returns one outcome per action; a failure never stops the
    /// remaining actions.
    pub async fn execute_actions(&self, actions: &[Action], payload: &Value) -> Vec<ActionOutcome> {
        let mut ordered: Vec<&Action> = actions.iter().collect();
        ordered.sort_by_key(|action| action.sort_key());

        let mut outcomes = Vec::with_capacity(ordered.len());
        for action in ordered {
            outcomes.push(self.execute_action(action, payload).await);
        }
        outcomes
    }

    /// Execute a single action inside the failure boundary.
    pub async fn execute_action(&self, action: &Action, payload: &Value) -> ActionOutcome {
        let start = Instant::now();

        let result = match self.registry.get(&action.action_type) {
            Some(handler) => {
                let config = process_templates(&action.config, payload);
                let limit = action
                    .timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(self.default_timeout);

                debug!("Executing action: {} (timeout {}ms)", action.action_type, limit.as_millis());

                let guarded = AssertUnwindSafe(handler.execute(&config, payload)).catch_unwind();
                match tokio::time::timeout(limit, guarded).await {
                    Ok(Ok(Ok(result))) => result,
                    Ok(Ok(Err(e))) => ActionResult::failure(&e.to_string()),
                    Ok(Err(panic)) => ActionResult::failure(&format!(
                        "action handler panicked: {}",
                        panic_message(panic.as_ref())
                    )),
                    Err(_) => ActionResult::failure(&format!(
                        "action timed out after {}ms",
                        limit.as_millis()
                    )),
                }
            }
            None => ActionResult::failure(&format!(
                "no handler registered for action type '{}'",
                action.action_type
            )),
        };

        let duration_ms = start.elapsed().as_millis() as i64;

        if result.success {
            info!("Action {} succeeded in {}ms", action.action_type, duration_ms);
        } else {
            warn!(
                "Action {} failed in {}ms: {}",
                action.action_type,
                duration_ms,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }

        ActionOutcome {
            action_type: action.action_type.clone(),
            status: if result.success {
                ActionStatus::Success
            } else {
                ActionStatus::Failed
            },
            error: if result.success {
                None
            } else {
                Some(result.error.unwrap_or_else(|| "action failed".to_string()))
            },
            output: result.output,
            duration_ms,
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Replace `{{path}}` placeholders in every string of the config.
pub fn process_templates(config: &Value, payload: &Value) -> Value {
    match config {
        Value::String(s) => Value::String(replace_template_vars(s, payload)),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), process_templates(v, payload)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| process_templates(v, payload)).collect()),
        _ => config.clone(),
    }
}

fn replace_template_vars(template: &str, payload: &Value) -> String {
    TEMPLATE_VAR
        .replace_all(template, |caps: &regex::Captures| match get_field(payload, &caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
