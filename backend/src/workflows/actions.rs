// Workflow Actions - Handler contract and the action-type registry

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use ruleflow_shared::{Action, ActionOutcome, ActionStatus};

use super::gateway::GatewayError;

/// Result reported by a handler.
///
/// Expected failures (missing config, entity not eligible) are reported as
/// `success: false` rather than as an [`ActionError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
}

impl ActionResult {
    pub fn success(output: Option<Value>) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn failure(error: &str) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.to_string()),
        }
    }
}

/// Unexpected handler failure. The dispatcher turns it into a failed entry.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("{0}")]
    Other(String),
}

/// Executes one action type against a payload.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, config: &Value, payload: &Value) -> Result<ActionResult, ActionError>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> ActionHandler for FnHandler<F>
where
    F: Fn(&Value, &Value) -> Result<ActionResult, ActionError> + Send + Sync,
{
    async fn execute(&self, config: &Value, payload: &Value) -> Result<ActionResult, ActionError> {
        (self.0)(config, payload)
    }
}

/// Maps action-type tags to handlers. New capabilities are added here only.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous handler for the tag.
    pub fn register<H>(&mut self, action_type: &str, handler: H) -> &mut Self
    where
        H: ActionHandler + 'static,
    {
        self.handlers.insert(action_type.to_string(), Arc::new(handler));
        self
    }

    /// Register a synchronous closure as a handler.
    pub fn register_fn<F>(&mut self, action_type: &str, handler: F) -> &mut Self
    where
        F: Fn(&Value, &Value) -> Result<ActionResult, ActionError> + Send + Sync + 'static,
    {
        self.register(action_type, FnHandler(handler))
    }

    pub fn get(&self, action_type: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(action_type).cloned()
    }

    pub fn contains(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    pub fn action_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("action_types", &self.action_types())
            .finish()
    }
}
