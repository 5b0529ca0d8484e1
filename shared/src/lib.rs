use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================
// Conditions
// ============================================

/// Comparison applied between a payload field and a condition value.
///
/// Unrecognised operator strings deserialize to `Unknown`, which always
/// evaluates to `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NotContains,
    In,
    NotIn,
    Between,
    #[serde(other)]
    Unknown,
}

impl ConditionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Between => "between",
            Self::Unknown => "unknown",
        }
    }
}

/// How the *next* condition's result is folded into the running result.
///
/// Unrecognised strings deserialize to `Unknown`, which folds like `And`: it
/// can only turn a match into a non-match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
    #[serde(rename = "UNKNOWN", other)]
    Unknown,
}

/// A single field test against the entity payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Dot-separated path into the payload (e.g. `customer.tier`)
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
    /// Upper bound for `between`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<LogicalOperator>,
}

impl Condition {
    pub fn new(field: &str, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value,
            value2: None,
            logical_operator: None,
        }
    }

    pub fn equals(field: &str, value: Value) -> Self {
        Self::new(field, ConditionOperator::Equals, value)
    }

    pub fn not_equals(field: &str, value: Value) -> Self {
        Self::new(field, ConditionOperator::NotEquals, value)
    }

    pub fn gt(field: &str, value: Value) -> Self {
        Self::new(field, ConditionOperator::Gt, value)
    }

    pub fn lt(field: &str, value: Value) -> Self {
        Self::new(field, ConditionOperator::Lt, value)
    }

    pub fn contains(field: &str, value: &str) -> Self {
        Self::new(field, ConditionOperator::Contains, Value::String(value.to_string()))
    }

    pub fn in_list(field: &str, values: Vec<Value>) -> Self {
        Self::new(field, ConditionOperator::In, Value::Array(values))
    }

    pub fn between(field: &str, low: Value, high: Value) -> Self {
        let mut condition = Self::new(field, ConditionOperator::Between, low);
        condition.value2 = Some(high);
        condition
    }

    /// Fold the following condition with OR.
    pub fn or(mut self) -> Self {
        self.logical_operator = Some(LogicalOperator::Or);
        self
    }

    /// Fold the following condition with AND (the default).
    pub fn and(mut self) -> Self {
        self.logical_operator = Some(LogicalOperator::And);
        self
    }
}

// ============================================
// Actions
// ============================================

/// An action dispatched when a definition's conditions match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Tag resolved through the handler registry
    #[serde(rename = "type")]
    pub action_type: String,
    /// Handler-specific settings, opaque to the engine
    #[serde(default)]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    /// Overrides the engine's default per-action timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Action {
    pub fn new(action_type: &str, config: Value) -> Self {
        Self {
            action_type: action_type.to_string(),
            config,
            order: None,
            timeout_ms: None,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn sort_key(&self) -> i32 {
        self.order.unwrap_or(0)
    }
}

// ============================================
// Definitions (rules and workflows)
// ============================================

fn default_enabled() -> bool {
    true
}

/// A rule or workflow: conditions, actions, and selection metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Rule type tag or event name this definition listens to
    pub trigger_key: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Higher runs first
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub execution_count: i64,
    #[serde(default)]
    pub last_executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Definition {
    pub fn new(name: &str, trigger_key: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            trigger_key: trigger_key.to_string(),
            conditions: Vec::new(),
            actions: Vec::new(),
            priority: 0,
            enabled: true,
            valid_from: None,
            valid_until: None,
            execution_count: 0,
            last_executed_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_validity(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_until = valid_until;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether `now` falls inside the (open-ended, inclusive) validity window.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_from.is_none_or(|from| from <= now)
            && self.valid_until.is_none_or(|until| until >= now)
    }
}

// ============================================
// Execution results and audit records
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Failed,
}

/// Outcome of one dispatched action, in dispatch order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub action_type: String,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    pub duration_ms: i64,
}

impl ActionOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Partial,
    Failed,
    Skipped,
}

impl ExecutionStatus {
    /// Aggregate status for a matched attempt. Zero actions counts as success.
    pub fn from_outcomes(outcomes: &[ActionOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        if succeeded == outcomes.len() {
            Self::Success
        } else if succeeded == 0 {
            Self::Failed
        } else {
            Self::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(Self::Success),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// Immutable audit entry for one evaluation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub definition_id: Uuid,
    pub definition_name: String,
    pub trigger_key: String,
    /// Reference to the event or payload that caused the attempt
    pub triggered_by: String,
    pub status: ExecutionStatus,
    pub action_results: Vec<ActionOutcome>,
    pub log: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Per-definition line of a trigger invocation's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub definition_id: Uuid,
    pub definition_name: String,
    pub status: ExecutionStatus,
    pub duration_ms: i64,
}
