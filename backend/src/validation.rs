//! Authoring-time validation of definitions
//!
//! Evaluation never rejects a definition (malformed conditions simply fail
//! closed), so mistakes are caught here: when definitions are loaded and
//! through the validate endpoint.

use serde_json::Value;

use crate::error::{AppError, ValidationBuilder};
use crate::workflows::actions::ActionRegistry;
use ruleflow_shared::{ConditionOperator, Definition};

/// Validation result type
pub type ValidationResult<T> = Result<T, AppError>;

/// Validator builder for complex validations
pub struct Validator {
    builder: ValidationBuilder,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            builder: ValidationBuilder::new(),
        }
    }

    /// Add error for a field
    pub fn error(mut self, field: &str, message: &str) -> Self {
        self.builder.push(field, message);
        self
    }

    /// Add error if condition is true
    pub fn error_if(self, condition: bool, field: &str, message: &str) -> Self {
        if condition {
            self.error(field, message)
        } else {
            self
        }
    }

    /// Validate required non-blank string
    pub fn required_string(self, value: &str, field: &str) -> Self {
        self.error_if(value.trim().is_empty(), field, &format!("{} is required", field))
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        !self.builder.has_errors()
    }

    /// Finish validation, returning error if any
    pub fn finish(self) -> ValidationResult<()> {
        match self.builder.build() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a definition for authoring mistakes. Errors are keyed by the camelCase
/// path of the offending field, e.g. `conditions[1].value2`.
pub fn validate_definition(definition: &Definition, registry: &ActionRegistry) -> ValidationResult<()> {
    let mut validator = Validator::new()
        .required_string(&definition.name, "name")
        .required_string(&definition.trigger_key, "triggerKey");

    for (i, condition) in definition.conditions.iter().enumerate() {
        let path = format!("conditions[{}]", i);

        validator = validator.required_string(&condition.field, &format!("{}.field", path));

        validator = match condition.operator {
            ConditionOperator::Unknown => {
                validator.error(&format!("{}.operator", path), "unknown operator")
            }
            ConditionOperator::Between => validator.error_if(
                condition.value.is_null() || condition.value2.as_ref().is_none_or(Value::is_null),
                &format!("{}.value2", path),
                "between requires both value and value2",
            ),
            ConditionOperator::In | ConditionOperator::NotIn => validator.error_if(
                !condition.value.is_array(),
                &format!("{}.value", path),
                &format!("{} requires an array value", condition.operator.as_str()),
            ),
            _ => validator,
        };
    }

    for (i, action) in definition.actions.iter().enumerate() {
        let path = format!("actions[{}]", i);

        validator = validator.error_if(
            !registry.contains(&action.action_type),
            &format!("{}.type", path),
            &format!("unknown action type '{}'", action.action_type),
        );
        validator = validator.error_if(
            action.timeout_ms == Some(0),
            &format!("{}.timeoutMs", path),
            "timeoutMs must be greater than 0",
        );
    }

    if let (Some(from), Some(until)) = (definition.valid_from, definition.valid_until) {
        validator = validator.error_if(from > until, "validFrom", "validFrom must not be after validUntil");
    }

    validator.finish()
}
