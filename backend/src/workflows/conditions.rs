// Workflow Conditions - Left-to-right condition fold over an entity payload
//
// Coercion rules (no implicit conversion between kinds):
// - numbers compare numerically regardless of integer/float representation;
//   two integers compare exactly, so ids above 2^53 stay distinct
// - an unknown logical operator folds like AND
// - ordering (gt/gte/lt/lte/between) is defined for number/number and
//   string/string pairs only; any other pairing is `false`
// - contains/not_contains stringify both sides (strings raw, other values as
//   JSON, an absent field as the empty string) and compare case-insensitively
// - an absent field equals nothing and is ordered against nothing

use serde_json::{Number, Value};
use std::cmp::Ordering;

pub use ruleflow_shared::{Condition, ConditionOperator, LogicalOperator};

/// Follow a dot-separated path into the payload. `None` means absent.
pub fn get_field<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(payload, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

/// Evaluate one operator. Never fails: unsupported combinations are `false`.
pub fn eval_one(
    value: Option<&Value>,
    operator: ConditionOperator,
    cmp: &Value,
    cmp2: Option<&Value>,
) -> bool {
    match operator {
        ConditionOperator::Equals => value.is_some_and(|v| values_equal(v, cmp)),
        ConditionOperator::NotEquals => !value.is_some_and(|v| values_equal(v, cmp)),
        ConditionOperator::Gt => compare(value, cmp).is_some_and(Ordering::is_gt),
        ConditionOperator::Gte => compare(value, cmp).is_some_and(Ordering::is_ge),
        ConditionOperator::Lt => compare(value, cmp).is_some_and(Ordering::is_lt),
        ConditionOperator::Lte => compare(value, cmp).is_some_and(Ordering::is_le),
        ConditionOperator::Contains => contains_ignore_case(value, cmp),
        ConditionOperator::NotContains => !contains_ignore_case(value, cmp),
        // A non-array compare value makes both `in` and `not_in` false.
        ConditionOperator::In => match cmp {
            Value::Array(items) => value.is_some_and(|v| items.iter().any(|i| values_equal(v, i))),
            _ => false,
        },
        ConditionOperator::NotIn => match cmp {
            Value::Array(items) => !value.is_some_and(|v| items.iter().any(|i| values_equal(v, i))),
            _ => false,
        },
        ConditionOperator::Between => match cmp2 {
            Some(upper) if !cmp.is_null() && !upper.is_null() => {
                compare(value, cmp).is_some_and(Ordering::is_ge)
                    && compare(value, upper).is_some_and(Ordering::is_le)
            }
            _ => false,
        },
        ConditionOperator::Unknown => false,
    }
}

/// Evaluate a single condition against the payload.
pub fn eval_condition(condition: &Condition, payload: &Value) -> bool {
    eval_one(
        get_field(payload, &condition.field),
        condition.operator,
        &condition.value,
        condition.value2.as_ref(),
    )
}

/// Strict left-to-right fold with no precedence. The logical operator on
/// condition `i` decides how condition `i + 1` is combined. Empty is `true`.
pub fn eval_list(conditions: &[Condition], payload: &Value) -> bool {
    fold(conditions, payload, |_, _| {})
}

/// Same fold as [`eval_list`], also returning one trace line per condition.
pub fn eval_list_traced(conditions: &[Condition], payload: &Value) -> (bool, Vec<String>) {
    let mut trace = Vec::with_capacity(conditions.len());
    let result = fold(conditions, payload, |condition, passed| {
        let actual = get_field(payload, &condition.field)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "<absent>".to_string());
        trace.push(format!(
            "condition {} {} {} (actual {}) => {}",
            condition.field,
            condition.operator.as_str(),
            condition.value,
            actual,
            passed
        ));
    });
    (result, trace)
}

fn fold<F>(conditions: &[Condition], payload: &Value, mut observe: F) -> bool
where
    F: FnMut(&Condition, bool),
{
    let Some((first, rest)) = conditions.split_first() else {
        return true;
    };

    let mut result = eval_condition(first, payload);
    observe(first, result);

    let mut previous = first;
    for condition in rest {
        let passed = eval_condition(condition, payload);
        observe(condition, passed);
        result = match previous.logical_operator.unwrap_or_default() {
            LogicalOperator::And | LogicalOperator::Unknown => result && passed,
            LogicalOperator::Or => result || passed,
        };
        previous = condition;
    }

    result
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

fn compare(value: Option<&Value>, cmp: &Value) -> Option<Ordering> {
    match (value?, cmp) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Integers compare exactly; floats only enter when one side is a float.
fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    match (as_integer(x), as_integer(y)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn stringify(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn contains_ignore_case(value: Option<&Value>, cmp: &Value) -> bool {
    let haystack = stringify(value).to_lowercase();
    let needle = stringify(Some(cmp)).to_lowercase();
    haystack.contains(&needle)
}

/// Common condition presets for commerce automations
pub mod presets {
    use super::*;
    use serde_json::json;

    /// Order total above a threshold
    pub fn order_total_above(amount: f64) -> Condition {
        Condition::gt("total", json!(amount))
    }

    /// Customer flagged as VIP
    pub fn vip_customer() -> Condition {
        Condition::equals("customer.isVip", json!(true))
    }

    /// Product stock at or below a reorder point
    pub fn stock_at_or_below(threshold: i64) -> Condition {
        Condition::new("stock", ConditionOperator::Lte, json!(threshold))
    }

    /// Shipping country is one of the given codes
    pub fn ships_to(countries: &[&str]) -> Condition {
        Condition::in_list(
            "shipping.country",
            countries.iter().map(|c| json!(c)).collect(),
        )
    }

    /// Order placed with a disposable or flagged email domain
    pub fn email_domain(domain: &str) -> Condition {
        Condition::contains("customer.email", domain)
    }
}
