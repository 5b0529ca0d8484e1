// Pricing - percentage or fixed-amount discount on a payload price

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde_json::{Value, json};

use super::config_str;
use crate::workflows::actions::{ActionError, ActionHandler, ActionResult};
use crate::workflows::conditions::get_field;

/// `apply_discount`: computes the discounted price of `config.field`
/// (default `total`). Amounts are rounded to two decimal places and the
/// discount never exceeds the original price.
pub struct DiscountHandler;

#[async_trait]
impl ActionHandler for DiscountHandler {
    async fn execute(&self, config: &Value, payload: &Value) -> Result<ActionResult, ActionError> {
        let field = config_str(config, "field").unwrap_or("total");

        let Some(original) = get_field(payload, field)
            .and_then(Value::as_f64)
            .and_then(Decimal::from_f64)
        else {
            return Ok(ActionResult::failure(&format!(
                "Payload field '{}' is missing or not a number",
                field
            )));
        };
        if original.is_sign_negative() {
            return Ok(ActionResult::failure("Price cannot be negative"));
        }

        let discount = if let Some(percent) = config.get("discountPercent").and_then(Value::as_f64) {
            if !(0.0..=100.0).contains(&percent) {
                return Ok(ActionResult::failure("discountPercent must be between 0 and 100"));
            }
            let Some(percent) = Decimal::from_f64(percent) else {
                return Ok(ActionResult::failure("Invalid discountPercent"));
            };
            original * percent / Decimal::ONE_HUNDRED
        } else if let Some(amount) = config.get("discountAmount").and_then(Value::as_f64) {
            match Decimal::from_f64(amount) {
                Some(amount) if !amount.is_sign_negative() => amount,
                _ => return Ok(ActionResult::failure("discountAmount must be a non-negative number")),
            }
        } else {
            return Ok(ActionResult::failure("Missing discountPercent or discountAmount"));
        };

        let discount = discount.min(original).round_dp(2);
        let discounted = (original - discount).round_dp(2);

        Ok(ActionResult::success(Some(json!({
            "originalPrice": money(original),
            "discountedPrice": money(discounted),
            "discountAmount": money(discount),
        }))))
    }
}

fn money(amount: Decimal) -> Value {
    amount.to_f64().map(Value::from).unwrap_or(Value::Null)
}
