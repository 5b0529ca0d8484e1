use serde_json::json;

use crate::tests::fixtures::OrderFixture;
use crate::workflows::conditions::{eval_list, presets};
use ruleflow_shared::Condition;

#[test]
fn test_presets_against_order_payload() {
    let order = OrderFixture::default().with_total(250.0).vip().with_email("buyer@mailinator.com");
    let payload = order.payload();

    assert!(eval_list(&[presets::order_total_above(100.0)], &payload));
    assert!(eval_list(&[presets::vip_customer()], &payload));
    assert!(eval_list(&[presets::ships_to(&["US", "CA"])], &payload));
    assert!(eval_list(&[presets::email_domain("MAILINATOR.com")], &payload));
    assert!(!eval_list(&[presets::ships_to(&["DE"])], &payload));
}

#[test]
fn test_fold_has_no_precedence() {
    // (total > 1000 OR vip) AND ships to DE, evaluated strictly left to right
    let conditions = vec![
        Condition::gt("total", json!(1000)).or(),
        presets::vip_customer(),
        presets::ships_to(&["DE"]),
    ];
    let payload = OrderFixture::default().with_total(20.0).vip().payload();
    assert!(!eval_list(&conditions, &payload));

    // AND binds to the running result, not to its neighbour
    let conditions = vec![
        presets::ships_to(&["DE"]),
        presets::vip_customer().or(),
        Condition::gt("total", json!(10)),
    ];
    assert!(eval_list(&conditions, &payload));
}

#[test]
fn test_missing_nested_field_fails_closed() {
    let payload = json!({ "id": "ord-1", "total": 10 });
    assert!(!eval_list(&[presets::vip_customer()], &payload));
    assert!(!eval_list(&[presets::ships_to(&["US"])], &payload));
}
