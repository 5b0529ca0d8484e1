use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::tests::fixtures::{OrderFixture, ProductFixture};
use crate::workflows::executor::ActionDispatcher;
use crate::workflows::gateway::{Alert, AlertSeverity, GatewayCall, RecordingGateway};
use crate::workflows::handlers::{BLOCK_ORDER, REORDER_STOCK, SEND_ALERT, builtin_registry};
use ruleflow_shared::{Action, ActionStatus};

fn dispatcher(gateway: Arc<RecordingGateway>) -> ActionDispatcher {
    let registry = builtin_registry(gateway.clone(), gateway, reqwest::Client::new());
    ActionDispatcher::new(Arc::new(registry), Duration::from_secs(5))
}

#[tokio::test]
async fn test_builtin_handlers_run_in_order_through_gateway() {
    let gateway = Arc::new(RecordingGateway::new());
    let order = OrderFixture::default();

    let actions = vec![
        Action::new(SEND_ALERT, json!({ "message": "Order {{id}} held", "severity": "warning" })).with_order(1),
        Action::new(BLOCK_ORDER, json!({})),
    ];
    let outcomes = dispatcher(gateway.clone()).execute_actions(&actions, &order.payload()).await;

    assert!(outcomes.iter().all(|o| o.status == ActionStatus::Success));
    assert_eq!(
        gateway.calls().await,
        vec![
            GatewayCall::BlockOrder { order_id: order.id.clone(), reason: "Blocked by automation".into() },
            GatewayCall::Notify(Alert {
                channel: "ops".into(),
                severity: AlertSeverity::Warning,
                message: format!("Order {} held", order.id),
            }),
        ]
    );
}

#[tokio::test]
async fn test_handler_validation_failure_does_not_stop_batch() {
    let gateway = Arc::new(RecordingGateway::new());
    let product = ProductFixture::with_stock(2);

    let actions = vec![
        Action::new(REORDER_STOCK, json!({ "threshold": 5 })),
        Action::new(REORDER_STOCK, json!({ "threshold": 5, "quantity": 10 })),
    ];
    let outcomes = dispatcher(gateway.clone()).execute_actions(&actions, &product.payload()).await;

    assert_eq!(outcomes[0].status, ActionStatus::Failed);
    assert_eq!(outcomes[0].error.as_deref(), Some("Missing or invalid quantity"));
    assert_eq!(outcomes[1].status, ActionStatus::Success);
    assert_eq!(gateway.calls().await.len(), 1);
}
