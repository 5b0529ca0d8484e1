use serde_json::json;

use crate::tests::TestContext;
use crate::tests::fixtures::*;
use crate::workflows::gateway::GatewayCall;
use crate::workflows::store::DefinitionStore;
use crate::workflows::triggers::{EventSource, TriggerEvent};
use ruleflow_shared::ExecutionStatus;

#[tokio::test]
async fn test_order_flow_runs_every_matching_definition() {
    let ctx = TestContext::new(vec![
        big_order_discount(),
        vip_discount(),
        fraud_block("mailinator.com"),
    ]);
    let order = OrderFixture::default().with_total(200.0).vip().with_email("ok@example.com");

    let summaries = ctx
        .engine
        .process_event(&TriggerEvent::order_created(order.payload(), EventSource::Api))
        .await
        .unwrap();

    let statuses: Vec<(&str, ExecutionStatus)> = summaries
        .iter()
        .map(|s| (s.definition_name.as_str(), s.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("Flagged domain", ExecutionStatus::Skipped),
            ("Big order discount", ExecutionStatus::Success),
            ("VIP discount", ExecutionStatus::Success),
        ]
    );

    // Each definition sees the original total
    let records = ctx.audit.records().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].action_results[0].output.as_ref().unwrap()["originalPrice"], json!(200.0));
    assert_eq!(records[1].action_results[0].output.as_ref().unwrap()["originalPrice"], json!(200.0));
    assert_eq!(records[1].triggered_by, format!("api/{}", order.id));
}

#[tokio::test]
async fn test_fraud_definition_blocks_then_alerts() {
    let definition = fraud_block("mailinator.com");
    let id = definition.id;
    let ctx = TestContext::new(vec![definition]);
    let order = OrderFixture::default().with_email("x@MAILINATOR.com");

    let outcome = ctx.engine.evaluate_single(id, order.payload()).await.unwrap();
    assert_eq!(outcome.status, ExecutionStatus::Success);

    let calls = ctx.gateway.calls().await;
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0], GatewayCall::BlockOrder { order_id, .. } if *order_id == order.id));
    assert!(matches!(&calls[1], GatewayCall::Notify(alert) if alert.message == format!("Order {} blocked", order.id)));
}

#[tokio::test]
async fn test_stock_flow_updates_stats() {
    let definition = low_stock_reorder();
    let id = definition.id;
    let ctx = TestContext::new(vec![definition]);

    let low = ProductFixture::with_stock(3);
    let high = ProductFixture::with_stock(40);
    for product in [&low, &high, &low] {
        ctx.engine
            .process_event(&TriggerEvent::product_stock_changed(&product.id, product.stock))
            .await
            .unwrap();
    }

    let stored = ctx.store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.execution_count, 2);
    assert_eq!(ctx.audit.for_definition(id).await.len(), 2);
    assert_eq!(ctx.gateway.calls().await.len(), 2);
}

#[tokio::test]
async fn test_skipped_attempts_audited_when_configured() {
    let config = crate::workflows::EngineConfig {
        audit_skipped: true,
        ..Default::default()
    };
    let ctx = TestContext::with_config(vec![big_order_discount()], config);

    ctx.engine
        .process_event(&TriggerEvent::order_created(
            OrderFixture::default().with_total(20.0).payload(),
            EventSource::Api,
        ))
        .await
        .unwrap();

    let records = ctx.audit.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ExecutionStatus::Skipped);
    assert!(records[0].log.iter().any(|line| line == "conditions not met, skipped"));
}
