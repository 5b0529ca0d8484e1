use axum::Router;
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::AppState;
use crate::handlers::{automation_routes, health_check};
use crate::tests::TestContext;
use crate::tests::fixtures::*;
use crate::tests::helpers::{body_json, get, post_json};

fn app(ctx: &TestContext) -> Router {
    let state = Arc::new(AppState {
        engine: ctx.engine.clone(),
        db_pool: None,
    });
    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api/v1", automation_routes())
        .with_state(state)
}

#[tokio::test]
async fn test_health_reports_registered_actions() {
    let ctx = TestContext::new(vec![]);
    let response = app(&ctx).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["database"], "not_configured");
    assert!(body["actionTypes"].as_array().unwrap().contains(&json!("call_webhook")));
}

#[tokio::test]
async fn test_trigger_then_fetch_definition_stats() {
    let definition = big_order_discount();
    let id = definition.id;
    let ctx = TestContext::new(vec![definition]);
    let order = OrderFixture::default().with_total(150.0);

    let response = app(&ctx)
        .oneshot(post_json("/api/v1/triggers/order_created", &order.payload()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await[0]["status"], "success");

    let response = app(&ctx)
        .oneshot(get(&format!("/api/v1/definitions/{}", id)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["executionCount"], 1);
    assert!(body["lastExecutedAt"].is_string());
}

#[tokio::test]
async fn test_manual_run_of_unknown_definition_is_404() {
    let ctx = TestContext::new(vec![]);
    let response = app(&ctx)
        .oneshot(post_json(&format!("/api/v1/definitions/{}/test", uuid::Uuid::new_v4()), &json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
