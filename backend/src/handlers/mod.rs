use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;
use std::sync::Arc;

use crate::AppState;
use crate::database;

pub mod automation;

pub use automation::automation_routes;

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let database = match &state.db_pool {
        Some(pool) if database::health_check(pool).await => "ok",
        Some(_) => "unavailable",
        None => "not_configured",
    };
    let status = if database == "unavailable" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "healthy" } else { "degraded" },
            "service": "ruleflow",
            "database": database,
            "actionTypes": state.engine.registry().action_types(),
        })),
    )
}
