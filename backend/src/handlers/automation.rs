use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::validation::validate_definition;
use crate::workflows::{EvaluationOutcome, EventSource, TriggerEvent};
use ruleflow_shared::{Definition, ExecutionSummary};

pub fn automation_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/triggers/:trigger_key", post(fire_trigger))
        .route("/definitions/validate", post(validate))
        .route("/definitions/:id", get(get_definition))
        .route("/definitions/:id/test", post(test_definition))
}

/// Fire a trigger key with the request body as payload.
pub async fn fire_trigger(
    State(state): State<Arc<AppState>>,
    Path(trigger_key): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<Vec<ExecutionSummary>>> {
    info!("Trigger '{}' received over HTTP", trigger_key);
    let event = TriggerEvent::new(trigger_key, payload, EventSource::Api);
    let summaries = state.engine.process_event(&event).await?;
    Ok(Json(summaries))
}

pub async fn get_definition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Definition>> {
    state
        .engine
        .store()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Definition {}", id)))
}

/// Manual test run: full trace log and per-action results.
pub async fn test_definition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<EvaluationOutcome>> {
    let outcome = state.engine.evaluate_single(id, payload).await?;
    Ok(Json(outcome))
}

pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(definition): Json<Definition>,
) -> ApiResult<StatusCode> {
    validate_definition(&definition, state.engine.registry())?;
    Ok(StatusCode::NO_CONTENT)
}
