//! Condition-action automation engine.
//!
//! Definitions (rules and workflows) are selected by trigger key, their
//! conditions folded left to right over the trigger payload, and their
//! actions dispatched through a registry of handlers. Every matched attempt
//! updates definition stats and appends an execution record.

use std::sync::Arc;

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod validation;
pub mod workflows;

pub use error::{ApiError, ApiResult, AppError};
pub use validation::Validator;

#[cfg(test)]
mod tests;

pub struct AppState {
    pub engine: Arc<workflows::WorkflowEngine>,
    /// Present when running against Postgres
    pub db_pool: Option<sqlx::PgPool>,
}
