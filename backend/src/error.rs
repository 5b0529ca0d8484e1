//! Standardized error handling for the ruleflow API
//!
//! Every HTTP error is rendered as the same JSON envelope; library errors
//! (`EngineError`, `StoreError`) convert into [`AppError`] at the handler edge.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::workflows::{EngineError, StoreError};

/// Standard API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code (e.g., "VALIDATION_ERROR", "NOT_FOUND")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional field-level errors for validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: HashMap<String, Vec<String>>) -> Self {
        self.details = Some(details);
        self
    }

    /// Create a 404 Not Found error
    pub fn not_found(message: impl Into<String>) -> AppError {
        AppError::NotFound(message.into())
    }
}

/// Application error type that can be converted to HTTP responses
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    ValidationError { details: HashMap<String, Vec<String>> },
    InternalError(String),
    DatabaseError(String),
    ServiceUnavailable(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InternalError(_) | Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Message safe to show to API clients. Server-side causes are logged
    /// rather than returned.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(resource) => format!("{} not found", resource),
            Self::ValidationError { .. } => "Validation failed".to_string(),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                "A database error occurred".to_string()
            }
            Self::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                "A backing service is unavailable".to_string()
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError { details } => {
                let mut fields: Vec<String> = details
                    .iter()
                    .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                    .collect();
                fields.sort();
                write!(f, "{}: {}", self.error_code(), fields.join("; "))
            }
            Self::NotFound(msg)
            | Self::InternalError(msg)
            | Self::DatabaseError(msg)
            | Self::ServiceUnavailable(msg) => write!(f, "{}: {}", self.error_code(), msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut error = ApiError::new(self.error_code(), self.message());

        // Add details for validation errors
        if let Self::ValidationError { details } = self {
            error = error.with_details(details);
        }

        (status, Json(error)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("Resource".to_string()),
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => e.into(),
            StoreError::Unavailable(msg) => Self::ServiceUnavailable(msg),
            other => Self::InternalError(other.to_string()),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::DefinitionNotFound(id) => Self::NotFound(format!("Definition {}", id)),
            EngineError::Store(e) => e.into(),
        }
    }
}

/// Result type alias for handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper to add multiple validation errors
pub struct ValidationBuilder {
    details: HashMap<String, Vec<String>>,
}

impl ValidationBuilder {
    pub fn new() -> Self {
        Self {
            details: HashMap::new(),
        }
    }

    pub fn error(mut self, field: &str, message: &str) -> Self {
        self.push(field, message);
        self
    }

    /// Same as [`error`](Self::error) for use inside loops.
    pub fn push(&mut self, field: &str, message: &str) {
        self.details
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn build(self) -> Option<AppError> {
        if self.details.is_empty() {
            None
        } else {
            Some(AppError::ValidationError {
                details: self.details,
            })
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.details.is_empty()
    }
}

impl Default for ValidationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
