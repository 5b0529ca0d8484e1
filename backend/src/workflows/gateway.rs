// Collaborators that built-in handlers act through.
//
// Order/user/product mutations and alert delivery live outside the engine;
// handlers only decide *what* to ask for.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Mutations on domain entities (orders, users, products).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityGateway: Send + Sync {
    async fn block_order(&self, order_id: &str, reason: &str) -> GatewayResult<()>;
    async fn reorder_stock(&self, product_id: &str, quantity: i64) -> GatewayResult<()>;
    async fn assign_segment(&self, user_id: &str, segment: &str) -> GatewayResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub channel: String,
    pub severity: AlertSeverity,
    pub message: String,
}

/// Delivers alerts to operators.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> GatewayResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    BlockOrder { order_id: String, reason: String },
    ReorderStock { product_id: String, quantity: i64 },
    AssignSegment { user_id: String, segment: String },
    Notify(Alert),
}

/// Logs every request and keeps it in memory.
///
/// Used when no downstream services are wired in, and by tests.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: GatewayCall) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl EntityGateway for RecordingGateway {
    async fn block_order(&self, order_id: &str, reason: &str) -> GatewayResult<()> {
        info!("Blocking order {}: {}", order_id, reason);
        self.record(GatewayCall::BlockOrder {
            order_id: order_id.to_string(),
            reason: reason.to_string(),
        })
        .await;
        Ok(())
    }

    async fn reorder_stock(&self, product_id: &str, quantity: i64) -> GatewayResult<()> {
        info!("Reordering {} units of product {}", quantity, product_id);
        self.record(GatewayCall::ReorderStock {
            product_id: product_id.to_string(),
            quantity,
        })
        .await;
        Ok(())
    }

    async fn assign_segment(&self, user_id: &str, segment: &str) -> GatewayResult<()> {
        info!("Assigning user {} to segment {}", user_id, segment);
        self.record(GatewayCall::AssignSegment {
            user_id: user_id.to_string(),
            segment: segment.to_string(),
        })
        .await;
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingGateway {
    async fn notify(&self, alert: &Alert) -> GatewayResult<()> {
        match alert.severity {
            AlertSeverity::Critical | AlertSeverity::Warning => {
                warn!("[{}] {:?}: {}", alert.channel, alert.severity, alert.message)
            }
            AlertSeverity::Info => info!("[{}] {}", alert.channel, alert.message),
        }
        self.record(GatewayCall::Notify(alert.clone())).await;
        Ok(())
    }
}
