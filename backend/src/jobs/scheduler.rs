// Trigger Scheduler - Fires scheduled trigger keys into the workflow engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler as TokioScheduler, JobSchedulerError};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::ScheduledTrigger;
use crate::workflows::{TriggerEvent, WorkflowEngine};

const MAX_TICK_LOGS: usize = 100;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Scheduler error: {0}")]
    SchedulerError(#[from] JobSchedulerError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickLog {
    pub id: Uuid,
    pub trigger_key: String,
    pub started_at: DateTime<Utc>,
    pub status: TickStatus,
    pub definitions_attempted: usize,
    pub error: Option<String>,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TickStatus {
    Completed,
    Failed,
}

pub struct TriggerScheduler {
    scheduler: TokioScheduler,
    engine: Arc<WorkflowEngine>,
    tick_logs: Arc<RwLock<Vec<TickLog>>>,
}

impl TriggerScheduler {
    pub async fn new(engine: Arc<WorkflowEngine>) -> JobResult<Self> {
        let scheduler = TokioScheduler::new().await?;

        Ok(Self {
            scheduler,
            engine,
            tick_logs: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Register every entry and start the scheduler.
    pub async fn start(&self, triggers: &[ScheduledTrigger]) -> JobResult<()> {
        info!("Starting trigger scheduler with {} schedules", triggers.len());

        for trigger in triggers {
            self.schedule(trigger).await?;
        }
        self.scheduler.start().await?;

        info!("Trigger scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> JobResult<()> {
        info!("Shutting down trigger scheduler");
        self.scheduler.shutdown().await?;
        Ok(())
    }

    pub async fn schedule(&self, trigger: &ScheduledTrigger) -> JobResult<Uuid> {
        if trigger.trigger_key.trim().is_empty() {
            return Err(JobError::ConfigError("scheduled trigger key is empty".to_string()));
        }

        let engine = self.engine.clone();
        let logs = self.tick_logs.clone();
        let trigger_key = trigger.trigger_key.clone();

        let job = Job::new_async(trigger.schedule.as_str(), move |_uuid, _lock| {
            let engine = engine.clone();
            let logs = logs.clone();
            let trigger_key = trigger_key.clone();

            Box::pin(async move {
                run_tick(&engine, &trigger_key, &logs).await;
            })
        })?;

        let id = self.scheduler.add(job).await?;
        info!("Scheduled trigger '{}' with '{}'", trigger.trigger_key, trigger.schedule);

        Ok(id)
    }

    pub async fn tick_logs(&self) -> Vec<TickLog> {
        self.tick_logs.read().await.clone()
    }
}

/// One scheduled invocation. Failures are logged and recorded, never raised,
/// so a bad tick cannot stop the scheduler.
async fn run_tick(engine: &WorkflowEngine, trigger_key: &str, logs: &RwLock<Vec<TickLog>>) {
    let started_at = Utc::now();
    info!("Running scheduled trigger '{}'", trigger_key);

    let event = TriggerEvent::scheduled(trigger_key);
    let (status, definitions_attempted, error) = match engine.process_event(&event).await {
        Ok(summaries) => {
            info!("Scheduled trigger '{}' ran {} definitions", trigger_key, summaries.len());
            (TickStatus::Completed, summaries.len(), None)
        }
        Err(e) => {
            error!("Scheduled trigger '{}' failed: {}", trigger_key, e);
            (TickStatus::Failed, 0, Some(e.to_string()))
        }
    };

    let mut logs = logs.write().await;
    logs.push(TickLog {
        id: Uuid::new_v4(),
        trigger_key: trigger_key.to_string(),
        started_at,
        status,
        definitions_attempted,
        error,
        duration_ms: (Utc::now() - started_at).num_milliseconds(),
    });
    if logs.len() > MAX_TICK_LOGS {
        logs.remove(0);
    }
}
