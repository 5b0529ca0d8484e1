use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::workflows::EngineConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    /// Postgres store and audit sink when set, in-memory otherwise
    pub database_url: Option<String>,
    /// JSON file of definitions loaded into the in-memory store
    pub definitions_path: Option<PathBuf>,
    pub action_timeout: Duration,
    pub audit_skipped_attempts: bool,
    pub scheduled_triggers: Vec<ScheduledTrigger>,
}

/// One `trigger_key@cron` entry of `SCHEDULED_TRIGGERS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTrigger {
    pub trigger_key: String,
    pub schedule: String,
}

impl ScheduledTrigger {
    pub fn parse_list(raw: &str) -> anyhow::Result<Vec<Self>> {
        raw.split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let Some((key, schedule)) = entry.split_once('@') else {
                    bail!("scheduled trigger '{}' must look like key@cron", entry);
                };
                let (key, schedule) = (key.trim(), schedule.trim());
                if key.is_empty() || schedule.is_empty() {
                    bail!("scheduled trigger '{}' has an empty key or schedule", entry);
                }
                Ok(Self {
                    trigger_key: key.to_string(),
                    schedule: schedule.to_string(),
                })
            })
            .collect()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let scheduled_triggers = match env::var("SCHEDULED_TRIGGERS") {
            Ok(raw) => ScheduledTrigger::parse_list(&raw).context("invalid SCHEDULED_TRIGGERS")?,
            Err(_) => Vec::new(),
        };

        Ok(Config {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            definitions_path: env::var("DEFINITIONS_PATH").ok().map(PathBuf::from),
            action_timeout: Duration::from_millis(
                env::var("ACTION_TIMEOUT_MS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()
                    .unwrap_or(10_000),
            ),
            audit_skipped_attempts: env::var("AUDIT_SKIPPED_ATTEMPTS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            scheduled_triggers,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            action_timeout: self.action_timeout,
            audit_skipped: self.audit_skipped_attempts,
        }
    }
}
