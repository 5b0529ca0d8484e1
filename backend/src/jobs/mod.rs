// Background Jobs
//
// Cron-driven trigger source: each configured schedule fires a trigger key
// into the workflow engine. Jobs run on tokio-cron-scheduler.

pub mod scheduler;

pub use scheduler::{JobError, JobResult, TickLog, TickStatus, TriggerScheduler};
