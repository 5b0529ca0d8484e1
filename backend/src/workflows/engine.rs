// Workflow Engine - Selects eligible definitions for a trigger and runs them

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use ruleflow_shared::{
    ActionOutcome, Definition, ExecutionRecord, ExecutionStatus, ExecutionSummary,
};

use super::actions::ActionRegistry;
use super::conditions::eval_list_traced;
use super::executor::{ActionDispatcher, panic_message};
use super::store::{AuditSink, DefinitionStore, StoreError};
use super::triggers::{EventSource, TriggerEvent};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Definition {0} not found")]
    DefinitionNotFound(Uuid),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound applied to actions without their own `timeoutMs`.
    pub action_timeout: Duration,
    /// Append a `skipped` record when conditions do not match.
    pub audit_skipped: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_secs(10),
            audit_skipped: false,
        }
    }
}

/// Full result of one (definition, trigger) attempt.
///
/// Trigger invocations reduce this to an [`ExecutionSummary`]; the manual
/// test-run path returns it whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutcome {
    pub definition_id: Uuid,
    pub definition_name: String,
    pub status: ExecutionStatus,
    pub action_results: Vec<ActionOutcome>,
    pub log: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stats or audit writes that failed after the actions had run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub write_errors: Vec<String>,
    pub executed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl EvaluationOutcome {
    fn new(definition: &Definition, status: ExecutionStatus, log: Vec<String>) -> Self {
        Self {
            definition_id: definition.id,
            definition_name: definition.name.clone(),
            status,
            action_results: Vec::new(),
            log,
            error: None,
            write_errors: Vec::new(),
            executed_at: Utc::now(),
            duration_ms: 0,
        }
    }

    pub fn summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            definition_id: self.definition_id,
            definition_name: self.definition_name.clone(),
            status: self.status,
            duration_ms: self.duration_ms,
        }
    }

    fn to_record(&self, event: &TriggerEvent) -> ExecutionRecord {
        ExecutionRecord {
            id: Uuid::new_v4(),
            definition_id: self.definition_id,
            definition_name: self.definition_name.clone(),
            trigger_key: event.trigger_key.clone(),
            triggered_by: event.reference(),
            status: self.status,
            action_results: self.action_results.clone(),
            log: self.log.clone(),
            error: self.error.clone(),
            executed_at: self.executed_at,
            duration_ms: self.duration_ms,
        }
    }
}

pub struct WorkflowEngine {
    store: Arc<dyn DefinitionStore>,
    audit: Arc<dyn AuditSink>,
    dispatcher: ActionDispatcher,
    config: EngineConfig,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn DefinitionStore>,
        audit: Arc<dyn AuditSink>,
        registry: Arc<ActionRegistry>,
        config: EngineConfig,
    ) -> Self {
        let dispatcher = ActionDispatcher::new(registry, config.action_timeout);
        Self {
            store,
            audit,
            dispatcher,
            config,
        }
    }

    pub fn registry(&self) -> &ActionRegistry {
        self.dispatcher.registry()
    }

    pub fn store(&self) -> &Arc<dyn DefinitionStore> {
        &self.store
    }

    /// Run every eligible definition for `trigger_key` against `payload`.
    pub async fn evaluate_for_trigger(
        &self,
        trigger_key: &str,
        payload: Value,
    ) -> Result<Vec<ExecutionSummary>, EngineError> {
        self.process_event(&TriggerEvent::new(trigger_key, payload, EventSource::Api))
            .await
    }

    /// Process a trigger event and execute matching definitions.
    ///
    /// Definitions run one after another, highest priority first (newest
    /// first on ties). Every condition-passing definition runs; there is no
    /// first-match stop. Only the initial fetch can fail the invocation.
    pub async fn process_event(&self, event: &TriggerEvent) -> Result<Vec<ExecutionSummary>, EngineError> {
        info!("Processing trigger '{}' ({})", event.trigger_key, event.event_id);

        let fetched = self.store.list_eligible(&event.trigger_key).await.map_err(|e| {
            error!("Failed to fetch definitions for '{}': {}", event.trigger_key, e);
            e
        })?;

        let now = Utc::now();
        let mut eligible: Vec<Definition> = fetched
            .into_iter()
            .filter(|d| d.enabled && d.is_valid_at(now))
            .collect();
        eligible.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        debug!("{} eligible definitions for '{}'", eligible.len(), event.trigger_key);

        let mut summaries = Vec::with_capacity(eligible.len());
        for definition in &eligible {
            let start = Instant::now();
            let outcome = match AssertUnwindSafe(self.evaluate_one(definition, event))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let message = format!("evaluation panicked: {}", panic_message(panic.as_ref()));
                    error!("Definition '{}' ({}): {}", definition.name, definition.id, message);
                    self.record_failure(definition, event, message, start.elapsed()).await
                }
            };
            summaries.push(outcome.summary());
        }

        info!(
            "Trigger '{}' finished: {} definitions attempted",
            event.trigger_key,
            summaries.len()
        );
        Ok(summaries)
    }

    /// Manual test run of one definition; shares `evaluate_one` with
    /// trigger invocations.
    pub async fn evaluate_single(
        &self,
        definition_id: Uuid,
        payload: Value,
    ) -> Result<EvaluationOutcome, EngineError> {
        let definition = self
            .store
            .get(definition_id)
            .await?
            .ok_or(EngineError::DefinitionNotFound(definition_id))?;

        let event = TriggerEvent::manual(&definition.trigger_key, payload);
        Ok(self.evaluate_one(&definition, &event).await)
    }

    /// Evaluate conditions, dispatch actions, then record stats and audit.
    ///
    /// Write failures are logged and reported in `write_errors`; they never
    /// change the status derived from the actions.
    pub async fn evaluate_one(&self, definition: &Definition, event: &TriggerEvent) -> EvaluationOutcome {
        let start = Instant::now();

        let mut log = vec![format!(
            "evaluating '{}' (priority {}) for trigger '{}'",
            definition.name, definition.priority, event.trigger_key
        )];
        let (matched, trace) = eval_list_traced(&definition.conditions, &event.payload);
        log.extend(trace);

        if !matched {
            log.push("conditions not met, skipped".to_string());
            debug!("Definition '{}' skipped", definition.name);

            let mut outcome = EvaluationOutcome::new(definition, ExecutionStatus::Skipped, log);
            outcome.duration_ms = start.elapsed().as_millis() as i64;
            if self.config.audit_skipped {
                self.append_record(&mut outcome, event).await;
            }
            return outcome;
        }

        log.push(format!(
            "conditions met, dispatching {} action(s)",
            definition.actions.len()
        ));
        let action_results = self
            .dispatcher
            .execute_actions(&definition.actions, &event.payload)
            .await;

        for result in &action_results {
            match &result.error {
                Some(e) => log.push(format!("action {} failed: {}", result.action_type, e)),
                None => log.push(format!("action {} succeeded", result.action_type)),
            }
        }

        let status = ExecutionStatus::from_outcomes(&action_results);
        let failed = action_results.iter().filter(|r| !r.succeeded()).count();
        log.push(format!("status {}", status.as_str()));

        let mut outcome = EvaluationOutcome::new(definition, status, log);
        if failed > 0 {
            outcome.error = Some(format!("{} of {} actions failed", failed, action_results.len()));
        }
        outcome.action_results = action_results;
        outcome.duration_ms = start.elapsed().as_millis() as i64;

        info!(
            "Definition '{}' finished with status {} in {}ms",
            definition.name,
            status.as_str(),
            outcome.duration_ms
        );

        if let Err(e) = self.store.increment_stats(definition.id, outcome.executed_at).await {
            warn!("Failed to update stats for '{}': {}", definition.name, e);
            outcome.write_errors.push(format!("stats update failed: {}", e));
        }
        self.append_record(&mut outcome, event).await;

        outcome
    }

    async fn record_failure(
        &self,
        definition: &Definition,
        event: &TriggerEvent,
        message: String,
        elapsed: Duration,
    ) -> EvaluationOutcome {
        let mut outcome = EvaluationOutcome::new(definition, ExecutionStatus::Failed, vec![message.clone()]);
        outcome.error = Some(message);
        outcome.duration_ms = elapsed.as_millis() as i64;
        self.append_record(&mut outcome, event).await;
        outcome
    }

    async fn append_record(&self, outcome: &mut EvaluationOutcome, event: &TriggerEvent) {
        let record = outcome.to_record(event);
        if let Err(e) = self.audit.append(&record).await {
            warn!("Failed to write audit record for '{}': {}", outcome.definition_name, e);
            outcome.write_errors.push(format!("audit write failed: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::actions::{ActionError, ActionResult};
    use crate::workflows::handlers::APPLY_DISCOUNT;
    use crate::workflows::handlers::pricing::DiscountHandler;
    use crate::workflows::store::{InMemoryAuditSink, InMemoryDefinitionStore, StoreResult};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use ruleflow_shared::{Action, ActionStatus, Condition};
    use serde_json::json;

    struct Harness {
        engine: WorkflowEngine,
        store: Arc<InMemoryDefinitionStore>,
        audit: Arc<InMemoryAuditSink>,
    }

    fn registry() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        registry
            .register(APPLY_DISCOUNT, DiscountHandler)
            .register_fn("noop", |_, _| Ok(ActionResult::success(None)))
            .register_fn("slow", |_, _| {
                std::thread::sleep(Duration::from_millis(25));
                Ok(ActionResult::success(None))
            })
            .register_fn("broken", |_, _| Err(ActionError::Other("downstream refused".to_string())));
        registry
    }

    fn harness(definitions: Vec<Definition>, config: EngineConfig) -> Harness {
        let store = Arc::new(InMemoryDefinitionStore::with_definitions(definitions));
        let audit = Arc::new(InMemoryAuditSink::new());
        let engine = WorkflowEngine::new(store.clone(), audit.clone(), Arc::new(registry()), config);
        Harness { engine, store, audit }
    }

    fn big_order_discount() -> Definition {
        Definition::new("Big order discount", "pricing")
            .with_priority(10)
            .with_condition(Condition::gt("total", json!(100)))
            .with_action(Action::new(APPLY_DISCOUNT, json!({ "discountPercent": 10 })))
    }

    #[tokio::test]
    async fn test_matching_definition_applies_discount() {
        let definition = big_order_discount();
        let id = definition.id;
        let h = harness(vec![definition], EngineConfig::default());

        let summaries = h.engine.evaluate_for_trigger("pricing", json!({ "total": 150 })).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].status, ExecutionStatus::Success);

        let records = h.audit.records().await;
        assert_eq!(records.len(), 1);
        let output = records[0].action_results[0].output.clone().unwrap();
        assert_eq!(output["originalPrice"].as_f64(), Some(150.0));
        assert_eq!(output["discountedPrice"].as_f64(), Some(135.0));
        assert_eq!(output["discountAmount"].as_f64(), Some(15.0));

        let stored = h.store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.execution_count, 1);
        assert!(stored.last_executed_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_conditions_skip_without_side_effects() {
        let definition = big_order_discount();
        let id = definition.id;
        let h = harness(vec![definition], EngineConfig::default());

        let summaries = h.engine.evaluate_for_trigger("pricing", json!({ "total": 50 })).await.unwrap();
        assert_eq!(summaries[0].status, ExecutionStatus::Skipped);
        assert!(h.audit.records().await.is_empty());

        let stored = h.store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.execution_count, 0);
        assert!(stored.last_executed_at.is_none());
    }

    #[tokio::test]
    async fn test_skipped_attempts_audited_when_enabled() {
        let definition = big_order_discount();
        let id = definition.id;
        let config = EngineConfig {
            audit_skipped: true,
            ..EngineConfig::default()
        };
        let h = harness(vec![definition], config);

        h.engine.evaluate_for_trigger("pricing", json!({ "total": 50 })).await.unwrap();

        let records = h.audit.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ExecutionStatus::Skipped);
        assert!(records[0].action_results.is_empty());
        assert_eq!(h.store.get(id).await.unwrap().unwrap().execution_count, 0);
    }

    #[tokio::test]
    async fn test_priority_order_and_failure_does_not_block_batch() {
        let high = Definition::new("high", "order_created")
            .with_priority(10)
            .with_action(Action::new("broken", json!({})));
        let low = Definition::new("low", "order_created")
            .with_priority(5)
            .with_action(Action::new("noop", json!({})));
        let h = harness(vec![low, high], EngineConfig::default());

        let summaries = h.engine.evaluate_for_trigger("order_created", json!({})).await.unwrap();
        let names: Vec<&str> = summaries.iter().map(|s| s.definition_name.as_str()).collect();
        assert_eq!(names, vec!["high", "low"]);
        assert_eq!(summaries[0].status, ExecutionStatus::Failed);
        assert_eq!(summaries[1].status, ExecutionStatus::Success);

        let records = h.audit.records().await;
        assert_eq!(records[0].definition_name, "high");
        assert_eq!(records[0].error.as_deref(), Some("1 of 1 actions failed"));
    }

    #[tokio::test]
    async fn test_equal_priority_runs_newest_first() {
        let mut older = Definition::new("older", "tick");
        older.created_at = Utc::now() - ChronoDuration::days(1);
        let newer = Definition::new("newer", "tick");
        let h = harness(vec![older, newer], EngineConfig::default());

        let summaries = h.engine.evaluate_for_trigger("tick", json!({})).await.unwrap();
        assert_eq!(summaries[0].definition_name, "newer");
        assert_eq!(summaries[1].definition_name, "older");
    }

    #[tokio::test]
    async fn test_every_matching_definition_runs() {
        let first = big_order_discount();
        let second = big_order_discount().with_priority(1);
        let h = harness(vec![first, second], EngineConfig::default());

        let summaries = h.engine.evaluate_for_trigger("pricing", json!({ "total": 200 })).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.status == ExecutionStatus::Success));
    }

    #[tokio::test]
    async fn test_partial_status() {
        let definition = Definition::new("mixed", "tick")
            .with_action(Action::new("noop", json!({})))
            .with_action(Action::new("broken", json!({})));
        let h = harness(vec![definition], EngineConfig::default());

        let summaries = h.engine.evaluate_for_trigger("tick", json!({})).await.unwrap();
        assert_eq!(summaries[0].status, ExecutionStatus::Partial);
    }

    #[tokio::test]
    async fn test_expired_definition_excluded() {
        let now = Utc::now();
        let expired = big_order_discount()
            .with_priority(100)
            .with_validity(None, Some(now - ChronoDuration::hours(1)));
        let not_started = big_order_discount().with_validity(Some(now + ChronoDuration::hours(1)), None);
        let h = harness(vec![expired, not_started], EngineConfig::default());

        let summaries = h.engine.evaluate_for_trigger("pricing", json!({ "total": 500 })).await.unwrap();
        assert!(summaries.is_empty());
        assert!(h.audit.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_manual_run_returns_trace() {
        let definition = big_order_discount();
        let id = definition.id;
        let h = harness(vec![definition], EngineConfig::default());

        let outcome = h.engine.evaluate_single(id, json!({ "total": 150 })).await.unwrap();
        assert_eq!(outcome.status, ExecutionStatus::Success);
        assert_eq!(outcome.action_results[0].status, ActionStatus::Success);
        assert!(outcome.log.iter().any(|line| line.contains("total gt 100")));
        assert!(outcome.log.iter().any(|line| line == "status success"));

        let records = h.audit.records().await;
        assert!(records[0].triggered_by.starts_with("manual/"));
    }

    #[tokio::test]
    async fn test_manual_run_unknown_definition() {
        let h = harness(vec![], EngineConfig::default());
        let missing = Uuid::new_v4();

        let err = h.engine.evaluate_single(missing, json!({})).await.unwrap_err();
        assert!(matches!(err, EngineError::DefinitionNotFound(id) if id == missing));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_invocations_count_every_execution() {
        let definition = Definition::new("counter", "tick").with_action(Action::new("noop", json!({})));
        let id = definition.id;
        let h = harness(vec![definition], EngineConfig::default());
        let engine = Arc::new(h.engine);

        let tasks: Vec<_> = (0..25)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.evaluate_for_trigger("tick", json!({})).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(h.store.get(id).await.unwrap().unwrap().execution_count, 25);
        assert_eq!(h.audit.records().await.len(), 25);
    }

    struct BrokenStore;

    #[async_trait]
    impl DefinitionStore for BrokenStore {
        async fn list_eligible(&self, _trigger_key: &str) -> StoreResult<Vec<Definition>> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn get(&self, _id: Uuid) -> StoreResult<Option<Definition>> {
            Ok(None)
        }

        async fn increment_stats(&self, _id: Uuid, _executed_at: DateTime<Utc>) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal() {
        let engine = WorkflowEngine::new(
            Arc::new(BrokenStore),
            Arc::new(InMemoryAuditSink::new()),
            Arc::new(registry()),
            EngineConfig::default(),
        );

        let err = engine.evaluate_for_trigger("tick", json!({})).await.unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));
    }

    /// Serves definitions but fails or panics on the stats write.
    struct FlakyStatsStore {
        inner: InMemoryDefinitionStore,
        panic_for: Option<Uuid>,
    }

    #[async_trait]
    impl DefinitionStore for FlakyStatsStore {
        async fn list_eligible(&self, trigger_key: &str) -> StoreResult<Vec<Definition>> {
            self.inner.list_eligible(trigger_key).await
        }

        async fn get(&self, id: Uuid) -> StoreResult<Option<Definition>> {
            self.inner.get(id).await
        }

        async fn increment_stats(&self, id: Uuid, _executed_at: DateTime<Utc>) -> StoreResult<()> {
            if self.panic_for == Some(id) {
                panic!("stats table corrupted");
            }
            Err(StoreError::Unavailable("read-only replica".to_string()))
        }
    }

    #[tokio::test]
    async fn test_write_failures_do_not_hide_action_outcome() {
        let definition = Definition::new("noop", "tick").with_action(Action::new("noop", json!({})));
        let id = definition.id;
        let audit = Arc::new(InMemoryAuditSink::new());
        let engine = WorkflowEngine::new(
            Arc::new(FlakyStatsStore {
                inner: InMemoryDefinitionStore::with_definitions([definition]),
                panic_for: None,
            }),
            audit.clone(),
            Arc::new(registry()),
            EngineConfig::default(),
        );

        let outcome = engine.evaluate_single(id, json!({})).await.unwrap();
        assert_eq!(outcome.status, ExecutionStatus::Success);
        assert_eq!(outcome.write_errors.len(), 1);
        assert!(outcome.write_errors[0].contains("read-only replica"));
        assert_eq!(audit.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_definition_recorded_failed_and_batch_continues() {
        let doomed = Definition::new("doomed", "tick")
            .with_priority(10)
            .with_action(Action::new("slow", json!({})));
        let healthy = Definition::new("healthy", "tick").with_action(Action::new("noop", json!({})));
        let audit = Arc::new(InMemoryAuditSink::new());
        let engine = WorkflowEngine::new(
            Arc::new(FlakyStatsStore {
                panic_for: Some(doomed.id),
                inner: InMemoryDefinitionStore::with_definitions([doomed, healthy]),
            }),
            audit.clone(),
            Arc::new(registry()),
            EngineConfig::default(),
        );

        let summaries = engine.evaluate_for_trigger("tick", json!({})).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].definition_name, "doomed");
        assert_eq!(summaries[0].status, ExecutionStatus::Failed);
        assert_eq!(summaries[1].status, ExecutionStatus::Success);

        let records = audit.records().await;
        assert_eq!(records[0].status, ExecutionStatus::Failed);
        assert!(records[0].error.as_deref().unwrap().contains("stats table corrupted"));
        assert!(records[0].duration_ms >= 25);
        assert!(summaries[0].duration_ms >= 25);
    }
}
