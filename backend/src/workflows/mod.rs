// Workflow Automation Engine
//
// Condition-action definitions selected by trigger key, evaluated in priority
// order, with actions dispatched through a registry of handlers.

pub mod actions;
pub mod conditions;
pub mod engine;
pub mod executor;
pub mod gateway;
pub mod handlers;
pub mod store;
pub mod triggers;

pub use actions::{Action, ActionError, ActionHandler, ActionRegistry, ActionResult};
pub use conditions::{Condition, ConditionOperator, LogicalOperator, eval_list};
pub use engine::{EngineConfig, EngineError, EvaluationOutcome, WorkflowEngine};
pub use executor::ActionDispatcher;
pub use gateway::{EntityGateway, Notifier, RecordingGateway};
pub use handlers::builtin_registry;
pub use store::{AuditSink, DefinitionStore, StoreError};
pub use triggers::{EventSource, TriggerEvent};
