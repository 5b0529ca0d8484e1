// Common test utilities shared across integration tests
use std::sync::{Arc, Once};

use ruleflow_backend::workflows::store::{InMemoryAuditSink, InMemoryDefinitionStore};
use ruleflow_backend::workflows::{
    ActionRegistry, ActionResult, EngineConfig, WorkflowEngine,
};
use ruleflow_shared::Definition;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("debug")
            .try_init()
            .ok();
    });
}

pub struct Engine {
    pub engine: Arc<WorkflowEngine>,
    pub store: Arc<InMemoryDefinitionStore>,
    pub audit: Arc<InMemoryAuditSink>,
}

/// Engine with the given extra handlers registered on top of an empty registry.
pub fn engine_with(definitions: Vec<Definition>, registry: ActionRegistry) -> Engine {
    init_test_logging();
    let store = Arc::new(InMemoryDefinitionStore::with_definitions(definitions));
    let audit = Arc::new(InMemoryAuditSink::new());
    let engine = Arc::new(WorkflowEngine::new(
        store.clone(),
        audit.clone(),
        Arc::new(registry),
        EngineConfig::default(),
    ));
    Engine { engine, store, audit }
}

pub fn noop_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register_fn("noop", |_, _| Ok(ActionResult::success(None)));
    registry
}
