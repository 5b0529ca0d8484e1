pub mod helpers;
pub mod integration;
pub mod unit;

// Shared engine wiring for crate-level tests
use std::sync::Arc;

use crate::workflows::store::{InMemoryAuditSink, InMemoryDefinitionStore};
use crate::workflows::{EngineConfig, RecordingGateway, WorkflowEngine, builtin_registry};
use ruleflow_shared::Definition;

/// Engine over in-memory store and audit sink with every built-in handler,
/// acting through a recording gateway.
pub struct TestContext {
    pub engine: Arc<WorkflowEngine>,
    pub store: Arc<InMemoryDefinitionStore>,
    pub audit: Arc<InMemoryAuditSink>,
    pub gateway: Arc<RecordingGateway>,
}

impl TestContext {
    pub fn new(definitions: Vec<Definition>) -> Self {
        Self::with_config(definitions, EngineConfig::default())
    }

    pub fn with_config(definitions: Vec<Definition>, config: EngineConfig) -> Self {
        let gateway = Arc::new(RecordingGateway::new());
        let registry = builtin_registry(gateway.clone(), gateway.clone(), reqwest::Client::new());
        let store = Arc::new(InMemoryDefinitionStore::with_definitions(definitions));
        let audit = Arc::new(InMemoryAuditSink::new());
        let engine = Arc::new(WorkflowEngine::new(
            store.clone(),
            audit.clone(),
            Arc::new(registry),
            config,
        ));

        Self {
            engine,
            store,
            audit,
            gateway,
        }
    }
}
