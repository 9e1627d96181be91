use crate::executor::{ExecutionMode, ExecutionResult, WorkflowExecutor};
use crate::loader::WorkflowLoader;
use crate::registry::OperationRegistry;
use crate::workflow::Workflow;
use opcore::{EventBus, ExecutionEvent, Result, Value, WorkflowDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Main entry point for loading and executing workflows
pub struct FlowRuntime {
    registry: Arc<OperationRegistry>,
    executor: WorkflowExecutor,
    event_bus: Arc<EventBus>,
}

impl FlowRuntime {
    /// Create a new runtime with default settings
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(OperationRegistry::new()), config)
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<OperationRegistry>, config: RuntimeConfig) -> Self {
        let executor = WorkflowExecutor::new(config.mode, config.max_parallel_nodes);
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            registry,
            executor,
            event_bus,
        }
    }

    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// Load a workflow file using this runtime's registry
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Workflow> {
        WorkflowLoader::new(&self.registry).load_file(path)
    }

    pub fn build(&self, definition: &WorkflowDefinition) -> Result<Workflow> {
        WorkflowLoader::new(&self.registry).build(definition)
    }

    /// Execute a workflow, emitting events on this runtime's bus
    pub async fn execute(
        &self,
        workflow: &Workflow,
        inputs: HashMap<String, Value>,
    ) -> Result<ExecutionResult> {
        self.executor
            .execute(workflow, Some(&self.event_bus), inputs)
            .await
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub mode: ExecutionMode,
    pub max_parallel_nodes: usize,
    pub event_buffer_size: usize,
}

impl RuntimeConfig {
    /// Read a JSON config file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            max_parallel_nodes: 10,
            event_buffer_size: 1000,
        }
    }
}
