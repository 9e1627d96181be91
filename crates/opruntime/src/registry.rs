use opcore::{FlowError, Operation, OperationError, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for creating operation instances
pub trait OperationFactory: Send + Sync {
    /// Create a new instance of the operation with given configuration
    fn create(&self, config: &HashMap<String, Value>) -> Result<Arc<dyn Operation>, OperationError>;

    /// Get operation kind identifier
    fn kind(&self) -> &str;

    /// Optional: description and category for listings
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::default()
    }
}

/// Metadata about an operation kind
#[derive(Debug, Clone)]
pub struct OperationMetadata {
    pub description: String,
    pub category: String,
}

impl Default for OperationMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

/// Registry of available operation kinds
pub struct OperationRegistry {
    factories: HashMap<String, Arc<dyn OperationFactory>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register an operation factory, replacing any factory of the same kind
    pub fn register(&mut self, factory: Arc<dyn OperationFactory>) {
        let kind = factory.kind().to_string();
        tracing::info!("Registering operation kind: {}", kind);
        self.factories.insert(kind, factory);
    }

    /// Create an operation instance from a kind and config
    pub fn create_operation(
        &self,
        kind: &str,
        config: &HashMap<String, Value>,
    ) -> Result<Arc<dyn Operation>, FlowError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| FlowError::UnknownOperation(kind.to_string()))?;

        factory.create(config).map_err(|e| {
            FlowError::InvalidDefinition(format!("Failed to create operation '{}': {}", kind, e))
        })
    }

    /// Get all registered kinds, sorted
    pub fn list_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Get metadata for an operation kind
    pub fn metadata(&self, kind: &str) -> Option<OperationMetadata> {
        self.factories.get(kind).map(|f| f.metadata())
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
