// crates/opruntime/src/loader.rs
use crate::registry::OperationRegistry;
use crate::workflow::Workflow;
use opcore::{FlowError, NodeId, Result, Value, WorkflowDefinition};
use std::path::Path;

/// Turns workflow definition files into runnable workflows
pub struct WorkflowLoader<'a> {
    registry: &'a OperationRegistry,
}

impl<'a> WorkflowLoader<'a> {
    pub fn new(registry: &'a OperationRegistry) -> Self {
        Self { registry }
    }

    /// Parse a JSON workflow definition
    pub fn read_definition(path: impl AsRef<Path>) -> Result<WorkflowDefinition> {
        let file = std::fs::File::open(path.as_ref())?;
        let definition = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(definition)
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Workflow> {
        let path = path.as_ref();
        tracing::info!("Loading workflow from {}", path.display());
        let definition = Self::read_definition(path)?;
        self.build(&definition)
    }

    /// Instantiate every operation through the registry and wire the graph.
    ///
    /// Without links the operations are chained in list order.
    pub fn build(&self, definition: &WorkflowDefinition) -> Result<Workflow> {
        let mut operations = Vec::with_capacity(definition.operations.len());
        for spec in &definition.operations {
            operations.push(self.registry.create_operation(&spec.kind, &spec.config)?);
        }

        let mut workflow = if definition.is_linear() {
            Workflow::new(operations)
        } else {
            let mut workflow = Workflow::empty();
            let ids: Vec<NodeId> = operations
                .into_iter()
                .map(|op| workflow.add_operation(op))
                .collect();
            for link in &definition.links {
                let endpoint = |index: usize| {
                    ids.get(index).copied().ok_or_else(|| {
                        FlowError::InvalidDefinition(format!(
                            "link {} -> {} refers to operation {} but only {} are defined",
                            link.from,
                            link.to,
                            index,
                            ids.len()
                        ))
                    })
                };
                workflow.connect(endpoint(link.from)?, endpoint(link.to)?)?;
            }
            workflow
        };

        if let Some(id) = &definition.id {
            workflow = workflow.with_id(id.clone());
        }
        let metadata = workflow.metadata_mut();
        metadata.extend(definition.metadata.clone());
        metadata
            .entry("name".to_string())
            .or_insert_with(|| Value::String(definition.name.clone()));

        tracing::debug!(
            "Built workflow '{}' with {} operations and {} edges",
            definition.name,
            workflow.len(),
            workflow.graph().edge_count()
        );
        Ok(workflow)
    }
}
