use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Serializable description of a workflow, as stored in workflow files
///
/// Operations are listed in insertion order. With no `links` the operations
/// form a linear chain, each one the child of the previous entry; otherwise
/// `links` name producer/consumer pairs by index into `operations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub operations: Vec<OperationSpec>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            metadata: HashMap::new(),
            operations: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Append an operation and return its index
    pub fn add_operation(&mut self, spec: OperationSpec) -> usize {
        self.operations.push(spec);
        self.operations.len() - 1
    }

    pub fn link(&mut self, from: usize, to: usize) {
        self.links.push(Link { from, to });
    }

    pub fn is_linear(&self) -> bool {
        self.links.is_empty()
    }
}

/// One operation entry in a workflow file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSpec {
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: HashMap<String, Value>,
}

impl OperationSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            config: HashMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Producer -> consumer pair, by operation index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub from: usize,
    pub to: usize,
}
