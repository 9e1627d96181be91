use crate::{DataType, NodeId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Input type {found} is not valid for '{key}': expected {expected} at node {node} ({kind})")]
    TypeMismatch {
        key: String,
        expected: DataType,
        found: DataType,
        node: NodeId,
        kind: String,
    },

    #[error("Node {node} ({kind}) returned {actual} value(s) but declares {expected} output(s)")]
    OutputArity {
        node: NodeId,
        kind: String,
        expected: usize,
        actual: usize,
    },

    /// Failures raised by an operation reach the caller as-is.
    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("Unknown operation kind: {0}")]
    UnknownOperation(String),

    #[error("Invalid workflow definition: {0}")]
    InvalidDefinition(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Structural violations of the graph store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Edge {from} -> {to} would create a cycle")]
    WouldCycle { from: NodeId, to: NodeId },

    #[error("Edge {from} -> {to} already exists")]
    DuplicateEdge { from: NodeId, to: NodeId },
}

#[derive(Error, Debug, Clone)]
pub enum OperationError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Cancelled")]
    Cancelled,
}
