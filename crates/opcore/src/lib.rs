//! Core abstractions for the opflow engine
//!
//! This crate provides the operation contract, the graph store the engine
//! runs over, and the error and event types every other crate shares.

mod definition;
mod error;
pub mod events;
mod graph;
mod operation;
mod types;
mod value;

pub use definition::{Link, OperationSpec, WorkflowDefinition};
pub use error::{FlowError, GraphError, OperationError};
pub use events::*;
pub use graph::{GraphStore, NodeId};
pub use operation::{Operation, OperationContext, Port, Returned, Signature};
pub use types::DataType;
pub use value::Value;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, FlowError>;
