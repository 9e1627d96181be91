//! Workflow execution runtime
//!
//! This crate builds workflows out of operations, runs them in dependency
//! order, checks declared types ahead of time and renders the graph.

mod executor;
mod loader;
mod registry;
mod render;
mod results;
mod runtime;
mod schedule;
mod validate;
mod workflow;

pub use executor::{ExecutionMode, ExecutionResult, WorkflowExecutor};
pub use loader::WorkflowLoader;
pub use registry::{OperationFactory, OperationMetadata, OperationRegistry};
pub use render::{to_dot, DrawOptions};
pub use results::{NodeOutputs, ResultStore};
pub use runtime::{FlowRuntime, RuntimeConfig};
pub use workflow::{OperationGraph, Workflow};
