use crate::{events::EventEmitter, DataType, NodeId, OperationError, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Core trait that every workflow stage implements
///
/// The engine knows an operation only through its [`Signature`] and its
/// `run` entry point. Two instances are two distinct nodes even when they
/// behave identically.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Kind identifier, also used as the node's display label (e.g. "math.add")
    fn kind(&self) -> &str;

    /// Declared inputs and outputs
    fn signature(&self) -> Signature;

    /// Execute with the inputs the engine resolved for this node.
    ///
    /// The number and order of returned values must match
    /// [`Signature::outputs`].
    async fn run(&self, ctx: OperationContext) -> Result<Returned, OperationError>;
}

/// A named, typed input or output
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub name: String,
    pub data_type: DataType,
}

impl Port {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Statically declared contract of an operation.
///
/// Input and output names are unique within their list; declaring a name a
/// second time replaces the earlier declaration in place. Output order is the
/// positional order of returned values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    inputs: Vec<Port>,
    outputs: Vec<Port>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        declare(&mut self.inputs, Port::new(name, data_type));
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        declare(&mut self.outputs, Port::new(name, data_type));
        self
    }

    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn declares_input(&self, name: &str) -> bool {
        self.input(name).is_some()
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.outputs.iter().map(|p| p.name.as_str())
    }
}

fn declare(ports: &mut Vec<Port>, port: Port) {
    match ports.iter_mut().find(|p| p.name == port.name) {
        Some(existing) => *existing = port,
        None => ports.push(port),
    }
}

/// What an operation handed back from `run`
#[derive(Debug, Clone, PartialEq)]
pub enum Returned {
    Nothing,
    Single(Value),
    /// Positional values, one per declared output
    Tuple(Vec<Value>),
}

impl Returned {
    pub fn tuple<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Returned::Tuple(values.into_iter().map(Into::into).collect())
    }

    /// Number of values returned
    pub fn count(&self) -> usize {
        match self {
            Returned::Nothing => 0,
            Returned::Single(_) => 1,
            Returned::Tuple(values) => values.len(),
        }
    }

    pub fn as_single(&self) -> Option<&Value> {
        match self {
            Returned::Single(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        match self {
            Returned::Nothing => Vec::new(),
            Returned::Single(value) => vec![value],
            Returned::Tuple(values) => values,
        }
    }
}

impl From<Value> for Returned {
    fn from(value: Value) -> Self {
        Returned::Single(value)
    }
}

/// Execution context passed to each operation
#[derive(Clone)]
pub struct OperationContext {
    /// Node the operation occupies in the running workflow
    pub node_id: NodeId,

    /// Resolved inputs, already filtered to the declared input names
    pub inputs: HashMap<String, Value>,

    /// Event emitter for real-time updates
    pub events: EventEmitter,

    /// Cancelled when a sibling node fails in parallel mode
    pub cancellation: CancellationToken,
}

impl OperationContext {
    pub fn new(node_id: NodeId, events: EventEmitter) -> Self {
        Self {
            node_id,
            inputs: HashMap::new(),
            events,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: HashMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, OperationError> {
        self.inputs
            .get(name)
            .ok_or_else(|| OperationError::MissingInput(name.to_string()))
    }

    /// Get a required numeric input
    pub fn require_number(&self, name: &str) -> Result<f64, OperationError> {
        let value = self.require_input(name)?;
        value.as_f64().ok_or_else(|| OperationError::InvalidInputType {
            field: name.to_string(),
            expected: DataType::Number.name(),
            actual: value.data_type().name(),
        })
    }
}
