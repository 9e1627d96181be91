use crate::executor::WorkflowExecutor;
use crate::render::{self, DrawOptions};
use crate::validate;
use opcore::{GraphStore, NodeId, Operation, Result, Returned, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Graph of shared operation handles that a workflow runs over
pub type OperationGraph = GraphStore<Arc<dyn Operation>>;

/// A DAG of operations plus caller metadata
///
/// The usual way in is [`Workflow::new`], which chains the given operations
/// linearly. [`Workflow::add_operation`], [`Workflow::add_child`] and
/// [`Workflow::connect`] build arbitrary DAGs.
#[derive(Clone, Default)]
pub struct Workflow {
    id: Option<String>,
    metadata: HashMap<String, Value>,
    graph: OperationGraph,
}

impl Workflow {
    /// Chain `operations` so that each one consumes the outputs of the one
    /// before it. An empty list gives an empty workflow.
    pub fn new<I>(operations: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Operation>>,
    {
        Self {
            id: None,
            metadata: HashMap::new(),
            graph: GraphStore::chain(operations),
        }
    }

    /// A one-node workflow
    pub fn single(operation: Arc<dyn Operation>) -> Self {
        Self::new([operation])
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.metadata
    }

    pub fn add_operation(&mut self, operation: Arc<dyn Operation>) -> NodeId {
        self.graph.add_node(operation)
    }

    pub fn add_child(&mut self, parent: NodeId, operation: Arc<dyn Operation>) -> Result<NodeId> {
        self.graph.add_child(parent, operation)
    }

    /// Make `to` consume the outputs of `from`.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.graph.add_edge(from, to)
    }

    pub fn operation(&self, id: NodeId) -> Result<&Arc<dyn Operation>> {
        self.graph.node(id)
    }

    pub fn graph(&self) -> &OperationGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Run every node once, sequentially, and return the terminal node's
    /// outputs.
    ///
    /// `inputs` feed the nodes without predecessors. Use
    /// [`crate::FlowRuntime`] for events, parallel mode or the full
    /// per-node result store.
    pub async fn run(&self, inputs: HashMap<String, Value>) -> Result<Returned> {
        let execution = WorkflowExecutor::default()
            .execute(self, None, inputs)
            .await?;
        Ok(execution.result)
    }

    /// Check that every producer's declared output types fit the declared
    /// input types of its consumers, without running anything.
    pub fn validate(&self) -> Result<()> {
        validate::validate(&self.graph)
    }

    /// Render the graph as Graphviz DOT, labelling nodes by operation kind.
    pub fn draw(&self, options: &DrawOptions) -> String {
        render::to_dot(&self.graph, |op| op.kind().to_string(), options)
    }
}

impl From<Arc<dyn Operation>> for Workflow {
    fn from(operation: Arc<dyn Operation>) -> Self {
        Self::single(operation)
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.graph.iter().map(|(_, op)| op.kind()).collect();
        f.debug_struct("Workflow")
            .field("id", &self.id)
            .field("metadata", &self.metadata)
            .field("operations", &kinds)
            .field("edges", &self.graph.edges())
            .finish()
    }
}
