use crate::{FlowError, GraphError, Result};
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Topo;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned node identifier.
///
/// Ids are handed out in insertion order starting at zero and are never
/// reused, since the store does not support removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(index: usize) -> Self {
        NodeId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    fn to_index(self) -> NodeIndex {
        NodeIndex::new(self.0)
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeIndex> for NodeId {
    fn from(idx: NodeIndex) -> Self {
        NodeId(idx.index())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arena of nodes connected by payload-free producer -> consumer edges.
///
/// The store owns its node weights; callers refer to them by [`NodeId`] only.
/// Every mutation keeps the graph acyclic.
#[derive(Debug, Clone)]
pub struct GraphStore<T> {
    graph: DiGraph<T, ()>,
}

impl<T> GraphStore<T> {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.graph.node_count()
    }

    /// Build a linear chain: each weight becomes the child of the one before.
    pub fn chain<I>(weights: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut graph = DiGraph::new();
        let mut previous: Option<NodeIndex> = None;
        for weight in weights {
            let idx = graph.add_node(weight);
            if let Some(parent) = previous {
                graph.add_edge(parent, idx, ());
            }
            previous = Some(idx);
        }
        Self { graph }
    }

    /// Insert a node without edges.
    pub fn add_node(&mut self, weight: T) -> NodeId {
        self.graph.add_node(weight).into()
    }

    /// Insert a node as a child of `parent`.
    ///
    /// Nothing is inserted when `parent` does not exist.
    pub fn add_child(&mut self, parent: NodeId, weight: T) -> Result<NodeId> {
        if !self.contains(parent) {
            return Err(FlowError::NotFound(parent));
        }
        let child = self.add_node(weight);
        self.graph.add_edge(parent.to_index(), child.to_index(), ());
        Ok(child)
    }

    /// Connect two existing nodes, rejecting duplicates and cycles.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        for id in [from, to] {
            if !self.contains(id) {
                return Err(FlowError::NotFound(id));
            }
        }
        if self.graph.find_edge(from.to_index(), to.to_index()).is_some() {
            return Err(GraphError::DuplicateEdge { from, to }.into());
        }
        if from == to || has_path_connecting(&self.graph, to.to_index(), from.to_index(), None) {
            return Err(GraphError::WouldCycle { from, to }.into());
        }
        self.graph.add_edge(from.to_index(), to.to_index(), ());
        Ok(())
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.graph.node_weight(id.to_index())
    }

    pub fn node(&self, id: NodeId) -> Result<&T> {
        self.get(id).ok_or(FlowError::NotFound(id))
    }

    /// Direct parents of `id`, in ascending id order.
    pub fn predecessors(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Direct children of `id`, in ascending id order.
    pub fn successors(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: NodeId, direction: Direction) -> Result<Vec<NodeId>> {
        if !self.contains(id) {
            return Err(FlowError::NotFound(id));
        }
        let mut ids: Vec<NodeId> = self
            .graph
            .neighbors_directed(id.to_index(), direction)
            .map(NodeId::from)
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Every node after all of its predecessors.
    ///
    /// Cannot fail: `add_edge` refuses any edge that would close a cycle.
    /// The order depends only on the store's contents, so repeated calls on
    /// the same store agree.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut topo = Topo::new(&self.graph);
        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(idx) = topo.next(&self.graph) {
            order.push(NodeId::from(idx));
        }
        order
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices().map(NodeId::from)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> + '_ {
        self.graph
            .node_indices()
            .map(move |idx| (NodeId::from(idx), &self.graph[idx]))
    }

    /// All edges as `(producer, consumer)` pairs, in insertion order.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| (edge.source().into(), edge.target().into()))
            .collect()
    }
}

impl<T> Default for GraphStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
