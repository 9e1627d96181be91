use opcore::{GraphStore, NodeId, Result};
use std::collections::HashMap;

/// Topological walk of a graph together with each node's parents.
///
/// Parents are listed in the order they appear in the walk, so merging their
/// outputs front to back lets the later producer win.
pub(crate) struct Schedule {
    pub order: Vec<NodeId>,
    parents: HashMap<NodeId, Vec<NodeId>>,
}

impl Schedule {
    pub fn build<T>(graph: &GraphStore<T>) -> Result<Self> {
        let order = graph.topological_order();
        let rank: HashMap<NodeId, usize> = order
            .iter()
            .enumerate()
            .map(|(position, node)| (*node, position))
            .collect();

        let mut parents = HashMap::with_capacity(order.len());
        for node in &order {
            let mut preds = graph.predecessors(*node)?;
            preds.sort_by_key(|pred| rank.get(pred).copied().unwrap_or(usize::MAX));
            parents.insert(*node, preds);
        }

        Ok(Self { order, parents })
    }

    pub fn parents(&self, node: NodeId) -> &[NodeId] {
        self.parents.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Last node of the walk; its outputs make up the run's result.
    pub fn terminal(&self) -> Option<NodeId> {
        self.order.last().copied()
    }
}
