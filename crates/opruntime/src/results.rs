use opcore::{FlowError, NodeId, Result, Returned, Signature, Value};
use std::collections::HashMap;

/// Named outputs one node produced, in declared output order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOutputs {
    entries: Vec<(String, Value)>,
}

impl NodeOutputs {
    /// Pair what an operation returned with its declared output names.
    ///
    /// `Ok(None)` means the operation returned nothing and no entry should be
    /// recorded. Any other return must supply exactly one value per declared
    /// output.
    pub fn from_returned(
        node: NodeId,
        kind: &str,
        signature: &Signature,
        returned: Returned,
    ) -> Result<Option<Self>> {
        let values = match returned {
            Returned::Nothing => return Ok(None),
            Returned::Single(value) => vec![value],
            Returned::Tuple(values) => values,
        };

        let declared = signature.outputs();
        if values.len() != declared.len() {
            return Err(FlowError::OutputArity {
                node,
                kind: kind.to_string(),
                expected: declared.len(),
                actual: values.len(),
            });
        }

        let entries = declared
            .iter()
            .map(|port| port.name.clone())
            .zip(values)
            .collect();
        Ok(Some(Self { entries }))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, value)| value.clone()).collect()
    }

    pub fn to_map(&self) -> HashMap<String, Value> {
        self.entries.iter().cloned().collect()
    }
}

/// Outputs recorded during a single run, keyed by node
///
/// An entry exists only once its node has executed and returned something,
/// and is never removed for the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    entries: HashMap<NodeId, NodeOutputs>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node: NodeId, outputs: NodeOutputs) {
        self.entries.insert(node, outputs);
    }

    pub fn get(&self, node: NodeId) -> Option<&NodeOutputs> {
        self.entries.get(&node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of the producers' outputs. On a name collision the producer
    /// listed later wins.
    pub fn merged(&self, producers: &[NodeId]) -> HashMap<String, Value> {
        let mut merged = HashMap::new();
        for producer in producers {
            if let Some(outputs) = self.entries.get(producer) {
                for (key, value) in outputs.iter() {
                    merged.insert(key.to_string(), value.clone());
                }
            }
        }
        merged
    }

    /// Result of a run whose last node in topological order was `terminal`.
    ///
    /// A single recorded output is unwrapped; several become a tuple in
    /// declared order; a node that recorded nothing yields an empty tuple.
    pub fn terminal_result(&self, terminal: Option<NodeId>) -> Returned {
        let Some(node) = terminal else {
            return Returned::Nothing;
        };
        match self.entries.get(&node) {
            Some(outputs) if outputs.len() == 1 => Returned::Single(outputs.entries[0].1.clone()),
            Some(outputs) => Returned::Tuple(outputs.values()),
            None => Returned::Tuple(Vec::new()),
        }
    }
}
