use crate::schedule::Schedule;
use crate::workflow::OperationGraph;
use opcore::{DataType, FlowError, Result};
use std::collections::BTreeMap;

/// Static type check of every producer -> consumer pairing.
///
/// For each node with parents, the parents' declared outputs are merged
/// (later parent in the walk wins on a shared name) and every merged name the
/// node also declares as an input is checked with [`DataType::accepts`].
/// Names the node does not declare are ignored, as they are at run time.
pub(crate) fn validate(graph: &OperationGraph) -> Result<()> {
    let schedule = Schedule::build(graph)?;

    for node in &schedule.order {
        let parents = schedule.parents(*node);
        if parents.is_empty() {
            continue;
        }

        let mut produced: BTreeMap<String, DataType> = BTreeMap::new();
        for parent in parents {
            for port in graph.node(*parent)?.signature().outputs() {
                produced.insert(port.name.clone(), port.data_type.clone());
            }
        }

        let operation = graph.node(*node)?;
        let signature = operation.signature();
        for (key, found) in produced {
            let Some(port) = signature.input(&key) else {
                continue;
            };
            tracing::debug!(
                "Node {}: checking '{}' {} against {}",
                node,
                key,
                found,
                port.data_type
            );
            if !port.data_type.accepts(&found) {
                return Err(FlowError::TypeMismatch {
                    key,
                    expected: port.data_type.clone(),
                    found,
                    node: *node,
                    kind: operation.kind().to_string(),
                });
            }
        }
    }

    Ok(())
}
