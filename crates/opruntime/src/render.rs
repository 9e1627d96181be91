use opcore::GraphStore;
use serde::{Deserialize, Serialize};

/// Styling for [`to_dot`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawOptions {
    pub with_labels: bool,
    pub node_color: String,
    pub font_size: u32,
    /// Graphviz `rankdir`: "TB", "LR", "BT" or "RL"
    pub rank_dir: String,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            with_labels: true,
            node_color: "orange".to_string(),
            font_size: 10,
            rank_dir: "TB".to_string(),
        }
    }
}

/// Render a graph store as Graphviz DOT.
///
/// Only the node list, the labels produced by `label` and the adjacency are
/// read; nothing is executed. Written out directly instead of through
/// `petgraph::dot::Dot`, which has no hook for the graph-wide `DrawOptions`
/// attributes or for blanking labels.
pub fn to_dot<T, F>(graph: &GraphStore<T>, label: F, options: &DrawOptions) -> String
where
    F: Fn(&T) -> String,
{
    let mut dot = String::from("digraph workflow {\n");
    dot.push_str(&format!("    rankdir={};\n", options.rank_dir));
    dot.push_str(&format!(
        "    node [style=filled, fillcolor=\"{}\", fontsize={}];\n",
        escape(&options.node_color),
        options.font_size
    ));

    for (id, weight) in graph.iter() {
        let text = if options.with_labels {
            escape(&label(weight))
        } else {
            String::new()
        };
        dot.push_str(&format!("    {} [label=\"{}\"];\n", id, text));
    }

    for (from, to) in graph.edges() {
        dot.push_str(&format!("    {} -> {};\n", from, to));
    }

    dot.push_str("}\n");
    dot
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
