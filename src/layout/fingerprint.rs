use std::collections::BTreeSet;
use std::fmt;

use crate::convert::PositionedGraph;
use crate::ir::Direction;

/// Structural key of a graph for layout purposes.
///
/// Built from the sorted node ids, the sorted distinct `source -> target`
/// pairs and the flow direction. Labels, descriptions, member counts, edge
/// types, selection and manual positions do not contribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutFingerprint(String);

impl LayoutFingerprint {
    pub fn compute(graph: &PositionedGraph, direction: Direction) -> Self {
        let node_ids: BTreeSet<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
        let pairs: BTreeSet<(&str, &str)> = graph
            .edges
            .iter()
            .map(|edge| (edge.source.as_str(), edge.target.as_str()))
            .collect();

        // Length prefixes keep ids containing separators unambiguous.
        let mut key = String::new();
        for id in node_ids {
            key.push_str(&format!("{}:{id},", id.len()));
        }
        key.push('|');
        for (source, target) in pairs {
            key.push_str(&format!("{}:{source}>{}:{target},", source.len(), target.len()));
        }
        key.push('|');
        key.push_str(direction.as_token());
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for a graph with no nodes and no edges.
    pub fn is_structurally_empty(&self) -> bool {
        self.0.starts_with("||")
    }
}

impl fmt::Display for LayoutFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
