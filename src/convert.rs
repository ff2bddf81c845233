//! Mapping between the canonical [`OrgGraph`] records and the positioned
//! representation handed to layout and rendering.

use crate::ir::{ConnectionType, Edge, Node, OrgGraph, Position};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u32>,
    /// Position exactly as supplied by the owner, origin sentinel included.
    #[serde(skip)]
    pub supplied_position: Option<Position>,
    /// Resolved position; the origin until the layout cache has run.
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub connection_type: ConnectionType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositionedGraph {
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<PositionedEdge>,
}

impl PositionedGraph {
    pub fn node(&self, id: &str) -> Option<&PositionedNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

/// Display id of an edge, a pure function of its triple.
///
/// `-` and `%` inside node ids are percent-escaped, so the first two `-`
/// separators always split source, target and type apart.
pub fn derive_edge_id(source: &str, target: &str, connection_type: &ConnectionType) -> String {
    format!(
        "e-{}-{}-{}",
        escape_id_part(source),
        escape_id_part(target),
        connection_type.as_str()
    )
}

fn escape_id_part(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for ch in id.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '-' => out.push_str("%2D"),
            _ => out.push(ch),
        }
    }
    out
}

/// `base`, or `base~2`, `base~3`, ... whichever is first not `taken`.
pub(crate) fn first_free_id(base: String, taken: impl Fn(&str) -> bool) -> String {
    if !taken(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}~{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

pub fn to_positioned(nodes: &[Node], edges: &[Edge]) -> PositionedGraph {
    let nodes = nodes
        .iter()
        .map(|node| PositionedNode {
            id: node.id.clone(),
            label: node.label.clone(),
            description: node.description.clone(),
            member_count: node.member_count,
            supplied_position: node.position,
            position: node.position.unwrap_or(Position::ORIGIN),
        })
        .collect();

    let mut taken: HashSet<String> = edges
        .iter()
        .filter(|edge| !edge.id.is_empty())
        .map(|edge| edge.id.clone())
        .collect();
    let edges = edges
        .iter()
        .map(|edge| {
            let id = if edge.id.is_empty() {
                let base = derive_edge_id(&edge.source, &edge.target, &edge.connection_type);
                let id = first_free_id(base, |candidate| taken.contains(candidate));
                taken.insert(id.clone());
                id
            } else {
                edge.id.clone()
            };
            PositionedEdge {
                id,
                source: edge.source.clone(),
                target: edge.target.clone(),
                connection_type: edge.connection_type.clone(),
            }
        })
        .collect();

    PositionedGraph { nodes, edges }
}

pub fn to_simplified(graph: &PositionedGraph) -> OrgGraph {
    let nodes = graph
        .nodes
        .iter()
        .map(|node| Node {
            id: node.id.clone(),
            label: node.label.clone(),
            description: node.description.clone(),
            member_count: node.member_count,
            position: node.supplied_position,
        })
        .collect();

    let edges = graph
        .edges
        .iter()
        .map(|edge| Edge {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            connection_type: edge.connection_type.clone(),
        })
        .collect();

    OrgGraph { nodes, edges }
}
