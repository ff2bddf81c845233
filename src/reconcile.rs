//! Translation of user interactions into canonical graph mutations.
//!
//! Every operation takes the current graph by reference and either returns a
//! complete next graph or leaves it untouched. Routine invalid gestures
//! (self loops, duplicates, unknown endpoints) come back as
//! [`Outcome::Rejected`]; operations against stale ids fail with
//! [`ReconcileError`].

use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::ir::{ConnectionType, Edge, Node, OrgGraph, Position};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("unknown node `{0}`")]
    UnknownNode(String),
    #[error("unknown edge `{0}`")]
    UnknownEdge(String),
    #[error("unknown parent `{0}`")]
    UnknownParent(String),
}

impl ReconcileError {
    /// The stale id the caller should drop from its selection.
    pub fn stale_id(&self) -> &str {
        match self {
            Self::UnknownNode(id) | Self::UnknownEdge(id) | Self::UnknownParent(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    SelfLoop,
    UnknownEndpoint(String),
    DuplicateEdge,
    NoPendingGesture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CascadeMode {
    /// Remove the node and every edge touching it.
    #[default]
    EdgesOnly,
    /// Also remove every node reachable through outgoing edges.
    Subtree,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    NodeAdded { node_id: String, edge_id: String },
    NodeEdited(String),
    NodesMoved(Vec<String>),
    PositionsReset,
    NodesRemoved { nodes: Vec<String>, edges: Vec<String> },
    EdgeAdded(String),
    /// Endpoints or type changed; `from` and `to` are the old and new ids.
    EdgeUpdated { from: String, to: String },
    EdgeRemoved(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub graph: OrgGraph,
    pub effect: Effect,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(Mutation),
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn graph(&self) -> Option<&OrgGraph> {
        match self {
            Outcome::Applied(mutation) => Some(&mutation.graph),
            Outcome::Rejected(_) => None,
        }
    }

    /// The graph to commit: the mutated one, or `current` on rejection.
    pub fn commit(self, current: OrgGraph) -> OrgGraph {
        match self {
            Outcome::Applied(mutation) => mutation.graph,
            Outcome::Rejected(_) => current,
        }
    }

    fn applied(graph: OrgGraph, effect: Effect) -> Result<Self, ReconcileError> {
        Ok(Outcome::Applied(Mutation { graph, effect }))
    }

    fn rejected(rejection: Rejection) -> Result<Self, ReconcileError> {
        tracing::debug!(?rejection, "interaction rejected");
        Ok(Outcome::Rejected(rejection))
    }
}

pub fn add_child(
    graph: &OrgGraph,
    parent_id: &str,
    name: &str,
    description: Option<&str>,
) -> Result<Outcome, ReconcileError> {
    if !graph.contains_node(parent_id) {
        return Err(ReconcileError::UnknownParent(parent_id.to_string()));
    }
    let mut next = graph.clone();
    let node_id = graph.fresh_node_id();
    let mut node = Node::new(node_id.clone(), name);
    node.description = description.map(str::to_string);
    let mut edge = Edge::new(parent_id, node_id.clone(), ConnectionType::ReportsTo);
    edge.id = graph.unused_edge_id(parent_id, &node_id, &ConnectionType::ReportsTo, None);
    let edge_id = edge.id.clone();
    next.nodes.push(node);
    next.edges.push(edge);
    Outcome::applied(next, Effect::NodeAdded { node_id, edge_id })
}

pub fn edit_node(
    graph: &OrgGraph,
    node_id: &str,
    name: &str,
    description: Option<&str>,
) -> Result<Outcome, ReconcileError> {
    let mut next = graph.clone();
    let node = next
        .node_mut(node_id)
        .ok_or_else(|| ReconcileError::UnknownNode(node_id.to_string()))?;
    node.label = name.to_string();
    node.description = description.map(str::to_string);
    Outcome::applied(next, Effect::NodeEdited(node_id.to_string()))
}

/// Commits manual positions from a drag. Fails as a whole on any unknown id.
pub fn move_nodes(
    graph: &OrgGraph,
    moves: &[(String, Position)],
) -> Result<Outcome, ReconcileError> {
    let mut next = graph.clone();
    for (node_id, position) in moves {
        let node = next
            .node_mut(node_id)
            .ok_or_else(|| ReconcileError::UnknownNode(node_id.clone()))?;
        node.position = Some(*position);
    }
    let moved = moves.iter().map(|(id, _)| id.clone()).collect();
    Outcome::applied(next, Effect::NodesMoved(moved))
}

/// Drops every manual position so the automatic layout applies everywhere.
pub fn reset_positions(graph: &OrgGraph) -> Result<Outcome, ReconcileError> {
    let mut next = graph.clone();
    for node in &mut next.nodes {
        node.position = None;
    }
    Outcome::applied(next, Effect::PositionsReset)
}

pub fn delete_node(
    graph: &OrgGraph,
    node_id: &str,
    mode: CascadeMode,
) -> Result<Outcome, ReconcileError> {
    if !graph.contains_node(node_id) {
        return Err(ReconcileError::UnknownNode(node_id.to_string()));
    }
    let doomed = match mode {
        CascadeMode::EdgesOnly => HashSet::from([node_id.to_string()]),
        CascadeMode::Subtree => descendants(graph, node_id),
    };

    let mut next = OrgGraph::new();
    let mut removed_nodes = Vec::new();
    let mut removed_edges = Vec::new();
    for node in &graph.nodes {
        if doomed.contains(&node.id) {
            removed_nodes.push(node.id.clone());
        } else {
            next.nodes.push(node.clone());
        }
    }
    for edge in &graph.edges {
        if doomed.contains(&edge.source) || doomed.contains(&edge.target) {
            removed_edges.push(edge.id.clone());
        } else {
            next.edges.push(edge.clone());
        }
    }

    Outcome::applied(
        next,
        Effect::NodesRemoved {
            nodes: removed_nodes,
            edges: removed_edges,
        },
    )
}

/// `root` plus every node reachable from it through outgoing edges.
fn descendants(graph: &OrgGraph, root: &str) -> HashSet<String> {
    let mut visited: HashSet<String> = HashSet::from([root.to_string()]);
    let mut queue: VecDeque<&str> = VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        for edge in graph.edges.iter().filter(|edge| edge.source == current) {
            if visited.insert(edge.target.clone()) {
                queue.push_back(edge.target.as_str());
            }
        }
    }
    visited
}

/// Validity gate for a raw connect gesture, before any type is known.
pub fn check_connection(graph: &OrgGraph, source: &str, target: &str) -> Result<(), Rejection> {
    if source == target {
        return Err(Rejection::SelfLoop);
    }
    for endpoint in [source, target] {
        if !graph.contains_node(endpoint) {
            return Err(Rejection::UnknownEndpoint(endpoint.to_string()));
        }
    }
    Ok(())
}

pub fn finalize_connection(
    graph: &OrgGraph,
    source: &str,
    target: &str,
    connection_type: &ConnectionType,
) -> Result<Outcome, ReconcileError> {
    if let Err(rejection) = check_connection(graph, source, target) {
        return Outcome::rejected(rejection);
    }
    if graph.has_edge(source, target, connection_type) {
        return Outcome::rejected(Rejection::DuplicateEdge);
    }
    let mut next = graph.clone();
    let mut edge = Edge::new(source, target, connection_type.clone());
    edge.id = graph.unused_edge_id(source, target, connection_type, None);
    let edge_id = edge.id.clone();
    next.edges.push(edge);
    Outcome::applied(next, Effect::EdgeAdded(edge_id))
}

/// Moves an edge to new endpoints, keeping its connection type.
pub fn reconnect(
    graph: &OrgGraph,
    edge_id: &str,
    new_source: &str,
    new_target: &str,
) -> Result<Outcome, ReconcileError> {
    let idx = graph
        .edge_index(edge_id)
        .ok_or_else(|| ReconcileError::UnknownEdge(edge_id.to_string()))?;
    if let Err(rejection) = check_connection(graph, new_source, new_target) {
        return Outcome::rejected(rejection);
    }
    let connection_type = graph.edges[idx].connection_type.clone();
    if graph.has_edge_except(new_source, new_target, &connection_type, Some(edge_id)) {
        return Outcome::rejected(Rejection::DuplicateEdge);
    }

    let mut next = graph.clone();
    let edge = &mut next.edges[idx];
    if edge.source == new_source && edge.target == new_target {
        return Outcome::applied(next, unchanged_edge(edge_id));
    }
    let to = graph.unused_edge_id(new_source, new_target, &connection_type, Some(idx));
    edge.source = new_source.to_string();
    edge.target = new_target.to_string();
    edge.id = to.clone();
    Outcome::applied(
        next,
        Effect::EdgeUpdated {
            from: edge_id.to_string(),
            to,
        },
    )
}

pub fn change_edge_type(
    graph: &OrgGraph,
    edge_id: &str,
    new_type: &ConnectionType,
) -> Result<Outcome, ReconcileError> {
    let idx = graph
        .edge_index(edge_id)
        .ok_or_else(|| ReconcileError::UnknownEdge(edge_id.to_string()))?;
    let current = &graph.edges[idx];
    if &current.connection_type == new_type {
        return Outcome::applied(graph.clone(), unchanged_edge(edge_id));
    }
    if graph.has_edge_except(&current.source, &current.target, new_type, Some(edge_id)) {
        return Outcome::rejected(Rejection::DuplicateEdge);
    }

    let to = graph.unused_edge_id(&current.source, &current.target, new_type, Some(idx));
    let mut next = graph.clone();
    let edge = &mut next.edges[idx];
    edge.connection_type = new_type.clone();
    edge.id = to.clone();
    Outcome::applied(
        next,
        Effect::EdgeUpdated {
            from: edge_id.to_string(),
            to,
        },
    )
}

pub fn delete_edge(graph: &OrgGraph, edge_id: &str) -> Result<Outcome, ReconcileError> {
    let idx = graph
        .edge_index(edge_id)
        .ok_or_else(|| ReconcileError::UnknownEdge(edge_id.to_string()))?;
    let mut next = graph.clone();
    next.edges.remove(idx);
    Outcome::applied(next, Effect::EdgeRemoved(edge_id.to_string()))
}

fn unchanged_edge(edge_id: &str) -> Effect {
    Effect::EdgeUpdated {
        from: edge_id.to_string(),
        to: edge_id.to_string(),
    }
}
