//! Per-widget state: layout cache, pending gesture and selection.
//!
//! A [`GraphSession`] never holds the canonical graph. The owner passes the
//! current [`OrgGraph`] into every call and commits whatever graph comes back
//! in [`Reaction::Applied`]. Independent sessions share nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{Config, LayoutConfig};
use crate::connection::{ConnectionTypeRegistry, ConnectionTypeStyle};
use crate::convert::{PositionedGraph, to_positioned};
use crate::ir::{ConnectionType, Direction, OrgGraph, Position};
use crate::layout::{LayoutCache, LayoutPass, LayoutSolver, solver_for};
use crate::negotiator::{Begin, PendingConnection, PendingGesture};
use crate::reconcile::{self, CascadeMode, Effect, Mutation, Outcome, ReconcileError, Rejection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMove {
    pub id: String,
    pub position: Position,
}

/// Events reported by the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InteractionEvent {
    NodeClick {
        node_id: String,
    },
    EdgeClick {
        edge_id: String,
    },
    PaneClick,
    NodesMoved {
        moves: Vec<NodeMove>,
    },
    DragEnd {
        node_id: String,
        position: Position,
    },
    Connect {
        source: String,
        target: String,
        #[serde(default)]
        anchor: Position,
    },
    Reconnect {
        edge_id: String,
        source: String,
        target: String,
        #[serde(default)]
        anchor: Position,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub node: Option<String>,
    pub edge: Option<String>,
}

impl Selection {
    pub fn clear(&mut self) {
        self.node = None;
        self.edge = None;
    }

    fn forget(&mut self, id: &str) {
        if self.node.as_deref() == Some(id) {
            self.node = None;
        }
        if self.edge.as_deref() == Some(id) {
            self.edge = None;
        }
    }

    /// Keeps references valid across a committed mutation.
    fn track(&mut self, effect: &Effect) {
        match effect {
            Effect::NodesRemoved { nodes, edges } => {
                for id in nodes.iter().chain(edges) {
                    self.forget(id);
                }
            }
            Effect::EdgeUpdated { from, to } => {
                if self.edge.as_deref() == Some(from.as_str()) {
                    self.edge = Some(to.clone());
                }
            }
            Effect::EdgeRemoved(id) => self.forget(id),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// Commit `Mutation::graph`.
    Applied(Mutation),
    /// Routine invalid gesture; the graph is unchanged.
    Rejected(Rejection),
    /// A connect/reconnect is parked until a type is chosen.
    AwaitingType(PendingGesture),
    /// Nothing to commit (selection changes, pane clicks).
    Unchanged,
}

impl From<Outcome> for Reaction {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Applied(mutation) => Reaction::Applied(mutation),
            Outcome::Rejected(rejection) => Reaction::Rejected(rejection),
        }
    }
}

impl Reaction {
    pub fn graph(&self) -> Option<&OrgGraph> {
        match self {
            Reaction::Applied(mutation) => Some(&mutation.graph),
            _ => None,
        }
    }

    /// The graph to commit: the mutated one, or `current` when nothing applied.
    pub fn commit(self, current: OrgGraph) -> OrgGraph {
        match self {
            Reaction::Applied(mutation) => mutation.graph,
            _ => current,
        }
    }
}

/// Everything the rendering surface needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasView {
    pub graph: PositionedGraph,
    /// Styles keyed by connection type token, for the types in use.
    pub styles: BTreeMap<String, ConnectionTypeStyle>,
    pub selection: Selection,
    pub pending: Option<PendingGesture>,
    pub direction: Direction,
    pub pass: LayoutPass,
}

pub struct GraphSession {
    direction: Direction,
    solver: Box<dyn LayoutSolver>,
    registry: ConnectionTypeRegistry,
    cache: LayoutCache,
    pending: PendingConnection,
    selection: Selection,
}

impl GraphSession {
    pub fn new(config: &Config) -> Self {
        Self::with_solver(config, solver_for(&config.layout))
    }

    pub fn with_solver(config: &Config, solver: Box<dyn LayoutSolver>) -> Self {
        Self {
            direction: config.layout.direction,
            solver,
            registry: config.connections.clone(),
            cache: LayoutCache::new(),
            pending: PendingConnection::new(),
            selection: Selection::default(),
        }
    }

    /// Converts and positions `graph`, running the solver only on structural change.
    pub fn view(&mut self, graph: &OrgGraph) -> CanvasView {
        let mut positioned = to_positioned(&graph.nodes, &graph.edges);
        let pass = self
            .cache
            .resolve(&mut positioned, self.direction, self.solver.as_ref());

        let mut styles = BTreeMap::new();
        for edge in &positioned.edges {
            styles
                .entry(edge.connection_type.as_str().to_string())
                .or_insert_with(|| self.registry.style(&edge.connection_type));
        }

        CanvasView {
            graph: positioned,
            styles,
            selection: self.selection.clone(),
            pending: self.pending.pending().cloned(),
            direction: self.direction,
            pass,
        }
    }

    pub fn handle(
        &mut self,
        graph: &OrgGraph,
        event: InteractionEvent,
    ) -> Result<Reaction, ReconcileError> {
        match event {
            InteractionEvent::NodeClick { node_id } => {
                if !graph.contains_node(&node_id) {
                    return self.stale(ReconcileError::UnknownNode(node_id));
                }
                self.selection = Selection {
                    node: Some(node_id),
                    edge: None,
                };
                Ok(Reaction::Unchanged)
            }
            InteractionEvent::EdgeClick { edge_id } => {
                if graph.edge(&edge_id).is_none() {
                    return self.stale(ReconcileError::UnknownEdge(edge_id));
                }
                self.selection = Selection {
                    node: None,
                    edge: Some(edge_id),
                };
                Ok(Reaction::Unchanged)
            }
            InteractionEvent::PaneClick => {
                self.selection.clear();
                self.pending.cancel();
                Ok(Reaction::Unchanged)
            }
            InteractionEvent::NodesMoved { moves } => {
                let moves: Vec<(String, Position)> =
                    moves.into_iter().map(|m| (m.id, m.position)).collect();
                self.apply(reconcile::move_nodes(graph, &moves))
            }
            InteractionEvent::DragEnd { node_id, position } => {
                self.apply(reconcile::move_nodes(graph, &[(node_id, position)]))
            }
            InteractionEvent::Connect {
                source,
                target,
                anchor,
            } => {
                let begin = self.pending.begin_connect(graph, &source, &target, anchor);
                Ok(self.begun(begin))
            }
            InteractionEvent::Reconnect {
                edge_id,
                source,
                target,
                anchor,
            } => match self
                .pending
                .begin_reconnect(graph, &edge_id, &source, &target, anchor)
            {
                Ok(begin) => Ok(self.begun(begin)),
                Err(err) => self.stale(err),
            },
        }
    }

    /// Picker callback: commits the pending gesture with `chosen`.
    pub fn choose_connection_type(
        &mut self,
        graph: &OrgGraph,
        chosen: &ConnectionType,
    ) -> Result<Reaction, ReconcileError> {
        let outcome = self.pending.resolve(graph, chosen);
        self.apply(outcome)
    }

    /// Escape key or click outside the picker.
    pub fn cancel_pending(&mut self) -> Option<PendingGesture> {
        self.pending.cancel()
    }

    pub fn add_child(
        &mut self,
        graph: &OrgGraph,
        parent_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Reaction, ReconcileError> {
        self.apply(reconcile::add_child(graph, parent_id, name, description))
    }

    pub fn edit_node(
        &mut self,
        graph: &OrgGraph,
        node_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Reaction, ReconcileError> {
        self.apply(reconcile::edit_node(graph, node_id, name, description))
    }

    /// Delete from the detail panel or keyboard: the node and its incident edges.
    pub fn delete_node(
        &mut self,
        graph: &OrgGraph,
        node_id: &str,
    ) -> Result<Reaction, ReconcileError> {
        self.apply(reconcile::delete_node(graph, node_id, CascadeMode::EdgesOnly))
    }

    /// "Delete branch": the node and everything reachable below it.
    pub fn delete_branch(
        &mut self,
        graph: &OrgGraph,
        node_id: &str,
    ) -> Result<Reaction, ReconcileError> {
        self.apply(reconcile::delete_node(graph, node_id, CascadeMode::Subtree))
    }

    pub fn delete_edge(
        &mut self,
        graph: &OrgGraph,
        edge_id: &str,
    ) -> Result<Reaction, ReconcileError> {
        self.apply(reconcile::delete_edge(graph, edge_id))
    }

    pub fn change_edge_type(
        &mut self,
        graph: &OrgGraph,
        edge_id: &str,
        new_type: &ConnectionType,
    ) -> Result<Reaction, ReconcileError> {
        self.apply(reconcile::change_edge_type(graph, edge_id, new_type))
    }

    /// Drops all manual positions.
    pub fn reset_layout(&mut self, graph: &OrgGraph) -> Result<Reaction, ReconcileError> {
        self.apply(reconcile::reset_positions(graph))
    }

    /// Forces the solver to run on the next [`GraphSession::view`].
    pub fn relayout(&mut self) {
        self.cache.invalidate();
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Swaps the solver; cached positions from the previous solver are dropped.
    pub fn set_solver(&mut self, config: &LayoutConfig) {
        self.solver = solver_for(config);
        self.cache.invalidate();
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn pending(&self) -> Option<&PendingGesture> {
        self.pending.pending()
    }

    pub fn registry(&self) -> &ConnectionTypeRegistry {
        &self.registry
    }

    pub fn layout_cache(&self) -> &LayoutCache {
        &self.cache
    }

    fn apply(
        &mut self,
        outcome: Result<Outcome, ReconcileError>,
    ) -> Result<Reaction, ReconcileError> {
        match outcome {
            Ok(Outcome::Applied(mutation)) => {
                self.selection.track(&mutation.effect);
                tracing::debug!(effect = ?mutation.effect, "mutation applied");
                Ok(Reaction::Applied(mutation))
            }
            Ok(rejected) => Ok(rejected.into()),
            Err(err) => self.stale(err),
        }
    }

    fn begun(&self, begin: Begin) -> Reaction {
        match begin {
            Begin::Awaiting { .. } => match self.pending.pending() {
                Some(gesture) => Reaction::AwaitingType(gesture.clone()),
                None => Reaction::Unchanged,
            },
            Begin::Rejected(rejection) => Reaction::Rejected(rejection),
        }
    }

    fn stale(&mut self, err: ReconcileError) -> Result<Reaction, ReconcileError> {
        self.selection.forget(err.stale_id());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, Node};

    fn org() -> OrgGraph {
        OrgGraph {
            nodes: vec![Node::new("ceo", "CEO"), Node::new("cto", "CTO"), Node::new("eng", "Eng")],
            edges: vec![
                Edge::new("ceo", "cto", ConnectionType::ReportsTo),
                Edge::new("cto", "eng", ConnectionType::ReportsTo),
            ],
        }
    }

    fn session() -> GraphSession {
        GraphSession::new(&Config::default())
    }

    #[test]
    fn view_binds_styles_for_types_in_use() {
        let mut session = session();
        let mut graph = org();
        graph.edges.push(Edge::new("ceo", "eng", ConnectionType::Advises));
        let view = session.view(&graph);
        let keys: Vec<&str> = view.styles.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["advises", "reports-to"]);
        assert!(view.pass.recomputed);
        assert!(view.graph.nodes.iter().all(|n| !n.position.is_origin()));
    }

    #[test]
    fn retype_retargets_selected_edge() {
        let mut session = session();
        let graph = org();
        session
            .handle(&graph, InteractionEvent::EdgeClick { edge_id: "e-ceo-cto-reports-to".into() })
            .unwrap();
        let reaction = session
            .change_edge_type(&graph, "e-ceo-cto-reports-to", &ConnectionType::Advises)
            .unwrap();
        assert!(reaction.graph().is_some());
        assert_eq!(session.selection().edge.as_deref(), Some("e-ceo-cto-advises"));
    }

    #[test]
    fn deleting_selected_node_clears_selection() {
        let mut session = session();
        let graph = org();
        session
            .handle(&graph, InteractionEvent::NodeClick { node_id: "eng".into() })
            .unwrap();
        let next = session.delete_branch(&graph, "cto").unwrap().commit(graph);
        assert_eq!(next.nodes.len(), 1);
        assert_eq!(session.selection(), &Selection::default());
    }

    #[test]
    fn stale_click_reports_error_and_drops_reference() {
        let mut session = session();
        let graph = org();
        session
            .handle(&graph, InteractionEvent::NodeClick { node_id: "eng".into() })
            .unwrap();
        let err = session.edit_node(&OrgGraph::new(), "eng", "x", None).unwrap_err();
        assert_eq!(err, ReconcileError::UnknownNode("eng".into()));
        assert_eq!(session.selection().node, None);
    }

    #[test]
    fn pane_click_cancels_pending_gesture() {
        let mut session = session();
        let graph = org();
        let reaction = session
            .handle(
                &graph,
                InteractionEvent::Connect {
                    source: "eng".into(),
                    target: "ceo".into(),
                    anchor: Position::new(10.0, 10.0),
                },
            )
            .unwrap();
        assert!(matches!(reaction, Reaction::AwaitingType(_)));
        session.handle(&graph, InteractionEvent::PaneClick).unwrap();
        assert!(session.pending().is_none());
    }

    #[test]
    fn events_deserialize_from_surface_json() {
        let event: InteractionEvent =
            serde_json::from_str(r#"{"kind":"dragEnd","nodeId":"a","position":{"x":3,"y":4}}"#)
                .unwrap();
        assert_eq!(
            event,
            InteractionEvent::DragEnd {
                node_id: "a".into(),
                position: Position::new(3.0, 4.0),
            }
        );
        let event: InteractionEvent = serde_json::from_str(r#"{"kind":"paneClick"}"#).unwrap();
        assert_eq!(event, InteractionEvent::PaneClick);
    }

    #[test]
    fn sessions_do_not_share_caches() {
        let graph = org();
        let mut first = session();
        let mut second = session();
        first.view(&graph);
        first.view(&graph);
        second.view(&graph);
        assert_eq!(first.layout_cache().solver_runs(), 1);
        assert_eq!(second.layout_cache().solver_runs(), 1);
    }
}
