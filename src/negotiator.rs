//! Pending-connection state machine.
//!
//! A connect or reconnect gesture is parked in [`PendingConnection::AwaitingType`]
//! until a relationship type is picked or the gesture is cancelled. At most
//! one gesture is ever pending.

use crate::ir::{ConnectionType, OrgGraph, Position};
use crate::reconcile::{
    self, Effect, Mutation, Outcome, ReconcileError, Rejection, check_connection,
};

#[derive(Debug, Clone, PartialEq)]
pub enum GestureKind {
    Connect,
    Reconnect {
        edge_id: String,
        current_type: ConnectionType,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingGesture {
    pub kind: GestureKind,
    pub source: String,
    pub target: String,
    /// Where the type picker should open, in screen space.
    pub anchor: Position,
}

impl PendingGesture {
    /// Type to preselect in the picker.
    pub fn suggested_type(&self) -> Option<&ConnectionType> {
        match &self.kind {
            GestureKind::Connect => None,
            GestureKind::Reconnect { current_type, .. } => Some(current_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Begin {
    /// The gesture is now pending; `replaced` is the gesture it cancelled.
    Awaiting { replaced: Option<PendingGesture> },
    Rejected(Rejection),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PendingConnection {
    #[default]
    Idle,
    AwaitingType(PendingGesture),
}

impl PendingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingGesture> {
        match self {
            PendingConnection::Idle => None,
            PendingConnection::AwaitingType(gesture) => Some(gesture),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PendingConnection::Idle)
    }

    /// Starts a connect gesture. Any gesture already pending is cancelled
    /// first, even when the new one is rejected.
    pub fn begin_connect(
        &mut self,
        graph: &OrgGraph,
        source: &str,
        target: &str,
        anchor: Position,
    ) -> Begin {
        let replaced = self.cancel();
        if let Err(rejection) = check_connection(graph, source, target) {
            tracing::debug!(?rejection, source, target, "connect gesture rejected");
            return Begin::Rejected(rejection);
        }
        *self = PendingConnection::AwaitingType(PendingGesture {
            kind: GestureKind::Connect,
            source: source.to_string(),
            target: target.to_string(),
            anchor,
        });
        Begin::Awaiting { replaced }
    }

    pub fn begin_reconnect(
        &mut self,
        graph: &OrgGraph,
        edge_id: &str,
        new_source: &str,
        new_target: &str,
        anchor: Position,
    ) -> Result<Begin, ReconcileError> {
        let replaced = self.cancel();
        let edge = graph
            .edge(edge_id)
            .ok_or_else(|| ReconcileError::UnknownEdge(edge_id.to_string()))?;
        if let Err(rejection) = check_connection(graph, new_source, new_target) {
            tracing::debug!(?rejection, edge_id, "reconnect gesture rejected");
            return Ok(Begin::Rejected(rejection));
        }
        *self = PendingConnection::AwaitingType(PendingGesture {
            kind: GestureKind::Reconnect {
                edge_id: edge_id.to_string(),
                current_type: edge.connection_type.clone(),
            },
            source: new_source.to_string(),
            target: new_target.to_string(),
            anchor,
        });
        Ok(Begin::Awaiting { replaced })
    }

    /// Drops the pending gesture, if any, without touching the graph.
    pub fn cancel(&mut self) -> Option<PendingGesture> {
        match std::mem::take(self) {
            PendingConnection::Idle => None,
            PendingConnection::AwaitingType(gesture) => {
                tracing::debug!(
                    source = %gesture.source,
                    target = %gesture.target,
                    "pending gesture cancelled"
                );
                Some(gesture)
            }
        }
    }

    /// Commits the pending gesture with `chosen`. Returns to idle whatever the result.
    ///
    /// A reconnect moves the edge keeping its type, then retypes it when
    /// `chosen` differs; a rejection of either step rejects the whole gesture.
    pub fn resolve(
        &mut self,
        graph: &OrgGraph,
        chosen: &ConnectionType,
    ) -> Result<Outcome, ReconcileError> {
        let gesture = match std::mem::take(self) {
            PendingConnection::Idle => return Ok(Outcome::Rejected(Rejection::NoPendingGesture)),
            PendingConnection::AwaitingType(gesture) => gesture,
        };

        match gesture.kind {
            GestureKind::Connect => {
                reconcile::finalize_connection(graph, &gesture.source, &gesture.target, chosen)
            }
            GestureKind::Reconnect {
                edge_id,
                current_type,
            } => {
                let moved =
                    match reconcile::reconnect(graph, &edge_id, &gesture.source, &gesture.target)? {
                        Outcome::Applied(mutation) => mutation,
                        rejected => return Ok(rejected),
                    };
                if *chosen == current_type {
                    return Ok(Outcome::Applied(moved));
                }
                let moved_id = match &moved.effect {
                    Effect::EdgeUpdated { to, .. } => to.clone(),
                    _ => edge_id.clone(),
                };
                match reconcile::change_edge_type(&moved.graph, &moved_id, chosen)? {
                    Outcome::Applied(Mutation { graph, effect }) => {
                        let to = match effect {
                            Effect::EdgeUpdated { to, .. } => to,
                            _ => moved_id,
                        };
                        Ok(Outcome::Applied(Mutation {
                            graph,
                            effect: Effect::EdgeUpdated { from: edge_id, to },
                        }))
                    }
                    rejected => Ok(rejected),
                }
            }
        }
    }
}
