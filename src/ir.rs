use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "TB")]
    TopBottom,
    #[serde(rename = "LR")]
    LeftRight,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim() {
            "TB" | "TD" | "tb" | "td" => Some(Self::TopBottom),
            "LR" | "lr" => Some(Self::LeftRight),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::TopBottom => "TB",
            Self::LeftRight => "LR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Sentinel for "no meaningful manual position".
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Relationship kind carried by an edge.
///
/// The four built-in kinds have fixed wire tokens; any other non-empty token
/// is kept verbatim as [`ConnectionType::Custom`] so registries can be extended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ConnectionType {
    #[default]
    ReportsTo,
    Collaborates,
    Funds,
    Advises,
    Custom(String),
}

impl ConnectionType {
    pub const BUILT_IN: [ConnectionType; 4] = [
        ConnectionType::ReportsTo,
        ConnectionType::Collaborates,
        ConnectionType::Funds,
        ConnectionType::Advises,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        match token {
            "" => None,
            "reports-to" => Some(Self::ReportsTo),
            "collaborates" => Some(Self::Collaborates),
            "funds" => Some(Self::Funds),
            "advises" => Some(Self::Advises),
            other => Some(Self::Custom(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ReportsTo => "reports-to",
            Self::Collaborates => "collaborates",
            Self::Funds => "funds",
            Self::Advises => "advises",
            Self::Custom(token) => token.as_str(),
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ConnectionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConnectionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        ConnectionType::from_token(&token)
            .ok_or_else(|| serde::de::Error::custom("connection type must not be empty"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            member_count: None,
            position: None,
        }
    }

    /// Manual position, ignoring the origin sentinel.
    pub fn manual_position(&self) -> Option<Position> {
        self.position.filter(|pos| !pos.is_origin())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub connection_type: ConnectionType,
}

impl Edge {
    /// Builds an edge whose id is derived from its endpoints and type.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        connection_type: ConnectionType,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        let id = crate::convert::derive_edge_id(&source, &target, &connection_type);
        Self {
            id,
            source,
            target,
            connection_type,
        }
    }

    pub fn matches(&self, source: &str, target: &str, connection_type: &ConnectionType) -> bool {
        self.source == source && self.target == target && &self.connection_type == connection_type
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// The canonical graph owned by the embedding application.
///
/// Node and edge order is preserved exactly as supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl OrgGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    pub fn edge_index(&self, id: &str) -> Option<usize> {
        self.edges.iter().position(|edge| edge.id == id)
    }

    /// True when an edge other than `except` already holds the triple.
    pub fn has_edge_except(
        &self,
        source: &str,
        target: &str,
        connection_type: &ConnectionType,
        except: Option<&str>,
    ) -> bool {
        self.edges.iter().any(|edge| {
            edge.matches(source, target, connection_type) && Some(edge.id.as_str()) != except
        })
    }

    pub fn has_edge(&self, source: &str, target: &str, connection_type: &ConnectionType) -> bool {
        self.has_edge_except(source, target, connection_type, None)
    }

    /// Derived id for `source -> target` that no edge other than the one at
    /// `except` already uses.
    pub fn unused_edge_id(
        &self,
        source: &str,
        target: &str,
        connection_type: &ConnectionType,
        except: Option<usize>,
    ) -> String {
        let base = crate::convert::derive_edge_id(source, target, connection_type);
        crate::convert::first_free_id(base, |candidate| {
            self.edges
                .iter()
                .enumerate()
                .any(|(idx, edge)| Some(idx) != except && edge.id == candidate)
        })
    }

    /// Returns a node id not present in the graph.
    ///
    /// Collision checked against the current id set, never time based.
    pub fn fresh_node_id(&self) -> String {
        let taken: HashSet<&str> = self.nodes.iter().map(|node| node.id.as_str()).collect();
        let mut counter = self.nodes.len() + 1;
        loop {
            let candidate = format!("node-{counter}");
            if !taken.contains(candidate.as_str()) {
                return candidate;
            }
            counter += 1;
        }
    }
}
