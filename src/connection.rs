use crate::ir::ConnectionType;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Routing {
    #[default]
    Smoothstep,
    Bezier,
    Straight,
    Step,
}

/// Visual descriptor bound to a connection type. Never part of edge identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTypeStyle {
    pub label: String,
    pub color: String,
    pub dash: Option<String>,
    pub animated: bool,
    pub routing: Routing,
}

impl ConnectionTypeStyle {
    fn new(label: &str, color: &str, dash: Option<&str>, animated: bool, routing: Routing) -> Self {
        Self {
            label: label.to_string(),
            color: color.to_string(),
            dash: dash.map(str::to_string),
            animated,
            routing,
        }
    }

    fn fallback(connection_type: &ConnectionType) -> Self {
        Self::new(
            connection_type.as_str(),
            "#94A3B8",
            None,
            false,
            Routing::Smoothstep,
        )
    }
}

static BUILT_IN_STYLES: Lazy<Vec<(ConnectionType, ConnectionTypeStyle)>> = Lazy::new(|| {
    vec![
        (
            ConnectionType::ReportsTo,
            ConnectionTypeStyle::new("Reports to", "#3B82F6", None, false, Routing::Smoothstep),
        ),
        (
            ConnectionType::Collaborates,
            ConnectionTypeStyle::new("Collaborates", "#10B981", Some("5,5"), true, Routing::Bezier),
        ),
        (
            ConnectionType::Funds,
            ConnectionTypeStyle::new("Funds", "#F59E0B", None, true, Routing::Smoothstep),
        ),
        (
            ConnectionType::Advises,
            ConnectionTypeStyle::new("Advises", "#8B5CF6", Some("2,4"), false, Routing::Straight),
        ),
    ]
});

/// Lookup table from relationship kind to style.
///
/// Entries keep registration order, which is also the order a type picker lists them in.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionTypeRegistry {
    entries: Vec<(ConnectionType, ConnectionTypeStyle)>,
}

impl ConnectionTypeRegistry {
    pub fn built_in() -> Self {
        Self {
            entries: BUILT_IN_STYLES.clone(),
        }
    }

    /// Style for `connection_type`; unregistered custom types get a neutral grey style.
    pub fn style(&self, connection_type: &ConnectionType) -> ConnectionTypeStyle {
        self.entries
            .iter()
            .find(|(kind, _)| kind == connection_type)
            .map(|(_, style)| style.clone())
            .unwrap_or_else(|| ConnectionTypeStyle::fallback(connection_type))
    }

    pub fn contains(&self, connection_type: &ConnectionType) -> bool {
        self.entries.iter().any(|(kind, _)| kind == connection_type)
    }

    /// Adds a type or replaces the style of an existing one in place.
    pub fn register(&mut self, connection_type: ConnectionType, style: ConnectionTypeStyle) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(kind, _)| *kind == connection_type)
        {
            entry.1 = style;
            return;
        }
        self.entries.push((connection_type, style));
    }

    pub fn types(&self) -> impl Iterator<Item = &ConnectionType> {
        self.entries.iter().map(|(kind, _)| kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConnectionType, &ConnectionTypeStyle)> {
        self.entries.iter().map(|(kind, style)| (kind, style))
    }
}

impl Default for ConnectionTypeRegistry {
    fn default() -> Self {
        Self::built_in()
    }
}
