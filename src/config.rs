use crate::connection::{ConnectionTypeRegistry, Routing};
use crate::ir::{ConnectionType, Direction};
use crate::theme::Theme;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

static COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("color pattern is valid")
});

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown layout direction `{0}` (expected TB or LR)")]
    UnknownDirection(String),
    #[error("unknown theme `{0}`")]
    UnknownTheme(String),
    #[error("invalid color `{value}` for {field}")]
    InvalidColor { field: String, value: String },
    #[error("connection type token must not be empty")]
    EmptyConnectionType,
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Layered,
    Dagre,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub direction: Direction,
    pub solver: SolverKind,
    pub node_width: f32,
    pub node_height: f32,
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub component_spacing: f32,
    pub margin: f32,
    pub order_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::TopBottom,
            solver: SolverKind::Layered,
            node_width: 172.0,
            node_height: 36.0,
            node_spacing: 50.0,
            rank_spacing: 70.0,
            component_spacing: 80.0,
            margin: 20.0,
            order_passes: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub padding: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            padding: 24.0,
            background: "#F8FAFC".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub connections: ConnectionTypeRegistry,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::light();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
            connections: ConnectionTypeRegistry::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    node_fill: Option<String>,
    node_border: Option<String>,
    node_text: Option<String>,
    secondary_text: Option<String>,
    selection_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionStyleFile {
    label: Option<String>,
    color: Option<String>,
    dash: Option<String>,
    animated: Option<bool>,
    routing: Option<Routing>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    direction: Option<String>,
    solver: Option<SolverKind>,
    node_width: Option<f32>,
    node_height: Option<f32>,
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    component_spacing: Option<f32>,
    margin: Option<f32>,
    order_passes: Option<usize>,
    connection_types: Option<BTreeMap<String, ConnectionStyleFile>>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_config(&contents)?)
}

/// Overlays a JSON config document on the defaults.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    let parsed: ConfigFile = serde_json::from_str(contents)?;
    let mut config = Config::default();

    if let Some(name) = parsed.theme.as_deref() {
        config.theme =
            Theme::from_name(name).ok_or_else(|| ConfigError::UnknownTheme(name.to_string()))?;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = positive("fontSize", v)?;
        }
        if let Some(v) = vars.node_fill {
            config.theme.node_fill = color("nodeFill", v)?;
        }
        if let Some(v) = vars.node_border {
            config.theme.node_border = color("nodeBorder", v)?;
        }
        if let Some(v) = vars.node_text {
            config.theme.node_text = color("nodeText", v)?;
        }
        if let Some(v) = vars.secondary_text {
            config.theme.secondary_text = color("secondaryText", v)?;
        }
        if let Some(v) = vars.selection_color {
            config.theme.selection_color = color("selectionColor", v)?;
        }
        if let Some(v) = vars.background {
            config.theme.background = color("background", v)?;
        }
    }

    if let Some(token) = parsed.direction {
        config.layout.direction =
            Direction::from_token(&token).ok_or(ConfigError::UnknownDirection(token))?;
    }
    if let Some(v) = parsed.solver {
        config.layout.solver = v;
    }
    if let Some(v) = parsed.node_width {
        config.layout.node_width = positive("nodeWidth", v)?;
    }
    if let Some(v) = parsed.node_height {
        config.layout.node_height = positive("nodeHeight", v)?;
    }
    if let Some(v) = parsed.node_spacing {
        config.layout.node_spacing = v.max(0.0);
    }
    if let Some(v) = parsed.rank_spacing {
        config.layout.rank_spacing = v.max(0.0);
    }
    if let Some(v) = parsed.component_spacing {
        config.layout.component_spacing = v.max(0.0);
    }
    if let Some(v) = parsed.margin {
        config.layout.margin = v.max(0.0);
    }
    if let Some(v) = parsed.order_passes {
        config.layout.order_passes = v;
    }

    if let Some(types) = parsed.connection_types {
        for (token, file) in types {
            let kind = ConnectionType::from_token(&token).ok_or(ConfigError::EmptyConnectionType)?;
            let mut style = config.connections.style(&kind);
            if let Some(v) = file.label {
                style.label = v;
            }
            if let Some(v) = file.color {
                style.color = color(&format!("connectionTypes.{token}.color"), v)?;
            }
            if let Some(v) = file.dash {
                style.dash = if v.trim().is_empty() { None } else { Some(v) };
            }
            if let Some(v) = file.animated {
                style.animated = v;
            }
            if let Some(v) = file.routing {
                style.routing = v;
            }
            config.connections.register(kind, style);
        }
    }

    config.render.background = config.theme.background.clone();

    Ok(config)
}

fn color(field: &str, value: String) -> Result<String, ConfigError> {
    if COLOR_RE.is_match(value.trim()) {
        Ok(value.trim().to_string())
    } else {
        Err(ConfigError::InvalidColor {
            field: field.to_string(),
            value,
        })
    }
}

fn positive(field: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.layout.direction, Direction::TopBottom);
        assert_eq!(config.layout.solver, SolverKind::Layered);
        assert_eq!(config.layout.node_width, 172.0);
        assert_eq!(config.connections, ConnectionTypeRegistry::default());
    }

    #[test]
    fn overlays_layout_and_connection_styles() {
        let config = parse_config(
            r##"{
                "direction": "LR",
                "solver": "dagre",
                "nodeSpacing": 30,
                "theme": "dark",
                "connectionTypes": {
                    "funds": { "color": "#ff0000", "routing": "step" },
                    "mentors": { "label": "Mentors", "dash": "1,3" }
                }
            }"##,
        )
        .unwrap();
        assert_eq!(config.layout.direction, Direction::LeftRight);
        assert_eq!(config.layout.solver, SolverKind::Dagre);
        assert_eq!(config.layout.node_spacing, 30.0);
        assert_eq!(config.render.background, Theme::dark().background);

        let funds = config.connections.style(&ConnectionType::Funds);
        assert_eq!(funds.color, "#ff0000");
        assert_eq!(funds.routing, Routing::Step);

        let mentors = ConnectionType::Custom("mentors".to_string());
        assert!(config.connections.contains(&mentors));
        assert_eq!(config.connections.style(&mentors).label, "Mentors");
    }

    #[test]
    fn rejects_invalid_colors() {
        let err = parse_config(r#"{"themeVariables": {"nodeFill": "blue"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidColor { .. }));
    }

    #[test]
    fn rejects_unknown_direction() {
        let err = parse_config(r#"{"direction": "RL"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDirection(ref d) if d == "RL"));
    }

    #[test]
    fn rejects_non_positive_node_size() {
        let err = parse_config(r#"{"nodeWidth": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositive { field: "nodeWidth", .. }));
    }
}
