use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub node_fill: String,
    pub node_border: String,
    pub node_text: String,
    pub secondary_text: String,
    pub selection_color: String,
    pub background: String,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            node_fill: "#FFFFFF".to_string(),
            node_border: "#CBD5E1".to_string(),
            node_text: "#0F172A".to_string(),
            secondary_text: "#64748B".to_string(),
            selection_color: "#2563EB".to_string(),
            background: "#F8FAFC".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            node_fill: "#1E293B".to_string(),
            node_border: "#334155".to_string(),
            node_text: "#F1F5F9".to_string(),
            secondary_text: "#94A3B8".to_string(),
            selection_color: "#60A5FA".to_string(),
            background: "#0F172A".to_string(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" | "light" => Some(Self::light()),
            "dark" => Some(Self::dark()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}
