use crate::connection::ConnectionTypeStyle;
use crate::convert::{PositionedEdge, PositionedNode};
use crate::negotiator::GestureKind;
use crate::session::{CanvasView, Selection};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Serializable snapshot of one canvas frame.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump<'a> {
    pub direction: &'static str,
    pub fingerprint: &'a str,
    pub recomputed: bool,
    pub nodes: &'a [PositionedNode],
    pub edges: &'a [PositionedEdge],
    pub styles: &'a BTreeMap<String, ConnectionTypeStyle>,
    pub selection: &'a Selection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingDump<'a>>,
}

#[derive(Debug, Serialize)]
pub struct PendingDump<'a> {
    pub source: &'a str,
    pub target: &'a str,
    #[serde(rename = "edgeId", skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<&'a str>,
}

impl<'a> LayoutDump<'a> {
    pub fn from_view(view: &'a CanvasView) -> Self {
        let pending = view.pending.as_ref().map(|gesture| PendingDump {
            source: &gesture.source,
            target: &gesture.target,
            edge_id: match &gesture.kind {
                GestureKind::Connect => None,
                GestureKind::Reconnect { edge_id, .. } => Some(edge_id.as_str()),
            },
        });
        LayoutDump {
            direction: view.direction.as_token(),
            fingerprint: view.pass.fingerprint.as_str(),
            recomputed: view.pass.recomputed,
            nodes: &view.graph.nodes,
            edges: &view.graph.edges,
            styles: &view.styles,
            selection: &view.selection,
            pending,
        }
    }
}

pub fn layout_dump_json(view: &CanvasView) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&LayoutDump::from_view(view))
}

pub fn write_layout_dump(path: Option<&Path>, view: &CanvasView) -> anyhow::Result<()> {
    let dump = LayoutDump::from_view(view);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => println!("{}", serde_json::to_string_pretty(&dump)?),
    }
    Ok(())
}
