use org_graph_engine::layout_dump::layout_dump_json;
use org_graph_engine::{
    Config, ConnectionType, Effect, GraphSession, InteractionEvent, OrgGraph, Reaction,
    parse_config, to_positioned, to_simplified,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_graph(graph_json: &str) -> Result<OrgGraph, JsValue> {
    let parsed: OrgGraph = serde_json::from_str(graph_json).map_err(js_error)?;
    Ok(to_simplified(&to_positioned(&parsed.nodes, &parsed.edges)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReactionReply {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    graph: Option<OrgGraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    anchor: Option<[f32; 2]>,
    /// Set when an edge id changed, so the owner can retarget its references.
    #[serde(skip_serializing_if = "Option::is_none")]
    edge_renamed: Option<EdgeRename>,
}

#[derive(Debug, Serialize)]
struct EdgeRename {
    from: String,
    to: String,
}

impl From<Reaction> for ReactionReply {
    fn from(reaction: Reaction) -> Self {
        let mut reply = ReactionReply {
            status: "unchanged",
            graph: None,
            rejection: None,
            anchor: None,
            edge_renamed: None,
        };
        match reaction {
            Reaction::Applied(mutation) => {
                reply.status = "applied";
                if let Effect::EdgeUpdated { from, to } = mutation.effect
                    && from != to
                {
                    reply.edge_renamed = Some(EdgeRename { from, to });
                }
                reply.graph = Some(mutation.graph);
            }
            Reaction::Rejected(rejection) => {
                reply.status = "rejected";
                reply.rejection = Some(format!("{rejection:?}"));
            }
            Reaction::AwaitingType(gesture) => {
                reply.status = "awaitingType";
                reply.anchor = Some([gesture.anchor.x, gesture.anchor.y]);
            }
            Reaction::Unchanged => {}
        }
        reply
    }
}

/// One interactive org chart widget.
#[wasm_bindgen]
pub struct OrgCanvas {
    session: GraphSession,
}

#[wasm_bindgen]
impl OrgCanvas {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<OrgCanvas, JsValue> {
        let config = match config_json {
            Some(raw) => parse_config(&raw).map_err(js_error)?,
            None => Config::default(),
        };
        Ok(OrgCanvas {
            session: GraphSession::new(&config),
        })
    }

    /// Positioned graph, style bindings, selection and pending gesture as JSON.
    pub fn view(&mut self, graph_json: &str) -> Result<String, JsValue> {
        let graph = parse_graph(graph_json)?;
        let view = self.session.view(&graph);
        layout_dump_json(&view).map_err(js_error)
    }

    pub fn handle(&mut self, graph_json: &str, event_json: &str) -> Result<String, JsValue> {
        let graph = parse_graph(graph_json)?;
        let event: InteractionEvent = serde_json::from_str(event_json).map_err(js_error)?;
        let reaction = self.session.handle(&graph, event).map_err(js_error)?;
        serde_json::to_string(&ReactionReply::from(reaction)).map_err(js_error)
    }

    #[wasm_bindgen(js_name = chooseType)]
    pub fn choose_type(&mut self, graph_json: &str, type_token: &str) -> Result<String, JsValue> {
        let graph = parse_graph(graph_json)?;
        let chosen = ConnectionType::from_token(type_token)
            .ok_or_else(|| js_error("connection type must not be empty"))?;
        let reaction = self
            .session
            .choose_connection_type(&graph, &chosen)
            .map_err(js_error)?;
        serde_json::to_string(&ReactionReply::from(reaction)).map_err(js_error)
    }

    #[wasm_bindgen(js_name = changeEdgeType)]
    pub fn change_edge_type(
        &mut self,
        graph_json: &str,
        edge_id: &str,
        type_token: &str,
    ) -> Result<String, JsValue> {
        let graph = parse_graph(graph_json)?;
        let chosen = ConnectionType::from_token(type_token)
            .ok_or_else(|| js_error("connection type must not be empty"))?;
        let reaction = self
            .session
            .change_edge_type(&graph, edge_id, &chosen)
            .map_err(js_error)?;
        serde_json::to_string(&ReactionReply::from(reaction)).map_err(js_error)
    }

    /// Returns whether a pending gesture was dropped.
    pub fn cancel(&mut self) -> bool {
        self.session.cancel_pending().is_some()
    }

    /// Connection type tokens in picker order.
    #[wasm_bindgen(js_name = connectionTypes)]
    pub fn connection_types(&self) -> Vec<String> {
        self.session
            .registry()
            .types()
            .map(|kind| kind.as_str().to_string())
            .collect()
    }
}
