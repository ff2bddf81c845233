use std::path::Path;

use org_graph_engine::render::render_svg;
use org_graph_engine::text_metrics::TextMeasurer;
use org_graph_engine::{
    CanvasView, Config, ConnectionType, Direction, Edge, GraphSession, InteractionEvent, Node,
    OrgGraph, Position, Reaction, Rejection, parse_config, to_positioned, to_simplified,
};

fn load_fixture(name: &str) -> OrgGraph {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("org")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    let parsed: OrgGraph = serde_json::from_str(&input).expect("fixture parse failed");
    to_simplified(&to_positioned(&parsed.nodes, &parsed.edges))
}

fn chain() -> OrgGraph {
    OrgGraph {
        nodes: vec![
            Node::new("a", "A"),
            Node::new("b", "B"),
            Node::new("c", "C"),
            Node::new("d", "D"),
        ],
        edges: vec![
            Edge::new("a", "b", ConnectionType::ReportsTo),
            Edge::new("b", "c", ConnectionType::ReportsTo),
            Edge::new("d", "b", ConnectionType::Collaborates),
        ],
    }
}

fn positions(view: &CanvasView) -> Vec<(String, Position)> {
    view.graph
        .nodes
        .iter()
        .map(|node| (node.id.clone(), node.position))
        .collect()
}

fn overlaps(a: Position, b: Position, config: &Config) -> bool {
    (a.x - b.x).abs() < config.layout.node_width && (a.y - b.y).abs() < config.layout.node_height
}

#[test]
fn lay_out_all_fixtures() {
    let config = Config::default();
    for name in ["leadership.json", "cyclic.json", "islands.json", "empty.json"] {
        let graph = load_fixture(name);
        let mut session = GraphSession::new(&config);
        let view = session.view(&graph);
        assert_eq!(view.graph.nodes.len(), graph.nodes.len(), "{name}: node count");

        let auto: Vec<&Position> = view
            .graph
            .nodes
            .iter()
            .filter(|node| node.supplied_position.is_none_or(|pos| pos.is_origin()))
            .map(|node| &node.position)
            .collect();
        for (i, a) in auto.iter().enumerate() {
            assert!(!a.is_origin(), "{name}: node left at origin");
            for b in &auto[i + 1..] {
                assert!(!overlaps(**a, **b, &config), "{name}: overlapping nodes");
            }
        }

        let mut fresh = GraphSession::new(&config);
        assert_eq!(positions(&view), positions(&fresh.view(&graph)), "{name}: nondeterministic");

        let svg = render_svg(&view, &config, &mut TextMeasurer::fallback_only());
        assert!(svg.contains("<svg"), "{name}: missing <svg tag");
        assert!(svg.contains("</svg>"), "{name}: missing </svg tag");
    }
}

#[test]
fn manual_positions_win_over_layout() {
    let graph = load_fixture("islands.json");
    let mut session = GraphSession::new(&Config::default());
    let view = session.view(&graph);
    assert_eq!(
        view.graph.node("guild").map(|n| n.position),
        Some(Position::new(900.0, 40.0))
    );
}

#[test]
fn repeated_views_reuse_the_cached_layout() {
    let graph = load_fixture("leadership.json");
    let mut session = GraphSession::new(&Config::default());
    let first = session.view(&graph);
    let second = session.view(&graph.clone());
    assert!(first.pass.recomputed);
    assert!(!second.pass.recomputed);
    assert_eq!(positions(&first), positions(&second));
    assert_eq!(session.layout_cache().solver_runs(), 1);
}

#[test]
fn cosmetic_changes_do_not_trigger_layout() {
    let mut graph = load_fixture("leadership.json");
    let mut session = GraphSession::new(&Config::default());
    let before = session.view(&graph).pass.fingerprint;

    graph = session
        .edit_node(&graph, "cfo", "Finance & Legal", Some("Treasury"))
        .unwrap()
        .commit(graph);
    graph = session
        .handle(
            &graph,
            InteractionEvent::DragEnd {
                node_id: "it".into(),
                position: Position::new(640.0, 300.0),
            },
        )
        .unwrap()
        .commit(graph);
    session
        .handle(&graph, InteractionEvent::NodeClick { node_id: "eng".into() })
        .unwrap();
    graph.nodes[0].member_count = Some(2);

    let view = session.view(&graph);
    assert_eq!(view.pass.fingerprint, before);
    assert!(!view.pass.recomputed);
    assert_eq!(session.layout_cache().solver_runs(), 1);
    assert_eq!(view.graph.node("it").map(|n| n.position), Some(Position::new(640.0, 300.0)));
}

#[test]
fn structural_and_direction_changes_recompute() {
    let graph = chain();
    let mut session = GraphSession::new(&Config::default());
    let tb = session.view(&graph);

    let next = session.add_child(&graph, "c", "E", None).unwrap().commit(graph.clone());
    assert!(session.view(&next).pass.recomputed);

    session.set_direction(Direction::LeftRight);
    let lr = session.view(&graph);
    assert!(lr.pass.recomputed);
    assert_ne!(positions(&tb), positions(&lr));
    assert_eq!(session.layout_cache().solver_runs(), 3);
}

#[test]
fn duplicate_connection_leaves_edges_unchanged() {
    let graph = chain();
    let mut session = GraphSession::new(&Config::default());
    let reaction = session
        .handle(
            &graph,
            InteractionEvent::Connect {
                source: "a".into(),
                target: "b".into(),
                anchor: Position::new(12.0, 8.0),
            },
        )
        .unwrap();
    assert!(matches!(reaction, Reaction::AwaitingType(_)));

    let reaction = session
        .choose_connection_type(&graph, &ConnectionType::ReportsTo)
        .unwrap();
    assert_eq!(reaction, Reaction::Rejected(Rejection::DuplicateEdge));
    assert_eq!(reaction.commit(graph.clone()).edges, graph.edges);
    assert!(session.pending().is_none());
}

#[test]
fn parallel_edges_of_different_types_are_allowed() {
    let graph = chain();
    let mut session = GraphSession::new(&Config::default());
    session
        .handle(
            &graph,
            InteractionEvent::Connect {
                source: "a".into(),
                target: "b".into(),
                anchor: Position::default(),
            },
        )
        .unwrap();
    let next = session
        .choose_connection_type(&graph, &ConnectionType::Funds)
        .unwrap()
        .commit(graph.clone());
    assert_eq!(next.edges.len(), graph.edges.len() + 1);
}

#[test]
fn self_loop_never_becomes_pending() {
    let graph = chain();
    let mut session = GraphSession::new(&Config::default());
    let reaction = session
        .handle(
            &graph,
            InteractionEvent::Connect {
                source: "a".into(),
                target: "a".into(),
                anchor: Position::default(),
            },
        )
        .unwrap();
    assert_eq!(reaction, Reaction::Rejected(Rejection::SelfLoop));
    assert!(session.pending().is_none());
    assert_eq!(
        session
            .choose_connection_type(&graph, &ConnectionType::ReportsTo)
            .unwrap(),
        Reaction::Rejected(Rejection::NoPendingGesture)
    );
}

#[test]
fn delete_branch_removes_descendants_and_their_edges() {
    let graph = chain();
    let mut session = GraphSession::new(&Config::default());
    let next = session.delete_branch(&graph, "a").unwrap().commit(graph);
    let ids: Vec<&str> = next.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["d"]);
    assert!(next.edges.is_empty());
}

#[test]
fn delete_node_keeps_orphaned_children() {
    let graph = chain();
    let mut session = GraphSession::new(&Config::default());
    let next = session.delete_node(&graph, "b").unwrap().commit(graph);
    let ids: Vec<&str> = next.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c", "d"]);
    assert!(next.edges.is_empty());
}

#[test]
fn reconnect_keeps_the_relationship_type() {
    let graph = OrgGraph {
        nodes: vec![Node::new("a", "A"), Node::new("b", "B"), Node::new("c", "C")],
        edges: vec![Edge::new("a", "b", ConnectionType::Funds)],
    };
    let mut session = GraphSession::new(&Config::default());
    session
        .handle(&graph, InteractionEvent::EdgeClick { edge_id: "e-a-b-funds".into() })
        .unwrap();
    session
        .handle(
            &graph,
            InteractionEvent::Reconnect {
                edge_id: "e-a-b-funds".into(),
                source: "a".into(),
                target: "c".into(),
                anchor: Position::default(),
            },
        )
        .unwrap();
    let suggested = session
        .pending()
        .and_then(|gesture| gesture.suggested_type())
        .cloned()
        .expect("reconnect suggests the current type");
    let next = session
        .choose_connection_type(&graph, &suggested)
        .unwrap()
        .commit(graph);

    assert_eq!(next.edges.len(), 1);
    assert!(next.has_edge("a", "c", &ConnectionType::Funds));
    assert_eq!(session.selection().edge.as_deref(), Some("e-a-c-funds"));

    let view = session.view(&next);
    assert_eq!(
        view.styles.get("funds").map(|style| style.color.as_str()),
        Some("#F59E0B")
    );
}

#[test]
fn only_one_gesture_is_ever_pending() {
    let graph = chain();
    let mut session = GraphSession::new(&Config::default());
    for (source, target) in [("a", "c"), ("d", "a")] {
        session
            .handle(
                &graph,
                InteractionEvent::Connect {
                    source: source.into(),
                    target: target.into(),
                    anchor: Position::default(),
                },
            )
            .unwrap();
    }
    let pending = session.pending().expect("one gesture pending");
    assert_eq!((pending.source.as_str(), pending.target.as_str()), ("d", "a"));

    let next = session
        .choose_connection_type(&graph, &ConnectionType::Advises)
        .unwrap()
        .commit(graph.clone());
    assert_eq!(next.edges.len(), graph.edges.len() + 1);
    assert!(!next.has_edge("a", "c", &ConnectionType::Advises));
}

#[test]
fn conversion_round_trips_canonical_records() {
    let graph = load_fixture("leadership.json");
    let mut with_position = graph.clone();
    with_position.nodes[2].position = Some(Position::new(10.0, 20.0));
    let back = to_simplified(&to_positioned(&with_position.nodes, &with_position.edges));
    assert_eq!(back, with_position);
}

#[test]
fn stale_ids_surface_as_errors_and_leave_graph_alone() {
    let graph = chain();
    let mut session = GraphSession::new(&Config::default());
    assert!(session.add_child(&graph, "ghost", "X", None).is_err());
    assert!(session.delete_edge(&graph, "e-x-y-funds").is_err());
    assert!(
        session
            .change_edge_type(&graph, "e-x-y-funds", &ConnectionType::Advises)
            .is_err()
    );
}

#[test]
fn dagre_solver_handles_cycles() {
    let config = parse_config(r#"{"solver":"dagre","direction":"LR"}"#).unwrap();
    let graph = load_fixture("cyclic.json");
    let mut session = GraphSession::new(&config);
    let view = session.view(&graph);
    assert_eq!(view.direction, Direction::LeftRight);
    assert!(view.graph.nodes.iter().all(|node| !node.position.is_origin()));
}

#[test]
fn sessions_are_isolated() {
    let graph = chain();
    let mut left = GraphSession::new(&Config::default());
    let mut right = GraphSession::new(&Config::default());
    left.handle(
        &graph,
        InteractionEvent::Connect {
            source: "a".into(),
            target: "c".into(),
            anchor: Position::default(),
        },
    )
    .unwrap();
    left.view(&graph);
    assert!(right.pending().is_none());
    assert!(right.view(&graph).pass.recomputed);
}

#[test]
fn node_order_does_not_change_a_cached_layout() {
    let ordered = OrgGraph {
        nodes: vec![Node::new("a", "A"), Node::new("b", "B"), Node::new("c", "C")],
        edges: Vec::new(),
    };
    let mut reversed = ordered.clone();
    reversed.nodes.reverse();

    let mut warm = GraphSession::new(&Config::default());
    warm.view(&ordered);
    let warm_view = warm.view(&reversed);
    assert!(!warm_view.pass.recomputed);

    let mut cold = GraphSession::new(&Config::default());
    assert_eq!(positions(&warm_view), positions(&cold.view(&reversed)));
}

#[test]
fn generated_ids_keep_connections_distinct() {
    let graph = OrgGraph {
        nodes: vec![Node::new("a", "A"), Node::new("b", "B"), Node::new("b-c", "BC")],
        edges: vec![Edge::new("a", "b", ConnectionType::ReportsTo)],
    };
    let mut session = GraphSession::new(&Config::default());
    let graph = session.add_child(&graph, "b", "Ops", None).unwrap().commit(graph);
    let child = graph.nodes[3].id.clone();
    session
        .handle(
            &graph,
            InteractionEvent::Connect {
                source: child.clone(),
                target: "a".into(),
                anchor: Position::default(),
            },
        )
        .unwrap();
    let graph = session
        .choose_connection_type(&graph, &ConnectionType::Advises)
        .unwrap()
        .commit(graph);

    let mut ids: Vec<&str> = graph.edges.iter().map(|edge| edge.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), graph.edges.len());

    let added = graph.edges[2].id.clone();
    let next = session.delete_edge(&graph, &added).unwrap().commit(graph.clone());
    assert!(!next.has_edge(&child, "a", &ConnectionType::Advises));
    assert!(next.has_edge("b", &child, &ConnectionType::ReportsTo));
}
