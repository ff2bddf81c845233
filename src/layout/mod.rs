//! Incremental hierarchical layout.
//!
//! The [`LayoutCache`] owns the last solver result and the fingerprint it was
//! computed for. Every pass resolves a position for each node; the solver only
//! runs when the structural fingerprint changes.

mod fingerprint;
mod ranking;
mod solver;

use std::collections::{BTreeMap, BTreeSet};

pub use fingerprint::LayoutFingerprint;
pub use solver::{DagreSolver, LayeredSolver, LayoutEdge, LayoutSolver, Spacing, solver_for};

use crate::convert::PositionedGraph;
use crate::ir::{Direction, Position};

/// Report of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPass {
    pub fingerprint: LayoutFingerprint,
    pub recomputed: bool,
}

#[derive(Debug, Default)]
pub struct LayoutCache {
    fingerprint: Option<LayoutFingerprint>,
    positions: BTreeMap<String, Position>,
    solver_runs: usize,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `graph.nodes[*].position` in place.
    ///
    /// Resolution order per node: a supplied non-origin position, then the
    /// cached solver position, then the origin sentinel.
    pub fn resolve(
        &mut self,
        graph: &mut PositionedGraph,
        direction: Direction,
        solver: &dyn LayoutSolver,
    ) -> LayoutPass {
        let fingerprint = LayoutFingerprint::compute(graph, direction);
        let recomputed = self.fingerprint.as_ref() != Some(&fingerprint);

        if recomputed {
            let (node_ids, edges) = layout_inputs(graph);
            self.positions = solver.solve(&node_ids, &edges, direction);
            self.solver_runs += 1;
            self.fingerprint = Some(fingerprint.clone());
            tracing::debug!(
                nodes = node_ids.len(),
                edges = edges.len(),
                direction = direction.as_token(),
                "layout recomputed"
            );
        } else {
            tracing::trace!(nodes = graph.nodes.len(), "layout cache reused");
        }

        for node in &mut graph.nodes {
            node.position = match node.supplied_position.filter(|pos| !pos.is_origin()) {
                Some(manual) => manual,
                None => self
                    .positions
                    .get(&node.id)
                    .copied()
                    .unwrap_or(Position::ORIGIN),
            };
        }

        LayoutPass {
            fingerprint,
            recomputed,
        }
    }

    /// Forces the next pass to run the solver.
    pub fn invalidate(&mut self) {
        self.fingerprint = None;
    }

    pub fn fingerprint(&self) -> Option<&LayoutFingerprint> {
        self.fingerprint.as_ref()
    }

    /// Number of solver invocations since construction.
    pub fn solver_runs(&self) -> usize {
        self.solver_runs
    }
}

/// Solver input in canonical order, carrying exactly the fingerprint's content.
///
/// The solver breaks ties by input order, so feeding it the owner's order
/// would let two graphs with one fingerprint lay out differently.
fn layout_inputs(graph: &PositionedGraph) -> (Vec<String>, Vec<LayoutEdge>) {
    let node_ids: BTreeSet<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
    let pairs: BTreeSet<(&str, &str)> = graph
        .edges
        .iter()
        .map(|edge| (edge.source.as_str(), edge.target.as_str()))
        .collect();
    (
        node_ids.into_iter().map(str::to_string).collect(),
        pairs
            .into_iter()
            .map(|(source, target)| LayoutEdge::new(source, target))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::convert::to_positioned;
    use crate::ir::{ConnectionType, Edge, Node};
    use std::cell::Cell;

    /// Wraps the layered solver and counts calls.
    struct CountingSolver {
        inner: LayeredSolver,
        calls: Cell<usize>,
    }

    impl CountingSolver {
        fn new() -> Self {
            Self {
                inner: LayeredSolver::new(&LayoutConfig::default()),
                calls: Cell::new(0),
            }
        }
    }

    impl LayoutSolver for CountingSolver {
        fn solve(
            &self,
            node_ids: &[String],
            edges: &[LayoutEdge],
            direction: Direction,
        ) -> BTreeMap<String, Position> {
            self.calls.set(self.calls.get() + 1);
            self.inner.solve(node_ids, edges, direction)
        }
    }

    fn org() -> (Vec<Node>, Vec<Edge>) {
        (
            vec![Node::new("ceo", "CEO"), Node::new("cto", "CTO"), Node::new("cfo", "CFO")],
            vec![
                Edge::new("ceo", "cto", ConnectionType::ReportsTo),
                Edge::new("ceo", "cfo", ConnectionType::ReportsTo),
            ],
        )
    }

    #[test]
    fn second_pass_with_same_structure_reuses_positions() {
        let (nodes, edges) = org();
        let solver = CountingSolver::new();
        let mut cache = LayoutCache::new();

        let mut first = to_positioned(&nodes, &edges);
        let pass = cache.resolve(&mut first, Direction::TopBottom, &solver);
        assert!(pass.recomputed);

        let mut second = to_positioned(&nodes, &edges);
        let pass = cache.resolve(&mut second, Direction::TopBottom, &solver);
        assert!(!pass.recomputed);
        assert_eq!(first, second);
        assert_eq!(solver.calls.get(), 1);
        assert_eq!(cache.solver_runs(), 1);
    }

    #[test]
    fn label_edits_and_drags_do_not_recompute() {
        let (mut nodes, edges) = org();
        let solver = CountingSolver::new();
        let mut cache = LayoutCache::new();
        cache.resolve(&mut to_positioned(&nodes, &edges), Direction::TopBottom, &solver);

        nodes[1].label = "Chief Technology Officer".to_string();
        nodes[1].description = Some("Engineering".to_string());
        nodes[2].member_count = Some(14);
        nodes[2].position = Some(Position::new(500.0, 300.0));
        let mut graph = to_positioned(&nodes, &edges);
        let pass = cache.resolve(&mut graph, Direction::TopBottom, &solver);

        assert!(!pass.recomputed);
        assert_eq!(solver.calls.get(), 1);
        assert_eq!(graph.node("cfo").map(|n| n.position), Some(Position::new(500.0, 300.0)));
    }

    #[test]
    fn new_edge_or_direction_recomputes() {
        let (nodes, mut edges) = org();
        let solver = CountingSolver::new();
        let mut cache = LayoutCache::new();
        cache.resolve(&mut to_positioned(&nodes, &edges), Direction::TopBottom, &solver);

        edges.push(Edge::new("cto", "cfo", ConnectionType::Collaborates));
        cache.resolve(&mut to_positioned(&nodes, &edges), Direction::TopBottom, &solver);
        assert_eq!(solver.calls.get(), 2);

        cache.resolve(&mut to_positioned(&nodes, &edges), Direction::LeftRight, &solver);
        assert_eq!(solver.calls.get(), 3);
    }

    #[test]
    fn origin_supplied_position_falls_back_to_solver() {
        let (mut nodes, edges) = org();
        nodes[0].position = Some(Position::ORIGIN);
        let solver = CountingSolver::new();
        let mut cache = LayoutCache::new();
        let mut graph = to_positioned(&nodes, &edges);
        cache.resolve(&mut graph, Direction::TopBottom, &solver);

        let expected = solver.inner.solve(
            &["ceo".to_string(), "cfo".to_string(), "cto".to_string()],
            &[LayoutEdge::new("ceo", "cfo"), LayoutEdge::new("ceo", "cto")],
            Direction::TopBottom,
        );
        assert_eq!(graph.node("ceo").map(|n| n.position), expected.get("ceo").copied());
    }

    #[test]
    fn emptied_graph_resolves_without_positions() {
        let solver = CountingSolver::new();
        let mut cache = LayoutCache::new();
        let (nodes, edges) = org();
        cache.resolve(&mut to_positioned(&nodes, &edges), Direction::TopBottom, &solver);

        let mut empty = PositionedGraph::default();
        let pass = cache.resolve(&mut empty, Direction::TopBottom, &solver);
        assert!(pass.recomputed);
        assert!(pass.fingerprint.is_structurally_empty());
        assert!(empty.nodes.is_empty());
    }

    #[test]
    fn reordered_graph_lays_out_like_a_cold_cache() {
        let nodes = vec![Node::new("a", "A"), Node::new("b", "B"), Node::new("c", "C")];
        let mut reversed = nodes.clone();
        reversed.reverse();
        let solver = CountingSolver::new();

        let mut warm = LayoutCache::new();
        warm.resolve(&mut to_positioned(&nodes, &[]), Direction::TopBottom, &solver);
        let mut warm_graph = to_positioned(&reversed, &[]);
        let pass = warm.resolve(&mut warm_graph, Direction::TopBottom, &solver);
        assert!(!pass.recomputed);

        let mut cold_graph = to_positioned(&reversed, &[]);
        LayoutCache::new().resolve(&mut cold_graph, Direction::TopBottom, &solver);
        assert_eq!(warm_graph, cold_graph);
    }

    #[test]
    fn invalidate_forces_a_recompute() {
        let (nodes, edges) = org();
        let solver = CountingSolver::new();
        let mut cache = LayoutCache::new();
        cache.resolve(&mut to_positioned(&nodes, &edges), Direction::TopBottom, &solver);
        cache.invalidate();
        let pass = cache.resolve(&mut to_positioned(&nodes, &edges), Direction::TopBottom, &solver);
        assert!(pass.recomputed);
        assert_eq!(cache.solver_runs(), 2);
    }
}
