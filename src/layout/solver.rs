use std::collections::{BTreeMap, HashSet};

use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};

use super::ranking::{Component, assign_ranks, order_buckets, rank_buckets, split_components};
use crate::config::{LayoutConfig, SolverKind};
use crate::ir::{Direction, Position};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutEdge {
    pub source: String,
    pub target: String,
}

impl LayoutEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Hierarchical layout solver.
///
/// Implementations must be pure functions of their inputs, return a position
/// (top-left corner of the node box) for every distinct id in `node_ids`,
/// accept empty input, and never fail on cyclic or disconnected graphs.
pub trait LayoutSolver {
    fn solve(
        &self,
        node_ids: &[String],
        edges: &[LayoutEdge],
        direction: Direction,
    ) -> BTreeMap<String, Position>;
}

/// Node box size and spacing shared by the built-in solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spacing {
    pub node_width: f32,
    pub node_height: f32,
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub component_spacing: f32,
    pub margin: f32,
}

impl From<&LayoutConfig> for Spacing {
    fn from(config: &LayoutConfig) -> Self {
        Self {
            node_width: config.node_width,
            node_height: config.node_height,
            node_spacing: config.node_spacing,
            rank_spacing: config.rank_spacing,
            component_spacing: config.component_spacing,
            margin: config.margin,
        }
    }
}

impl Spacing {
    /// Node extent along the rank axis and across it.
    fn extents(&self, direction: Direction) -> (f32, f32) {
        match direction {
            Direction::TopBottom => (self.node_height, self.node_width),
            Direction::LeftRight => (self.node_width, self.node_height),
        }
    }
}

/// Built-in layered (Sugiyama style) solver.
#[derive(Debug, Clone)]
pub struct LayeredSolver {
    pub spacing: Spacing,
    pub order_passes: usize,
}

impl LayeredSolver {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            spacing: Spacing::from(config),
            order_passes: config.order_passes,
        }
    }

    /// Positions in rank/cross coordinates, cross axis centered per bucket.
    fn place_component(&self, component: &Component, direction: Direction) -> Vec<(f32, f32)> {
        let ranks = assign_ranks(component);
        let mut buckets = rank_buckets(&ranks);
        order_buckets(&mut buckets, component, self.order_passes);

        let (rank_extent, cross_extent) = self.spacing.extents(direction);
        let bucket_width = |len: usize| {
            len as f32 * cross_extent + len.saturating_sub(1) as f32 * self.spacing.node_spacing
        };
        let widest = buckets
            .iter()
            .map(|bucket| bucket_width(bucket.len()))
            .fold(0.0f32, f32::max);

        let mut placed = vec![(0.0f32, 0.0f32); component.ids.len()];
        for (rank, bucket) in buckets.iter().enumerate() {
            let main = rank as f32 * (rank_extent + self.spacing.rank_spacing);
            let offset = (widest - bucket_width(bucket.len())) / 2.0;
            for (slot, idx) in bucket.iter().enumerate() {
                let cross = offset + slot as f32 * (cross_extent + self.spacing.node_spacing);
                placed[*idx] = (main, cross);
            }
        }
        placed
    }
}

impl LayoutSolver for LayeredSolver {
    fn solve(
        &self,
        node_ids: &[String],
        edges: &[LayoutEdge],
        direction: Direction,
    ) -> BTreeMap<String, Position> {
        let components = split_components(node_ids, edges);
        let placed: Vec<Vec<(f32, f32)>> = components
            .iter()
            .map(|component| self.place_component(component, direction))
            .collect();
        pack_components(&components, &placed, direction, &self.spacing)
    }
}

/// Solver backed by the dagre port, run per component and packed like
/// [`LayeredSolver`].
#[derive(Debug, Clone)]
pub struct DagreSolver {
    pub spacing: Spacing,
}

impl DagreSolver {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            spacing: Spacing::from(config),
        }
    }

    fn place_component(&self, component: &Component, direction: Direction) -> Vec<(f32, f32)> {
        let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
            DagreGraph::new(Some(GraphOption {
                directed: Some(true),
                multigraph: Some(false),
                compound: Some(false),
            }));

        let mut graph_config = DagreConfig::default();
        graph_config.rankdir = Some(dagre_rankdir(direction).to_string());
        graph_config.nodesep = Some(self.spacing.node_spacing);
        graph_config.ranksep = Some(self.spacing.rank_spacing);
        graph_config.marginx = Some(0.0);
        graph_config.marginy = Some(0.0);
        dagre_graph.set_graph(graph_config);

        for id in &component.ids {
            let mut node = DagreNode::default();
            node.width = self.spacing.node_width;
            node.height = self.spacing.node_height;
            dagre_graph.set_node(id.clone(), Some(node));
        }

        // Dagre only ever sees a DAG: back edges are reversed, same-rank edges dropped.
        let ranks = assign_ranks(component);
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        for (from, to) in component.edge_pairs() {
            let (from, to) = match ranks[from].cmp(&ranks[to]) {
                std::cmp::Ordering::Less => (from, to),
                std::cmp::Ordering::Greater => (to, from),
                std::cmp::Ordering::Equal => continue,
            };
            if !seen.insert((from, to)) {
                continue;
            }
            let edge_label = DagreEdge::default();
            let _ = dagre_graph.set_edge(
                &component.ids[from],
                &component.ids[to],
                Some(edge_label),
                None,
            );
        }

        dagre_layout::run_layout(&mut dagre_graph);

        let mut corners: Vec<(f32, f32)> = Vec::with_capacity(component.ids.len());
        for id in &component.ids {
            let (x, y) = match dagre_graph.node(id) {
                Some(node) => (
                    node.x - self.spacing.node_width / 2.0,
                    node.y - self.spacing.node_height / 2.0,
                ),
                None => (0.0, 0.0),
            };
            corners.push((x, y));
        }

        let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
        let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
        corners
            .into_iter()
            .map(|(x, y)| {
                let (x, y) = (x - min_x, y - min_y);
                match direction {
                    Direction::TopBottom => (y, x),
                    Direction::LeftRight => (x, y),
                }
            })
            .collect()
    }
}

impl LayoutSolver for DagreSolver {
    fn solve(
        &self,
        node_ids: &[String],
        edges: &[LayoutEdge],
        direction: Direction,
    ) -> BTreeMap<String, Position> {
        let components = split_components(node_ids, edges);
        let placed: Vec<Vec<(f32, f32)>> = components
            .iter()
            .map(|component| self.place_component(component, direction))
            .collect();
        pack_components(&components, &placed, direction, &self.spacing)
    }
}

/// Builds the solver selected in `config`.
pub fn solver_for(config: &LayoutConfig) -> Box<dyn LayoutSolver> {
    match config.solver {
        SolverKind::Layered => Box::new(LayeredSolver::new(config)),
        SolverKind::Dagre => Box::new(DagreSolver::new(config)),
    }
}

fn dagre_rankdir(direction: Direction) -> &'static str {
    match direction {
        Direction::TopBottom => "tb",
        Direction::LeftRight => "lr",
    }
}

/// Lays components side by side along the cross axis.
///
/// `placed` holds (rank, cross) coordinates per component node, already
/// normalised so the component starts at zero on both axes.
fn pack_components(
    components: &[Component],
    placed: &[Vec<(f32, f32)>],
    direction: Direction,
    spacing: &Spacing,
) -> BTreeMap<String, Position> {
    let (_, cross_extent) = spacing.extents(direction);
    let mut positions = BTreeMap::new();
    let mut cursor = 0.0f32;

    for (component, coords) in components.iter().zip(placed) {
        let span = coords
            .iter()
            .map(|(_, cross)| cross + cross_extent)
            .fold(0.0f32, f32::max);
        for (id, (main, cross)) in component.ids.iter().zip(coords) {
            let main = main + spacing.margin;
            let cross = cross + cursor + spacing.margin;
            let position = match direction {
                Direction::TopBottom => Position::new(cross, main),
                Direction::LeftRight => Position::new(main, cross),
            };
            positions.insert(id.clone(), position);
        }
        cursor += span + spacing.component_spacing;
    }

    positions
}
