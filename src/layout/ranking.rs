use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use super::solver::LayoutEdge;

/// One weakly-connected cluster, with node indices local to the cluster.
///
/// Node order follows the order the ids were handed to the solver, which is
/// also the tie-break order for ranking and crossing reduction.
#[derive(Debug, Clone)]
pub(super) struct Component {
    pub ids: Vec<String>,
    pub succ: Vec<Vec<usize>>,
    pub pred: Vec<Vec<usize>>,
}

impl Component {
    pub fn edge_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.succ
            .iter()
            .enumerate()
            .flat_map(|(from, nexts)| nexts.iter().map(move |to| (from, *to)))
    }
}

/// Splits the input into weakly-connected components.
///
/// Self loops, duplicate pairs and edges touching unknown ids are dropped.
pub(super) fn split_components(node_ids: &[String], edges: &[LayoutEdge]) -> Vec<Component> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut unique_ids: Vec<&str> = Vec::with_capacity(node_ids.len());
    for id in node_ids {
        if !index.contains_key(id.as_str()) {
            index.insert(id.as_str(), unique_ids.len());
            unique_ids.push(id.as_str());
        }
    }

    let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
    for edge in edges {
        let (Some(&from), Some(&to)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) else {
            continue;
        };
        if from != to {
            pairs.insert((from, to));
        }
    }

    let mut parent: Vec<usize> = (0..unique_ids.len()).collect();
    fn root(parent: &mut [usize], mut node: usize) -> usize {
        while parent[node] != node {
            parent[node] = parent[parent[node]];
            node = parent[node];
        }
        node
    }
    for &(from, to) in &pairs {
        let a = root(&mut parent, from);
        let b = root(&mut parent, to);
        if a != b {
            // Lower index wins so the component keeps its earliest node as root.
            let (keep, merge) = if a < b { (a, b) } else { (b, a) };
            parent[merge] = keep;
        }
    }

    let mut component_of_root: HashMap<usize, usize> = HashMap::new();
    let mut local_index: Vec<usize> = vec![0; unique_ids.len()];
    let mut components: Vec<Component> = Vec::new();
    for (global, id) in unique_ids.iter().enumerate() {
        let root_idx = root(&mut parent, global);
        let slot = *component_of_root.entry(root_idx).or_insert_with(|| {
            components.push(Component {
                ids: Vec::new(),
                succ: Vec::new(),
                pred: Vec::new(),
            });
            components.len() - 1
        });
        let component = &mut components[slot];
        local_index[global] = component.ids.len();
        component.ids.push(id.to_string());
        component.succ.push(Vec::new());
        component.pred.push(Vec::new());
    }

    for (from, to) in pairs {
        let slot = component_of_root[&root(&mut parent, from)];
        let (from, to) = (local_index[from], local_index[to]);
        components[slot].succ[from].push(to);
        components[slot].pred[to].push(from);
    }

    components
}

/// Longest-path ranks over an acyclic ordering of the component.
///
/// Nodes become ready in input order; when every remaining node sits on a
/// cycle the earliest one is forced out and its incoming edges become back
/// edges, which are ignored for ranking.
pub(super) fn assign_ranks(component: &Component) -> Vec<usize> {
    let count = component.ids.len();
    let mut indeg: Vec<usize> = component.pred.iter().map(Vec::len).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = (0..count)
        .filter(|idx| indeg[*idx] == 0)
        .map(Reverse)
        .collect();
    let mut placed = vec![false; count];
    let mut order: Vec<usize> = Vec::with_capacity(count);

    while order.len() < count {
        let next = match ready.pop() {
            Some(Reverse(idx)) => idx,
            None => match (0..count).find(|idx| !placed[*idx]) {
                Some(idx) => idx,
                None => break,
            },
        };
        if placed[next] {
            continue;
        }
        placed[next] = true;
        order.push(next);
        for &succ in &component.succ[next] {
            if placed[succ] {
                continue;
            }
            indeg[succ] = indeg[succ].saturating_sub(1);
            if indeg[succ] == 0 {
                ready.push(Reverse(succ));
            }
        }
    }

    let mut position = vec![0usize; count];
    for (pos, idx) in order.iter().enumerate() {
        position[*idx] = pos;
    }

    let mut ranks = vec![0usize; count];
    for &node in &order {
        for &succ in &component.succ[node] {
            if position[succ] > position[node] {
                ranks[succ] = ranks[succ].max(ranks[node] + 1);
            }
        }
    }
    ranks
}

/// Groups nodes by rank, each bucket in input order.
pub(super) fn rank_buckets(ranks: &[usize]) -> Vec<Vec<usize>> {
    let depth = ranks.iter().copied().max().map(|max| max + 1).unwrap_or(0);
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); depth];
    for (idx, rank) in ranks.iter().enumerate() {
        buckets[*rank].push(idx);
    }
    buckets
}

/// Median-heuristic crossing reduction: downward sweeps order by parents,
/// upward sweeps order by children.
pub(super) fn order_buckets(buckets: &mut [Vec<usize>], component: &Component, passes: usize) {
    if buckets.len() <= 1 {
        return;
    }
    let mut slot = vec![0usize; component.ids.len()];
    let refresh = |buckets: &[Vec<usize>], slot: &mut [usize]| {
        for bucket in buckets {
            for (pos, idx) in bucket.iter().enumerate() {
                slot[*idx] = pos;
            }
        }
    };
    refresh(buckets, &mut slot);

    for _ in 0..passes.max(1) {
        for rank in 1..buckets.len() {
            sort_by_median(&mut buckets[rank], &component.pred, &slot);
            refresh(buckets, &mut slot);
        }
        for rank in (0..buckets.len() - 1).rev() {
            sort_by_median(&mut buckets[rank], &component.succ, &slot);
            refresh(buckets, &mut slot);
        }
    }
}

fn sort_by_median(bucket: &mut [usize], neighbors: &[Vec<usize>], slot: &[usize]) {
    if bucket.len() <= 1 {
        return;
    }
    let scores: HashMap<usize, f32> = bucket
        .iter()
        .map(|idx| (*idx, median_slot(*idx, neighbors, slot)))
        .collect();
    bucket.sort_by(|a, b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(Ordering::Equal)
            .then_with(|| slot[*a].cmp(&slot[*b]))
            .then_with(|| a.cmp(b))
    });
}

fn median_slot(node: usize, neighbors: &[Vec<usize>], slot: &[usize]) -> f32 {
    let mut values: Vec<usize> = neighbors[node].iter().map(|n| slot[*n]).collect();
    if values.is_empty() {
        return slot[node] as f32;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid] as f32
    } else {
        (values[mid - 1] + values[mid]) as f32 * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|id| id.to_string()).collect()
    }

    fn edges(list: &[(&str, &str)]) -> Vec<LayoutEdge> {
        list.iter()
            .map(|(s, t)| LayoutEdge::new(*s, *t))
            .collect()
    }

    #[test]
    fn splits_disconnected_clusters_in_input_order() {
        let components = split_components(
            &ids(&["x", "a", "b", "y", "c"]),
            &edges(&[("a", "b"), ("y", "x"), ("ghost", "c"), ("c", "c")]),
        );
        let groups: Vec<Vec<&str>> = components
            .iter()
            .map(|c| c.ids.iter().map(String::as_str).collect())
            .collect();
        assert_eq!(groups, vec![vec!["x", "y"], vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn chain_ranks_increase() {
        let components =
            split_components(&ids(&["a", "b", "c"]), &edges(&[("a", "b"), ("b", "c")]));
        assert_eq!(assign_ranks(&components[0]), vec![0, 1, 2]);
    }

    #[test]
    fn cycles_are_broken_at_the_earliest_node() {
        let components = split_components(
            &ids(&["a", "b", "c"]),
            &edges(&[("a", "b"), ("b", "c"), ("c", "a")]),
        );
        assert_eq!(assign_ranks(&components[0]), vec![0, 1, 2]);
    }

    #[test]
    fn longest_path_wins() {
        let components = split_components(
            &ids(&["a", "b", "c"]),
            &edges(&[("a", "c"), ("a", "b"), ("b", "c")]),
        );
        assert_eq!(assign_ranks(&components[0]), vec![0, 1, 2]);
    }

    #[test]
    fn median_ordering_uncrosses_children() {
        // p1 -> c2, p2 -> c1 with children declared in crossing order.
        let components = split_components(
            &ids(&["root", "p1", "p2", "c1", "c2"]),
            &edges(&[("root", "p1"), ("root", "p2"), ("p1", "c2"), ("p2", "c1")]),
        );
        let component = &components[0];
        let ranks = assign_ranks(component);
        let mut buckets = rank_buckets(&ranks);
        order_buckets(&mut buckets, component, 2);
        let names: Vec<&str> = buckets[2]
            .iter()
            .map(|idx| component.ids[*idx].as_str())
            .collect();
        assert_eq!(names, vec!["c2", "c1"]);
    }
}
