//! Column order for result tables.
//!
//! The order starts at a specific, low fan-out node and walks outward along
//! edges, so the columns read as a chain away from a concrete entity.

use std::collections::{HashMap, HashSet};

use crate::QueryGraph;

/// Number of edge endpoints touching each node id. A self loop counts twice.
pub fn incident_edge_counts(graph: &QueryGraph) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for edge in graph.edges.values() {
        *counts.entry(edge.subject.as_str()).or_insert(0) += 1;
        *counts.entry(edge.object.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Picks the node that anchors the ordering.
///
/// Connected pinned nodes win over connected unpinned ones; within a group the
/// node with the fewest incident edges wins and equal counts go to the node
/// declared first. A graph without edges starts at its first node.
pub fn find_starting_node(graph: &QueryGraph) -> Option<&str> {
    let counts = incident_edge_counts(graph);
    let least_connected = |pinned: bool| {
        graph
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, (_, node))| node.is_pinned() == pinned)
            .filter_map(|(index, (id, _))| counts.get(id).map(|count| (*count, index, id)))
            .min_by_key(|(count, index, _)| (*count, *index))
            .map(|(_, _, id)| id)
    };

    least_connected(true)
        .or_else(|| least_connected(false))
        .or_else(|| graph.nodes.keys().next())
}

/// Depth-first order from `start`, followed by every node the walk did not
/// reach, in declaration order.
///
/// Edges are scanned in declaration order and an edge's object is tried
/// before its subject. Endpoints that are not declared nodes are skipped.
pub fn sort_nodes<'a>(graph: &'a QueryGraph, start: &'a str) -> Vec<&'a str> {
    let mut order = Vec::with_capacity(graph.nodes.len());
    let mut visited = HashSet::with_capacity(graph.nodes.len());
    if graph.nodes.contains_key(start) {
        visit_connected(graph, start, &mut order, &mut visited);
    }
    order.extend(graph.nodes.keys().filter(|id| !visited.contains(id)));
    order
}

/// Starting node plus traversal; empty for a graph without nodes.
pub fn ordered_nodes(graph: &QueryGraph) -> Vec<&str> {
    match find_starting_node(graph) {
        Some(start) => sort_nodes(graph, start),
        None => Vec::new(),
    }
}

/// Candidate next nodes per node id: for each touching edge in declaration
/// order, its object and then its subject.
fn neighbour_index(graph: &QueryGraph) -> HashMap<&str, Vec<&str>> {
    let mut index: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in graph.edges.values() {
        let endpoints = [edge.object.as_str(), edge.subject.as_str()];
        index.entry(edge.subject.as_str()).or_default().extend(endpoints);
        if edge.object != edge.subject {
            index.entry(edge.object.as_str()).or_default().extend(endpoints);
        }
    }
    index
}

// Explicit stack of (node, next candidate); query graphs can be arbitrarily deep.
fn visit_connected<'a>(
    graph: &'a QueryGraph,
    start: &'a str,
    order: &mut Vec<&'a str>,
    visited: &mut HashSet<&'a str>,
) {
    let neighbours = neighbour_index(graph);
    visited.insert(start);
    order.push(start);
    let mut stack = vec![(start, 0usize)];
    while let Some((node, next)) = stack.last_mut() {
        let Some(candidate) = neighbours
            .get(*node)
            .and_then(|candidates| candidates.get(*next))
            .copied()
        else {
            stack.pop();
            continue;
        };
        *next += 1;
        if visited.contains(candidate) || !graph.nodes.contains_key(candidate) {
            continue;
        }
        visited.insert(candidate);
        order.push(candidate);
        stack.push((candidate, 0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QEdge, QNode};

    fn pinned(id: &str) -> QNode {
        QNode {
            ids: Some(vec![id.to_string()]),
            ..QNode::default()
        }
    }

    #[test]
    fn empty_graph_has_no_start() {
        let graph = QueryGraph::new();
        assert_eq!(find_starting_node(&graph), None);
        assert!(ordered_nodes(&graph).is_empty());
    }

    #[test]
    fn edgeless_graph_starts_at_first_declared_node() {
        let graph = QueryGraph::new()
            .with_node("b", QNode::default())
            .with_node("a", pinned("MONDO:1"))
            .with_node("c", QNode::default());
        assert_eq!(find_starting_node(&graph), Some("b"));
        assert_eq!(ordered_nodes(&graph), vec!["b", "a", "c"]);
    }

    #[test]
    fn pinned_node_wins_over_less_connected_unpinned_node() {
        // hub has degree 3, leaf degree 1 and pinned; x/y are unpinned leaves.
        let graph = QueryGraph::new()
            .with_node("x", QNode::default())
            .with_node("hub", QNode::default())
            .with_node("leaf", pinned("CHEBI:1"))
            .with_node("y", QNode::default())
            .with_edge("e0", QEdge::new("x", "hub"))
            .with_edge("e1", QEdge::new("hub", "leaf"))
            .with_edge("e2", QEdge::new("y", "hub"));
        assert_eq!(find_starting_node(&graph), Some("leaf"));
    }

    #[test]
    fn pinned_node_of_degree_one_beats_pinned_hub() {
        let graph = QueryGraph::new()
            .with_node("hub", pinned("MONDO:1"))
            .with_node("a", QNode::default())
            .with_node("b", QNode::default())
            .with_node("leaf", pinned("CHEBI:1"))
            .with_edge("e0", QEdge::new("hub", "a"))
            .with_edge("e1", QEdge::new("hub", "b"))
            .with_edge("e2", QEdge::new("leaf", "hub"));
        assert_eq!(find_starting_node(&graph), Some("leaf"));
    }

    #[test]
    fn ties_go_to_the_first_declared_node() {
        let graph = QueryGraph::new()
            .with_node("n0", QNode::default())
            .with_node("n1", QNode::default())
            .with_edge("e0", QEdge::new("n1", "n0"));
        assert_eq!(find_starting_node(&graph), Some("n0"));
    }

    #[test]
    fn disconnected_pinned_node_does_not_anchor() {
        let graph = QueryGraph::new()
            .with_node("lonely", pinned("MONDO:1"))
            .with_node("n1", QNode::default())
            .with_node("n2", QNode::default())
            .with_edge("e0", QEdge::new("n1", "n2"));
        assert_eq!(find_starting_node(&graph), Some("n1"));
        assert_eq!(ordered_nodes(&graph), vec!["n1", "n2", "lonely"]);
    }

    #[test]
    fn walk_is_depth_first_and_appends_detached_nodes_in_declaration_order() {
        let graph = QueryGraph::new()
            .with_node("d1", QNode::default())
            .with_node("start", pinned("MONDO:1"))
            .with_node("mid", QNode::default())
            .with_node("side", QNode::default())
            .with_node("deep", QNode::default())
            .with_node("d2", QNode::default())
            .with_edge("e0", QEdge::new("start", "mid"))
            .with_edge("e1", QEdge::new("side", "start"))
            .with_edge("e2", QEdge::new("mid", "deep"));
        assert_eq!(
            sort_nodes(&graph, "start"),
            vec!["start", "mid", "deep", "side", "d1", "d2"]
        );
    }

    #[test]
    fn cycles_visit_each_node_once() {
        let graph = QueryGraph::new()
            .with_node("a", QNode::default())
            .with_node("b", QNode::default())
            .with_node("c", QNode::default())
            .with_edge("e0", QEdge::new("a", "b"))
            .with_edge("e1", QEdge::new("b", "c"))
            .with_edge("e2", QEdge::new("c", "a"))
            .with_edge("loop", QEdge::new("b", "b"));
        let before = graph.clone();
        let order = ordered_nodes(&graph);
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(graph, before);
    }

    #[test]
    fn long_chain_is_walked_on_a_small_stack() {
        const LENGTH: usize = 30_000;
        let ids = (0..LENGTH).map(|index| format!("n{index}")).collect::<Vec<_>>();
        let mut graph = QueryGraph::new();
        for id in &ids {
            graph = graph.with_node(id.clone(), QNode::default());
        }
        for pair in ids.windows(2) {
            graph = graph.with_edge(format!("e_{}", pair[0]), QEdge::new(&pair[0], &pair[1]));
        }

        let order = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || {
                ordered_nodes(&graph)
                    .into_iter()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .expect("walker thread should start")
            .join()
            .expect("walk should not overflow the stack");
        assert_eq!(order, ids);
    }

    #[test]
    fn self_loop_counts_both_endpoints() {
        let graph = QueryGraph::new()
            .with_node("a", QNode::default())
            .with_edge("loop", QEdge::new("a", "a"));
        assert_eq!(incident_edge_counts(&graph).get("a"), Some(&2));
    }
}
