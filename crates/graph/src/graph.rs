use crate::types::FlowEdge;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::cmp::Ordering;
use std::collections::HashMap;
use town_protocol::Category;

pub const DEFAULT_CHAIN_LENGTH: usize = 4;

/// In-memory view of one town's flow edges.
///
/// Built fresh from whatever the store returned; never written back.
pub struct FlowGraph {
    graph: DiGraph<Category, u64>,
    node_index: HashMap<Category, NodeIndex>,
}

impl FlowGraph {
    /// Build the graph from a set of edges.
    ///
    /// Self-loops are dropped. Repeated `(from, to)` pairs are merged by
    /// summing their weights.
    pub fn from_edges(edges: &[FlowEdge]) -> Self {
        let mut graph: DiGraph<Category, u64> = DiGraph::new();
        let mut node_index: HashMap<Category, NodeIndex> = HashMap::new();
        let mut edge_index: HashMap<(Category, Category), EdgeIndex> = HashMap::new();

        for edge in edges {
            if edge.from == edge.to {
                log::debug!("Skipping self-loop edge on {}", edge.from);
                continue;
            }
            let from = *node_index
                .entry(edge.from)
                .or_insert_with(|| graph.add_node(edge.from));
            let to = *node_index
                .entry(edge.to)
                .or_insert_with(|| graph.add_node(edge.to));

            match edge_index.get(&(edge.from, edge.to)) {
                Some(&idx) => graph[idx] = graph[idx].saturating_add(edge.weight),
                None => {
                    let idx = graph.add_edge(from, to, edge.weight);
                    edge_index.insert((edge.from, edge.to), idx);
                }
            }
        }

        Self { graph, node_index }
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All edges, heaviest first, ties broken by `from` then `to` name.
    pub fn ranked_edges(&self) -> Vec<FlowEdge> {
        let mut edges: Vec<FlowEdge> = self
            .graph
            .edge_references()
            .map(|e| FlowEdge::new(self.graph[e.source()], self.graph[e.target()], *e.weight()))
            .collect();
        edges.sort_by(rank_edges);
        edges
    }

    /// Greedy walk from the globally heaviest edge.
    ///
    /// Seeds with the heaviest edge, then repeatedly follows the heaviest
    /// outgoing edge from the chain's tail whose target is not already in
    /// the chain. Stops at `max_length` or when the tail has no unvisited
    /// successor. This is a single greedy walk, not a best-path search.
    pub fn derive_chain(&self, max_length: usize) -> Vec<Category> {
        let Some(seed) = self.ranked_edges().into_iter().next() else {
            return Vec::new();
        };

        let mut chain = vec![seed.from, seed.to];
        while chain.len() < max_length {
            let Some(&last) = chain.last() else { break };
            match self.heaviest_unvisited_successor(last, &chain) {
                Some(next) => chain.push(next),
                None => break,
            }
        }
        chain.truncate(max_length);
        chain
    }

    /// Heaviest outgoing destinations from `from`, at most `limit`.
    pub fn next_stops(&self, from: Category, limit: usize) -> Vec<FlowEdge> {
        let mut stops = self.outgoing(from);
        stops.sort_by(rank_edges);
        stops.truncate(limit);
        stops
    }

    fn heaviest_unvisited_successor(&self, from: Category, visited: &[Category]) -> Option<Category> {
        self.outgoing(from)
            .into_iter()
            .filter(|edge| !visited.contains(&edge.to))
            .min_by(rank_edges)
            .map(|edge| edge.to)
    }

    fn outgoing(&self, from: Category) -> Vec<FlowEdge> {
        let Some(&node) = self.node_index.get(&from) else {
            return Vec::new();
        };
        self.graph
            .edges(node)
            .map(|e| FlowEdge::new(from, self.graph[e.target()], *e.weight()))
            .collect()
    }
}

/// Weight descending, then lexical `from`, then lexical `to`.
fn rank_edges(a: &FlowEdge, b: &FlowEdge) -> Ordering {
    b.weight
        .cmp(&a.weight)
        .then_with(|| a.from.as_str().cmp(b.from.as_str()))
        .then_with(|| a.to.as_str().cmp(b.to.as_str()))
}

/// Derive the dominant local flow chain from a town's edges.
pub fn derive_chain(edges: &[FlowEdge], max_length: usize) -> Vec<Category> {
    FlowGraph::from_edges(edges).derive_chain(max_length)
}

/// Presentable chain copy, e.g. `"Coffee → Fitness → Retail"`.
///
/// Returns `None` for an empty chain; the caller picks the fallback text.
pub fn format_chain(chain: &[Category]) -> Option<String> {
    if chain.is_empty() {
        return None;
    }
    let labels: Vec<&str> = chain.iter().map(|c| c.label()).collect();
    Some(labels.join(" → "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use Category::*;

    #[test]
    fn empty_edges_yield_empty_chain() {
        assert!(derive_chain(&[], DEFAULT_CHAIN_LENGTH).is_empty());
        assert_eq!(format_chain(&[]), None);
    }

    #[test]
    fn follows_heaviest_path_from_seed() {
        let edges = [
            FlowEdge::new(Coffee, Fitness, 5),
            FlowEdge::new(Fitness, Retail, 3),
            FlowEdge::new(Coffee, Retail, 1),
        ];
        let chain = derive_chain(&edges, DEFAULT_CHAIN_LENGTH);
        assert_eq!(chain, vec![Coffee, Fitness, Retail]);
        assert_eq!(
            format_chain(&chain).as_deref(),
            Some("Coffee → Fitness → Retail")
        );
    }

    #[test]
    fn never_revisits_a_category() {
        let edges = [
            FlowEdge::new(Coffee, Fitness, 9),
            FlowEdge::new(Fitness, Coffee, 8),
            FlowEdge::new(Fitness, Food, 2),
            FlowEdge::new(Food, Coffee, 7),
        ];
        assert_eq!(derive_chain(&edges, 4), vec![Coffee, Fitness, Food]);
    }

    #[test]
    fn greedy_walk_is_not_best_path() {
        // Best total path would be Coffee → Food → Retail → Services, but
        // the walk takes the heaviest local step and dead-ends.
        let edges = [
            FlowEdge::new(Coffee, Fitness, 10),
            FlowEdge::new(Coffee, Food, 9),
            FlowEdge::new(Food, Retail, 9),
            FlowEdge::new(Retail, Services, 9),
        ];
        assert_eq!(derive_chain(&edges, 4), vec![Coffee, Fitness]);
    }

    #[test]
    fn ties_break_lexically() {
        let edges = [
            FlowEdge::new(Retail, Food, 4),
            FlowEdge::new(Coffee, Retail, 4),
            FlowEdge::new(Coffee, Beauty, 4),
        ];
        assert_eq!(derive_chain(&edges, 4), vec![Coffee, Beauty]);
    }

    #[test]
    fn respects_max_length() {
        let edges = [
            FlowEdge::new(Coffee, Fitness, 5),
            FlowEdge::new(Fitness, Retail, 4),
            FlowEdge::new(Retail, Food, 3),
            FlowEdge::new(Food, Services, 2),
        ];
        assert_eq!(derive_chain(&edges, 3), vec![Coffee, Fitness, Retail]);
        assert_eq!(derive_chain(&edges, 1), vec![Coffee]);
        assert!(derive_chain(&edges, 0).is_empty());
    }

    #[test]
    fn duplicate_pairs_are_merged() {
        let edges = [
            FlowEdge::new(Food, Retail, 2),
            FlowEdge::new(Coffee, Fitness, 3),
            FlowEdge::new(Food, Retail, 2),
        ];
        let graph = FlowGraph::from_edges(&edges);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.derive_chain(4), vec![Food, Retail]);
    }

    #[test]
    fn merged_weights_saturate() {
        let edges = [
            FlowEdge::new(Food, Retail, u64::MAX),
            FlowEdge::new(Food, Retail, 7),
        ];
        let graph = FlowGraph::from_edges(&edges);
        assert_eq!(graph.ranked_edges(), vec![FlowEdge::new(Food, Retail, u64::MAX)]);
    }

    #[test]
    fn self_loops_are_ignored() {
        let edges = [FlowEdge::new(Coffee, Coffee, 50), FlowEdge::new(Food, Retail, 1)];
        assert_eq!(derive_chain(&edges, 4), vec![Food, Retail]);
    }

    #[test]
    fn next_stops_are_ranked() {
        let edges = [
            FlowEdge::new(Coffee, Retail, 2),
            FlowEdge::new(Coffee, Fitness, 6),
            FlowEdge::new(Coffee, Beauty, 2),
            FlowEdge::new(Food, Coffee, 9),
        ];
        let graph = FlowGraph::from_edges(&edges);
        let stops: Vec<Category> = graph.next_stops(Coffee, 2).iter().map(|e| e.to).collect();
        assert_eq!(stops, vec![Fitness, Beauty]);
        assert!(graph.next_stops(Services, 3).is_empty());
    }
}
