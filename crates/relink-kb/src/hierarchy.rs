//! Directed concept hierarchy over KB identifiers.
//!
//! Edges run (parent, child): an edge means the child is a direct
//! specialization of the parent. The graph is built once at load time and
//! treated as read-only for the rest of the run. Candidate degrees, the
//! relatedness checks of the link policies, and the intrinsic
//! information-content prior all read from here.

use ahash::{AHashMap, AHashSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::VecDeque;

#[derive(Debug, Default, Clone)]
pub struct HierarchyGraph {
    graph: DiGraph<String, ()>,
    id_to_node: AHashMap<String, NodeIndex>,
}

impl HierarchyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a (parent, child) edge list, collapsing duplicates.
    pub fn from_edges<I, S>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let mut graph = Self::new();
        for (parent, child) in edges {
            graph.add_edge(parent.as_ref(), child.as_ref());
        }
        graph
    }

    fn node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.id_to_node.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.id_to_node.insert(id.to_string(), idx);
        idx
    }

    /// Insert an edge parent → child unless it already exists.
    pub fn add_edge(&mut self, parent: &str, child: &str) {
        let parent_idx = self.node(parent);
        let child_idx = self.node(child);
        if !self.graph.contains_edge(parent_idx, child_idx) {
            self.graph.add_edge(parent_idx, child_idx, ());
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_node.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of direct parents; 0 when the id is absent.
    pub fn in_degree(&self, id: &str) -> usize {
        self.id_to_node
            .get(id)
            .map(|&idx| self.graph.edges_directed(idx, Direction::Incoming).count())
            .unwrap_or(0)
    }

    /// Number of direct children; 0 when the id is absent.
    pub fn out_degree(&self, id: &str) -> usize {
        self.id_to_node
            .get(id)
            .map(|&idx| self.graph.edges_directed(idx, Direction::Outgoing).count())
            .unwrap_or(0)
    }

    /// Direct edge parent → child present?
    pub fn has_edge(&self, parent: &str, child: &str) -> bool {
        match (self.id_to_node.get(parent), self.id_to_node.get(child)) {
            (Some(&p), Some(&c)) => self.graph.contains_edge(p, c),
            _ => false,
        }
    }

    pub fn parents(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.id_to_node.get(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|p| self.graph[p].as_str())
            .collect()
    }

    /// All transitive ancestors of `id` (empty when absent).
    pub fn ancestors(&self, id: &str) -> AHashSet<&str> {
        self.walk(id, Direction::Incoming)
    }

    /// All transitive descendants of `id` (empty when absent).
    pub fn descendants(&self, id: &str) -> AHashSet<&str> {
        self.walk(id, Direction::Outgoing)
    }

    /// Transitive descendant count, or None when the id is not in the graph.
    pub fn descendant_count(&self, id: &str) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        Some(self.descendants(id).len())
    }

    fn walk(&self, id: &str, direction: Direction) -> AHashSet<&str> {
        let mut reached = AHashSet::new();
        let Some(&start) = self.id_to_node.get(id) else {
            return reached;
        };

        let mut visited: AHashSet<NodeIndex> = AHashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited.insert(start);

        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors_directed(current, direction) {
                if visited.insert(next) {
                    reached.insert(self.graph[next].as_str());
                    queue.push_back(next);
                }
            }
        }

        reached
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|idx| self.graph[idx].as_str())
    }

    /// (parent, child) pairs for persistence, in insertion order.
    pub fn edge_list(&self) -> Vec<(&str, &str)> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(p, c)| (self.graph[p].as_str(), self.graph[c].as_str()))
            .collect()
    }
}
