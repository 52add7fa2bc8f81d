//! Dependency graph structure and cycle guard.
//!
//! Edges point from predecessor to successor. Tasks live in a flat arena and
//! are referred to by index; ids are mapped to indices once per snapshot.

use crate::types::{DependencyEdge, Task};
use eyre::Result;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// The graph contains at least one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleDetected {
    /// Tasks that could not be ordered (members of, or downstream of, a cycle)
    pub task_ids: Vec<String>,
}

impl fmt::Display for CycleDetected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dependency graph contains a cycle among: {}", self.task_ids.join(", "))
    }
}

impl std::error::Error for CycleDetected {}

/// Check whether adding `predecessor_id -> successor_id` would close a cycle.
///
/// Breadth-first search from the successor along existing successor links;
/// the edge is rejected if the predecessor is reachable. The candidate edge
/// must not be visible through `successors_of`.
pub fn would_create_cycle<F>(predecessor_id: &str, successor_id: &str, mut successors_of: F) -> Result<bool>
where
    F: FnMut(&str) -> Result<Vec<String>>,
{
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    visited.insert(successor_id.to_string());
    queue.push_back(successor_id.to_string());

    while let Some(node) = queue.pop_front() {
        if node == predecessor_id {
            log::debug!(
                "Cycle guard: {} reaches {} after {} node(s)",
                successor_id,
                predecessor_id,
                visited.len()
            );
            return Ok(true);
        }
        for next in successors_of(&node)? {
            if visited.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }

    Ok(false)
}

/// Adjacency-list view of one project's tasks and edges.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    successors: Vec<Vec<(usize, i64)>>,
    predecessors: Vec<Vec<(usize, i64)>>,
}

impl DependencyGraph {
    /// Create a graph with the given nodes and no edges.
    pub fn new<'a>(task_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut graph = Self::default();
        for id in task_ids {
            graph.add_node(id);
        }
        graph
    }

    /// Build from a snapshot. Edges with an endpoint outside `tasks` are skipped.
    pub fn from_snapshot(tasks: &[Task], edges: &[DependencyEdge]) -> Self {
        let mut graph = Self::new(tasks.iter().map(|t| t.id.as_str()));
        for edge in edges {
            if !graph.add_edge(&edge.predecessor_id, &edge.successor_id, edge.lag_days) {
                log::warn!(
                    "Skipping dependency {} ({} -> {}): endpoint not in task set",
                    edge.id,
                    edge.predecessor_id,
                    edge.successor_id
                );
            }
        }
        graph
    }

    /// Add a node; returns its index. Adding an existing id is a no-op.
    pub fn add_node(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.ids.len();
        self.ids.push(id.to_string());
        self.index.insert(id.to_string(), idx);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        idx
    }

    /// Add an edge between two known nodes. Returns false if either is unknown.
    pub fn add_edge(&mut self, predecessor_id: &str, successor_id: &str, lag_days: i64) -> bool {
        let (Some(&from), Some(&to)) = (self.index.get(predecessor_id), self.index.get(successor_id)) else {
            return false;
        };
        self.successors[from].push((to, lag_days));
        self.predecessors[to].push((from, lag_days));
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id(&self, idx: usize) -> &str {
        &self.ids[idx]
    }

    /// Outgoing links as (successor index, lag days).
    pub fn successors(&self, idx: usize) -> &[(usize, i64)] {
        &self.successors[idx]
    }

    /// Incoming links as (predecessor index, lag days).
    pub fn predecessors(&self, idx: usize) -> &[(usize, i64)] {
        &self.predecessors[idx]
    }

    /// Same check as [`would_create_cycle`], against this in-memory graph.
    pub fn would_create_cycle(&self, predecessor_id: &str, successor_id: &str) -> bool {
        would_create_cycle(predecessor_id, successor_id, |id| {
            Ok(self
                .index_of(id)
                .map(|idx| self.successors(idx).iter().map(|&(s, _)| self.id(s).to_string()).collect())
                .unwrap_or_default())
        })
        .unwrap_or(true)
    }

    /// Topological order via Kahn's algorithm.
    ///
    /// Ties are broken by insertion order, so the result is deterministic for
    /// a given snapshot.
    pub fn topological_order(&self) -> Result<Vec<usize>, CycleDetected> {
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(|p| p.len()).collect();

        let mut queue: VecDeque<usize> = (0..self.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(self.len());

        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            for &(succ, _) in &self.successors[idx] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    queue.push_back(succ);
                }
            }
        }

        if order.len() != self.len() {
            let task_ids = (0..self.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.ids[i].clone())
                .collect();
            return Err(CycleDetected { task_ids });
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(edges: &[(&str, &str)]) -> impl FnMut(&str) -> Result<Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in edges {
            map.entry(from.to_string()).or_default().push(to.to_string());
        }
        move |id: &str| Ok(map.get(id).cloned().unwrap_or_default())
    }

    #[test]
    fn test_no_cycle_on_empty_graph() {
        assert!(!would_create_cycle("a", "b", lookup(&[])).unwrap());
    }

    #[test]
    fn test_direct_back_edge_is_cycle() {
        // a -> b exists, adding b -> a closes a loop
        assert!(would_create_cycle("b", "a", lookup(&[("a", "b")])).unwrap());
    }

    #[test]
    fn test_transitive_back_edge_is_cycle() {
        let edges = [("a", "b"), ("b", "c"), ("c", "d")];
        assert!(would_create_cycle("d", "a", lookup(&edges)).unwrap());
        assert!(!would_create_cycle("a", "d", lookup(&edges)).unwrap());
    }

    #[test]
    fn test_diamond_is_not_cycle() {
        let edges = [("a", "b"), ("a", "c"), ("b", "d")];
        assert!(!would_create_cycle("c", "d", lookup(&edges)).unwrap());
    }

    #[test]
    fn test_self_loop_is_cycle() {
        assert!(would_create_cycle("a", "a", lookup(&[])).unwrap());
    }

    #[test]
    fn test_lookup_errors_propagate() {
        let result = would_create_cycle("a", "b", |_| Err(eyre::eyre!("storage down")));
        assert!(result.is_err());
    }

    #[test]
    fn test_topological_order_respects_edges() {
        let mut graph = DependencyGraph::new(["d", "c", "b", "a"]);
        graph.add_edge("a", "b", 0);
        graph.add_edge("a", "c", 0);
        graph.add_edge("b", "d", 0);
        graph.add_edge("c", "d", 0);

        let order = graph.topological_order().unwrap();
        let pos: HashMap<&str, usize> = order.iter().enumerate().map(|(i, &n)| (graph.id(n), i)).collect();
        assert!(pos["a"] < pos["b"]);
        assert!(pos["a"] < pos["c"]);
        assert!(pos["b"] < pos["d"]);
        assert!(pos["c"] < pos["d"]);
    }

    #[test]
    fn test_topological_order_ties_follow_insertion() {
        let graph = DependencyGraph::new(["x", "y", "z"]);
        let order: Vec<&str> = graph.topological_order().unwrap().into_iter().map(|i| graph.id(i)).collect();
        assert_eq!(order, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_topological_order_reports_cycle() {
        let mut graph = DependencyGraph::new(["a", "b", "c", "free"]);
        graph.add_edge("a", "b", 0);
        graph.add_edge("b", "c", 0);
        graph.add_edge("c", "a", 0);

        let err = graph.topological_order().unwrap_err();
        assert_eq!(err.task_ids, vec!["a", "b", "c"]);
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_add_edge_unknown_endpoint() {
        let mut graph = DependencyGraph::new(["a"]);
        assert!(!graph.add_edge("a", "missing", 0));
        assert!(graph.successors(0).is_empty());
    }

    #[test]
    fn test_in_memory_cycle_check() {
        let mut graph = DependencyGraph::new(["a", "b", "c"]);
        graph.add_edge("a", "b", 0);
        graph.add_edge("b", "c", 0);
        assert!(graph.would_create_cycle("c", "a"));
        assert!(!graph.would_create_cycle("a", "c"));
    }
}
