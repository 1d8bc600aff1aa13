//! DependencyGraph - DAG of declared graph entries
//!
//! Performance notes:
//! - NodeId wraps an interned Arc<str>, so cloning ids is O(1)
//! - FxHashMap for faster hashing (non-crypto)
//! - SmallVec for stack-allocated small dependency lists (0-4 items)
//!
//! Validation:
//! - Cycle detection using DFS three-color algorithm
//! - Topological order (Kahn) with declaration order as tie-break

use std::collections::{BTreeSet, VecDeque};

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::SkyError;
use crate::output::{Dependencies, NodeId};

/// Stack-allocated deps: most entries have 0-4 dependencies
pub type DepVec = SmallVec<[NodeId; 4]>;

/// Edges point from an upstream entry to the entries consuming it
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// id -> entries that depend on it
    successors: FxHashMap<NodeId, DepVec>,
    /// id -> entries it depends on
    predecessors: FxHashMap<NodeId, DepVec>,
    /// All ids in declaration order
    node_ids: Vec<NodeId>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (NodeId, Dependencies)>) -> Self {
        let mut graph = Self::new();
        for (id, deps) in entries {
            graph.add_node(id, &deps);
        }
        graph
    }

    /// Add an entry and the edges from each of its dependencies
    pub fn add_node(&mut self, id: NodeId, dependencies: &Dependencies) {
        if !self.predecessors.contains_key(&id) {
            self.node_ids.push(id.clone());
        }
        self.successors.entry(id.clone()).or_default();
        let preds = self.predecessors.entry(id.clone()).or_default();
        for dep in dependencies.iter() {
            if !preds.contains(dep) {
                preds.push(dep.clone());
            }
        }
        for dep in dependencies.iter() {
            let succ = self.successors.entry(dep.clone()).or_default();
            if !succ.contains(&id) {
                succ.push(id.clone());
            }
        }
    }

    pub fn get_dependencies(&self, id: &str) -> &[NodeId] {
        static EMPTY: &[NodeId] = &[];
        self.predecessors.get(id).map_or(EMPTY, SmallVec::as_slice)
    }

    pub fn get_successors(&self, id: &str) -> &[NodeId] {
        static EMPTY: &[NodeId] = &[];
        self.successors.get(id).map_or(EMPTY, SmallVec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Check if there's a path from `from` to `to` (BFS)
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }

        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(from);
        visited.insert(from);

        while let Some(current) = queue.pop_front() {
            for neighbor in self.get_successors(current) {
                if neighbor.as_str() == to {
                    return true;
                }
                if visited.insert(neighbor.as_str()) {
                    queue.push_back(neighbor.as_str());
                }
            }
        }

        false
    }

    /// Detect cycles using DFS with three-color marking.
    ///
    /// - White: unvisited
    /// - Gray: on the current DFS path
    /// - Black: fully processed
    ///
    /// Reaching a Gray entry closes a cycle, reported as `a → b → a`.
    pub fn detect_cycles(&self) -> Result<(), SkyError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn dfs(
            node: &NodeId,
            graph: &DependencyGraph,
            colors: &mut FxHashMap<NodeId, Color>,
            stack: &mut Vec<NodeId>,
        ) -> Result<(), String> {
            colors.insert(node.clone(), Color::Gray);
            stack.push(node.clone());

            for neighbor in graph.get_successors(node.as_str()) {
                match colors.get(neighbor).copied() {
                    Some(Color::Gray) => {
                        let start = stack.iter().position(|x| x == neighbor).unwrap_or(0);
                        let cycle: Vec<&str> = stack[start..].iter().map(NodeId::as_str).collect();
                        return Err(format!("{} → {}", cycle.join(" → "), neighbor));
                    }
                    Some(Color::White) | None => dfs(neighbor, graph, colors, stack)?,
                    Some(Color::Black) => {}
                }
            }

            stack.pop();
            colors.insert(node.clone(), Color::Black);
            Ok(())
        }

        let mut colors: FxHashMap<NodeId, Color> = self
            .node_ids
            .iter()
            .map(|id| (id.clone(), Color::White))
            .collect();
        let mut stack = Vec::new();

        for id in &self.node_ids {
            if colors.get(id) == Some(&Color::White) {
                dfs(id, self, &mut colors, &mut stack)
                    .map_err(|cycle| SkyError::CycleDetected { cycle })?;
            }
        }
        Ok(())
    }

    /// Entries ordered so every entry comes after its dependencies.
    ///
    /// Among entries ready at the same time, declaration order wins, so the
    /// result is deterministic.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, SkyError> {
        self.detect_cycles()?;

        let index: FxHashMap<&NodeId, usize> =
            self.node_ids.iter().enumerate().map(|(i, id)| (id, i)).collect();
        let mut in_degree: Vec<usize> = self
            .node_ids
            .iter()
            .map(|id| {
                self.get_dependencies(id.as_str())
                    .iter()
                    .filter(|dep| index.contains_key(dep))
                    .count()
            })
            .collect();

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.node_ids.len());

        while let Some(i) = ready.pop_first() {
            let id = &self.node_ids[i];
            order.push(id.clone());
            for succ in self.get_successors(id.as_str()) {
                if let Some(&j) = index.get(succ) {
                    in_degree[j] -= 1;
                    if in_degree[j] == 0 {
                        ready.insert(j);
                    }
                }
            }
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(names: &[&str]) -> Dependencies {
        names.iter().map(|n| NodeId::new(n)).collect()
    }

    fn graph(entries: &[(&str, &[&str])]) -> DependencyGraph {
        DependencyGraph::from_entries(
            entries
                .iter()
                .map(|(id, d)| (NodeId::new(id), deps(d))),
        )
    }

    fn names(ids: &[NodeId]) -> Vec<&str> {
        ids.iter().map(NodeId::as_str).collect()
    }

    // ═══════════════════════════════════════════════════════════════
    // CYCLE DETECTION
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn detect_cycle_simple() {
        let g = graph(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"])]);
        let err = g.detect_cycles().unwrap_err();
        assert!(err.to_string().contains("SKY-020"));
        assert!(err.to_string().contains("a → b → c → a"));
    }

    #[test]
    fn self_loop_is_cycle() {
        let g = graph(&[("a", &["a"])]);
        assert!(g.detect_cycles().is_err());
        assert!(g.topological_order().is_err());
    }

    #[test]
    fn diamond_has_no_cycle() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["a"]), ("d", &["b", "c"])]);
        assert!(g.detect_cycles().is_ok());
        assert!(g.has_path("a", "d"));
        assert!(!g.has_path("d", "a"));
        assert!(!g.has_path("b", "c"));
    }

    // ═══════════════════════════════════════════════════════════════
    // ORDERING
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn topological_order_respects_edges() {
        let g = graph(&[
            ("service", &["binding"]),
            ("rg", &[]),
            ("binding", &["cluster"]),
            ("cluster", &["rg"]),
        ]);
        assert_eq!(
            names(&g.topological_order().unwrap()),
            vec!["rg", "cluster", "binding", "service"]
        );
    }

    #[test]
    fn independent_entries_keep_declaration_order() {
        let g = graph(&[("zeta", &[]), ("alpha", &[]), ("mid", &[])]);
        assert_eq!(names(&g.topological_order().unwrap()), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn repeated_add_does_not_duplicate() {
        let mut g = DependencyGraph::new();
        g.add_node(NodeId::new("a"), &Dependencies::none());
        g.add_node(NodeId::new("b"), &deps(&["a"]));
        g.add_node(NodeId::new("b"), &deps(&["a"]));
        assert_eq!(g.len(), 2);
        assert_eq!(g.get_successors("a").len(), 1);
    }
}
