//! Item relationship graph
//!
//! Edges point from parent item to child item. Cycles are tolerated: the
//! closure walks keep a visited set and parent traversal stops at the first
//! repeated item.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet};

use super::ItemName;

/// Parent/child graph over dictionary items
#[derive(Debug, Clone, Default)]
pub struct ItemGraph {
    graph: DiGraph<ItemName, ()>,
    node_indices: HashMap<ItemName, NodeIndex>,
}

impl ItemGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, item: &ItemName) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(item) {
            return idx;
        }
        let idx = self.graph.add_node(item.clone());
        self.node_indices.insert(item.clone(), idx);
        idx
    }

    /// Record that `child` refers to `parent`
    pub fn add_link(&mut self, parent: &ItemName, child: &ItemName) {
        let p = self.node(parent);
        let c = self.node(child);
        if self.graph.find_edge(p, c).is_none() {
            self.graph.add_edge(p, c, ());
        }
    }

    pub fn item_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn neighbors_sorted(&self, item: &ItemName, direction: Direction) -> Vec<ItemName> {
        let Some(&idx) = self.node_indices.get(item) else {
            return Vec::new();
        };
        let set: BTreeSet<ItemName> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect();
        set.into_iter().collect()
    }

    /// Direct children, sorted
    pub fn children(&self, item: &ItemName) -> Vec<ItemName> {
        self.neighbors_sorted(item, Direction::Outgoing)
    }

    /// Direct parents, sorted
    pub fn parents(&self, item: &ItemName) -> Vec<ItemName> {
        self.neighbors_sorted(item, Direction::Incoming)
    }

    /// Transitive children, sorted; the start item is never included
    pub fn descendants(&self, item: &ItemName) -> Vec<ItemName> {
        let Some(&start_idx) = self.node_indices.get(item) else {
            return Vec::new();
        };

        let mut result = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![start_idx];

        while let Some(node_idx) = stack.pop() {
            if !visited.insert(node_idx) {
                continue;
            }
            if node_idx != start_idx {
                if let Some(node) = self.graph.node_weight(node_idx) {
                    result.insert(node.clone());
                }
            }
            for next in self.graph.neighbors_directed(node_idx, Direction::Outgoing) {
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
        }

        result.into_iter().collect()
    }

    /// Follow first parents (self links ignored) until an item has none
    pub fn ultimate_parent(&self, item: &ItemName) -> ItemName {
        let mut current = item.clone();
        let mut seen = HashSet::new();
        seen.insert(current.clone());

        loop {
            let next = self
                .parents(&current)
                .into_iter()
                .find(|p| p != &current);
            match next {
                Some(p) if seen.insert(p.clone()) => current = p,
                _ => return current,
            }
        }
    }
}
