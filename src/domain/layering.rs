//! Sibling ordering and layer assignment.
//!
//! Siblings are compared by the edges between their subtrees. Because the
//! pairwise rules are not transitive once cycles appear, the order is built
//! by repeated selection instead of a comparison sort: the next sibling is
//! the smallest one not dominated by any remaining sibling.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, instrument, trace};

use crate::domain::arena::{DependencyTree, NodeId};

/// Edge counts between the subtrees of one sibling group.
///
/// `count(i, j)` is the number of dependencies of sibling `i` that point
/// into the subtree rooted at sibling `j`.
#[derive(Debug, Clone)]
pub struct SiblingEdges {
    siblings: Vec<NodeId>,
    counts: Vec<Vec<usize>>,
}

impl SiblingEdges {
    pub fn new(tree: &DependencyTree, siblings: &[NodeId]) -> Self {
        let mut owner: HashMap<NodeId, usize> = HashMap::new();
        for (i, &sibling) in siblings.iter().enumerate() {
            let mut stack = vec![sibling];
            while let Some(idx) = stack.pop() {
                owner.insert(idx, i);
                if let Some(node) = tree.get_node(idx) {
                    stack.extend(node.children.iter().copied());
                }
            }
        }

        let n = siblings.len();
        let mut counts = vec![vec![0; n]; n];
        for (i, &sibling) in siblings.iter().enumerate() {
            let Some(node) = tree.get_node(sibling) else { continue };
            for dep in &node.dependencies {
                match owner.get(dep) {
                    Some(&j) if j != i => counts[i][j] += 1,
                    _ => {}
                }
            }
        }

        Self {
            siblings: siblings.to_vec(),
            counts,
        }
    }

    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    pub fn count(&self, i: usize, j: usize) -> usize {
        self.counts[i][j]
    }

    /// `i` depends on `j` more than the other way round.
    ///
    /// Covers both the one-way edge and the edge-count rule.
    pub fn dominates(&self, i: usize, j: usize) -> bool {
        self.counts[i][j] > self.counts[j][i]
    }
}

/// Pairwise sibling comparison; Less means `a` is placed before `b`.
pub struct NodeComparator<'a> {
    tree: &'a DependencyTree,
    edges: SiblingEdges,
}

impl<'a> NodeComparator<'a> {
    pub fn new(tree: &'a DependencyTree, siblings: &[NodeId]) -> Self {
        Self {
            tree,
            edges: SiblingEdges::new(tree, siblings),
        }
    }

    pub fn edges(&self) -> &SiblingEdges {
        &self.edges
    }

    /// Compare siblings by position in the group.
    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        if self.edges.dominates(a, b) {
            return Ordering::Less;
        }
        if self.edges.dominates(b, a) {
            return Ordering::Greater;
        }
        self.compare_tie(a, b)
    }

    /// Rules that do not look at edges between `a` and `b`.
    fn compare_tie(&self, a: usize, b: usize) -> Ordering {
        let (Some(na), Some(nb)) = (
            self.tree.get_node(self.edges.siblings[a]),
            self.tree.get_node(self.edges.siblings[b]),
        ) else {
            return Ordering::Equal;
        };
        nb.dependencies
            .len()
            .cmp(&na.dependencies.len())
            .then_with(|| na.data.kind.cmp(&nb.data.kind))
            .then_with(|| na.data.filename.cmp(&nb.data.filename))
            .then_with(|| na.data.path.cmp(&nb.data.path))
    }

    /// Positions in placement order.
    ///
    /// `dominators[i]` counts the unplaced siblings dominating `i` and is
    /// decremented as siblings are placed, so each step is linear.
    pub fn order(&self) -> Vec<usize> {
        let n = self.edges.len();
        let mut remaining: Vec<usize> = (0..n).collect();
        let mut dominators: Vec<usize> = (0..n)
            .map(|i| (0..n).filter(|&j| self.edges.dominates(j, i)).count())
            .collect();
        let mut order = Vec::with_capacity(n);

        while !remaining.is_empty() {
            let free = remaining
                .iter()
                .copied()
                .filter(|&i| dominators[i] == 0)
                .min_by(|&a, &b| self.compare(a, b));
            // Every remaining sibling is dominated: a cycle, fall back to all
            let next = free.or_else(|| {
                remaining
                    .iter()
                    .copied()
                    .min_by(|&a, &b| self.compare(a, b))
            });
            let Some(next) = next else {
                break;
            };
            order.push(next);
            remaining.retain(|&i| i != next);
            for &i in &remaining {
                if self.edges.dominates(next, i) {
                    dominators[i] -= 1;
                }
            }
        }
        order
    }

    /// Layers for siblings already in placement order.
    ///
    /// The counter moves up before a sibling that an earlier sibling on the
    /// current layer dominates.
    pub fn layers(&self, order: &[usize]) -> Vec<usize> {
        let mut layers = Vec::with_capacity(order.len());
        let mut current = 0;

        for (pos, &i) in order.iter().enumerate() {
            let blocked = order[..pos]
                .iter()
                .zip(&layers)
                .any(|(&j, &layer)| layer == current && self.edges.dominates(j, i));
            if blocked {
                current += 1;
            }
            layers.push(current);
        }
        layers
    }
}

/// Orders every sibling group and assigns layers, bottom-up.
#[derive(Debug, Default)]
pub struct LayeringEngine;

impl LayeringEngine {
    pub fn new() -> Self {
        Self
    }

    #[instrument(level = "debug", skip_all)]
    pub fn apply(&self, tree: &mut DependencyTree) {
        let parents: Vec<NodeId> = tree
            .iter_postorder()
            .filter(|(_, node)| !node.is_leaf())
            .map(|(idx, _)| idx)
            .collect();

        for parent in &parents {
            self.layer_children(tree, *parent);
        }
        debug!("layered {} sibling groups", parents.len());
    }

    fn layer_children(&self, tree: &mut DependencyTree, parent: NodeId) {
        let Some(children) = tree.get_node(parent).map(|n| n.children.clone()) else {
            return;
        };

        let (sorted, layers) = {
            let comparator = NodeComparator::new(tree, &children);
            let order = comparator.order();
            let layers = comparator.layers(&order);
            let sorted: Vec<NodeId> = order.iter().map(|&i| children[i]).collect();
            (sorted, layers)
        };

        for (&child, &layer) in sorted.iter().zip(&layers) {
            if let Some(node) = tree.get_node_mut(child) {
                node.layer = layer;
            }
        }
        trace!("{}: layers {:?}", tree.display_name(parent), layers);
        if let Some(node) = tree.get_node_mut(parent) {
            node.children = sorted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::arena::NodeData;

    fn flat(names: &[&str]) -> (DependencyTree, NodeId, Vec<NodeId>) {
        let mut tree = DependencyTree::new();
        let root = tree.insert_node(NodeData::directory("r", "/r", "org.r"), None);
        let ids = names
            .iter()
            .map(|n| {
                tree.insert_node(
                    NodeData::file(format!("{n}.java"), format!("/r/{n}.java"), format!("org.r.{n}")),
                    Some(root),
                )
            })
            .collect();
        (tree, root, ids)
    }

    fn filenames(tree: &DependencyTree, parent: NodeId) -> Vec<String> {
        tree.get_node(parent)
            .unwrap()
            .children
            .iter()
            .map(|&c| tree.get_node(c).unwrap().data.filename.clone())
            .collect()
    }

    fn layer(tree: &DependencyTree, idx: NodeId) -> usize {
        tree.get_node(idx).unwrap().layer
    }

    #[test]
    fn given_no_edges_when_layering_then_sorted_by_name_on_layer_zero() {
        let (mut tree, root, ids) = flat(&["C", "A", "B"]);

        LayeringEngine::new().apply(&mut tree);

        assert_eq!(filenames(&tree, root), vec!["A.java", "B.java", "C.java"]);
        assert!(ids.iter().all(|&i| layer(&tree, i) == 0));
    }

    #[test]
    fn given_chain_when_layering_then_dependents_come_first_on_lower_layers() {
        // A -> B -> C
        let (mut tree, root, ids) = flat(&["C", "B", "A"]);
        let (c, b, a) = (ids[0], ids[1], ids[2]);
        tree.add_dependency(a, b);
        tree.add_dependency(b, c);

        LayeringEngine::new().apply(&mut tree);

        assert_eq!(filenames(&tree, root), vec!["A.java", "B.java", "C.java"]);
        assert_eq!((layer(&tree, a), layer(&tree, b), layer(&tree, c)), (0, 1, 2));
    }

    #[test]
    fn given_more_edges_one_way_when_comparing_then_heavier_side_first() {
        let mut tree = DependencyTree::new();
        let root = tree.insert_node(NodeData::directory("r", "/r", "org.r"), None);
        let p = tree.insert_node(NodeData::directory("p", "/r/p", "org.r.p"), Some(root));
        let q = tree.insert_node(NodeData::directory("q", "/r/q", "org.r.q"), Some(root));
        let p1 = tree.insert_node(NodeData::file("P1.java", "/r/p/P1.java", "org.r.p.P1"), Some(p));
        let q1 = tree.insert_node(NodeData::file("Q1.java", "/r/q/Q1.java", "org.r.q.Q1"), Some(q));
        let q2 = tree.insert_node(NodeData::file("Q2.java", "/r/q/Q2.java", "org.r.q.Q2"), Some(q));
        // q -> p once, p -> q twice
        tree.add_dependency(q, p1);
        tree.add_dependency(p, q1);
        tree.add_dependency(p, q2);

        let comparator = NodeComparator::new(&tree, &[q, p]);
        assert_eq!(comparator.edges().count(1, 0), 2);
        assert_eq!(comparator.compare(1, 0), Ordering::Less);
        assert_eq!(comparator.order(), vec![1, 0]);
    }

    #[test]
    fn given_cycle_when_layering_then_terminates_with_defined_layers() {
        let (mut tree, root, ids) = flat(&["A", "B"]);
        tree.add_dependency(ids[0], ids[1]);
        tree.add_dependency(ids[1], ids[0]);

        LayeringEngine::new().apply(&mut tree);

        assert_eq!(filenames(&tree, root), vec!["A.java", "B.java"]);
        assert_eq!(layer(&tree, ids[0]), 0);
        assert_eq!(layer(&tree, ids[1]), 0);
    }

    #[test]
    fn given_equal_edges_when_comparing_then_total_dependencies_decide() {
        let (mut tree, _, ids) = flat(&["A", "B", "X", "Y"]);
        tree.add_dependency(ids[1], ids[2]);
        tree.add_dependency(ids[1], ids[3]);

        let comparator = NodeComparator::new(&tree, &ids[..2]);
        assert_eq!(comparator.compare(1, 0), Ordering::Less);
    }

    #[test]
    fn given_directory_and_file_without_edges_when_layering_then_directory_first() {
        // Arrange: the file name sorts before the directory name
        let mut tree = DependencyTree::new();
        let root = tree.insert_node(NodeData::directory("r", "/r", "org.r"), None);
        let file = tree.insert_node(NodeData::file("A.java", "/r/A.java", "org.r.A"), Some(root));
        let dir = tree.insert_node(NodeData::directory("b", "/r/b", "org.r.b"), Some(root));
        tree.insert_node(NodeData::file("C.java", "/r/b/C.java", "org.r.b.C"), Some(dir));

        // Act
        let comparator = NodeComparator::new(&tree, &[file, dir]);
        let compared = comparator.compare(1, 0);
        LayeringEngine::new().apply(&mut tree);

        // Assert
        assert_eq!(compared, Ordering::Less);
        assert_eq!(filenames(&tree, root), vec!["b", "A.java"]);
        assert_eq!((layer(&tree, dir), layer(&tree, file)), (0, 0));
    }

    #[test]
    fn given_large_acyclic_group_when_ordering_then_every_dependent_precedes_its_target() {
        // Each sibling depends on the next one: a long chain given in reverse
        let names: Vec<String> = (0..300).rev().map(|i| format!("N{i:03}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (mut tree, _, ids) = flat(&refs);
        for pair in ids.windows(2).rev() {
            tree.add_dependency(pair[1], pair[0]);
        }

        let comparator = NodeComparator::new(&tree, &ids);
        let order = comparator.order();

        let expected: Vec<usize> = (0..ids.len()).rev().collect();
        assert_eq!(order, expected);
        assert_eq!(comparator.layers(&order).last().copied(), Some(ids.len() - 1));
    }
}
