//! Property tests for sibling ordering and layer assignment
//!
//! Invariants checked for random sibling groups:
//! - Acyclic groups: no sibling is placed after a sibling it dominates
//! - Acyclic groups: a sibling sits on a higher layer than every earlier
//!   sibling dominating it
//! - Any group, cycles included: every sibling is placed exactly once and
//!   layers never decrease along the placement order

use std::collections::HashSet;

use proptest::prelude::*;

use deptree::domain::{DependencyTree, LayeringEngine, NodeData, NodeId, SiblingEdges};

fn sibling_group(n: usize, edges: &[(usize, usize)]) -> (DependencyTree, NodeId, Vec<NodeId>) {
    let mut tree = DependencyTree::new();
    let root = tree.insert_node(NodeData::directory("app", "/app", "org.app"), None);
    let ids: Vec<NodeId> = (0..n)
        .map(|i| {
            tree.insert_node(
                NodeData::file(
                    format!("F{i}.java"),
                    format!("/app/F{i}.java"),
                    format!("org.app.F{i}"),
                ),
                Some(root),
            )
        })
        .collect();
    for &(from, to) in edges {
        tree.add_dependency(ids[from], ids[to]);
    }
    (tree, root, ids)
}

/// Edges pointing from lower to higher rank in a random permutation.
fn acyclic_group() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..9).prop_flat_map(|n| {
        let ranks = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
        let pairs = prop::collection::vec((0..n, 0..n), 0..n * 3);
        (Just(n), ranks, pairs).prop_map(|(n, ranks, pairs)| {
            let edges = pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| {
                    if ranks[a] < ranks[b] {
                        (a, b)
                    } else {
                        (b, a)
                    }
                })
                .collect();
            (n, edges)
        })
    })
}

fn any_group() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..9).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..n * 3)))
}

fn placed(tree: &DependencyTree, root: NodeId) -> (Vec<NodeId>, Vec<usize>) {
    let children = tree.get_node(root).unwrap().children.clone();
    let layers = children
        .iter()
        .map(|&c| tree.get_node(c).unwrap().layer)
        .collect();
    (children, layers)
}

proptest! {
    #[test]
    fn prop_acyclic_group_places_dependents_first((n, edges) in acyclic_group()) {
        let (mut tree, root, _) = sibling_group(n, &edges);

        LayeringEngine::new().apply(&mut tree);

        let (order, layers) = placed(&tree, root);
        let placed_edges = SiblingEdges::new(&tree, &order);
        for q in 0..order.len() {
            for p in 0..q {
                prop_assert!(
                    !placed_edges.dominates(q, p),
                    "sibling {} placed after {} which it dominates", q, p
                );
                if placed_edges.dominates(p, q) {
                    prop_assert!(layers[q] > layers[p]);
                }
            }
        }
    }

    #[test]
    fn prop_any_group_places_every_sibling_once((n, edges) in any_group()) {
        let (mut tree, root, ids) = sibling_group(n, &edges);

        LayeringEngine::new().apply(&mut tree);

        let (order, layers) = placed(&tree, root);
        prop_assert_eq!(order.len(), n);
        let unique: HashSet<NodeId> = order.iter().copied().collect();
        let expected: HashSet<NodeId> = ids.into_iter().collect();
        prop_assert_eq!(unique, expected);
        prop_assert!(layers.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(layers.first().copied(), Some(0));
    }
}

#[test]
fn given_layered_tree_when_applied_twice_then_order_is_stable() {
    // Arrange
    let edges = [(0, 1), (1, 2), (3, 2), (3, 0)];
    let (mut tree, root, _) = sibling_group(4, &edges);
    LayeringEngine::new().apply(&mut tree);
    let (first, first_layers) = placed(&tree, root);

    // Act
    LayeringEngine::new().apply(&mut tree);

    // Assert
    let (second, second_layers) = placed(&tree, root);
    assert_eq!(first, second);
    assert_eq!(first_layers, second_layers);
}
