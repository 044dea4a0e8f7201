//! Text rendering of scanned trees with `termtree`.
//!
//! Both views are expanded into a flat outline with an explicit stack first
//! and assembled bottom-up afterwards, so deep trees never recurse.

use std::collections::HashSet;

use termtree::Tree;

use crate::domain::{DependencyTree, NodeId, NodeKind};

/// Flat intermediate form: every entry is pushed after its parent.
#[derive(Debug, Default)]
struct Outline {
    labels: Vec<String>,
    children: Vec<Vec<usize>>,
}

impl Outline {
    fn push(&mut self, label: String, parent: Option<usize>) -> usize {
        let idx = self.labels.len();
        self.labels.push(label);
        self.children.push(Vec::new());
        if let Some(p) = parent {
            self.children[p].push(idx);
        }
        idx
    }

    fn into_tree(self) -> Option<Tree<String>> {
        let mut built: Vec<Option<Tree<String>>> =
            self.labels.into_iter().map(|l| Some(Tree::new(l))).collect();

        // Children always have higher indices than their parent
        for idx in (0..built.len()).rev() {
            let leaves: Vec<Tree<String>> = self.children[idx]
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            if let Some(tree) = built[idx].take() {
                built[idx] = Some(tree.with_leaves(leaves));
            }
        }
        built.into_iter().next().flatten()
    }
}

fn dependency_list(tree: &DependencyTree, idx: NodeId) -> String {
    let names: Vec<String> = tree
        .get_node(idx)
        .map(|n| n.dependencies.iter().map(|&d| tree.display_name(d)).collect())
        .unwrap_or_default();
    format!("[{}]", names.join(", "))
}

/// Directory view: every node with its dependencies, optionally its layer.
pub fn directory_tree(tree: &DependencyTree, show_layers: bool) -> Option<Tree<String>> {
    let mut outline = Outline::default();
    let mut stack: Vec<(NodeId, Option<usize>)> = tree.root().map(|r| (r, None)).into_iter().collect();

    while let Some((idx, parent)) = stack.pop() {
        let Some(node) = tree.get_node(idx) else { continue };
        let mut label = match node.data.kind {
            NodeKind::Directory => format!("{}/", node.data.filename),
            NodeKind::File => node.data.filename.clone(),
        };
        if show_layers {
            label.push_str(&format!(" (layer {})", node.layer));
        }
        if !node.dependencies.is_empty() {
            label.push_str(&format!("  {}", dependency_list(tree, idx)));
        }
        let entry = outline.push(label, parent);
        stack.extend(node.children.iter().rev().map(|&c| (c, Some(entry))));
    }
    outline.into_tree()
}

/// Dependency view.
///
/// Packages without dependencies expand to their children; nodes with
/// dependencies list them and are followed into each dependency that has
/// dependencies itself. A node is followed at most once, so cycles end.
pub fn dependency_tree(tree: &DependencyTree) -> Option<Tree<String>> {
    let mut outline = Outline::default();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<(NodeId, Option<usize>)> = tree.root().map(|r| (r, None)).into_iter().collect();

    while let Some((idx, parent)) = stack.pop() {
        let Some(node) = tree.get_node(idx) else { continue };

        if node.dependencies.is_empty() && !node.is_leaf() {
            let entry = outline.push(format!("{}/", node.data.filename), parent);
            stack.extend(node.children.iter().rev().map(|&c| (c, Some(entry))));
            continue;
        }

        let label = format!("{} -> {}", node.data.filename, dependency_list(tree, idx));
        let entry = outline.push(label, parent);
        if !visited.insert(idx) {
            continue;
        }
        for &dep in node.dependencies.iter().rev() {
            let followed = tree
                .get_node(dep)
                .is_some_and(|d| !d.dependencies.is_empty() && !visited.contains(&dep));
            if followed {
                stack.push((dep, Some(entry)));
            } else {
                outline.push(tree.display_name(dep), Some(entry));
            }
        }
    }
    outline.into_tree()
}
