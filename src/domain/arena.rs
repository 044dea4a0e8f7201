use generational_arena::{Arena, Index};
use std::fmt;
use std::path::PathBuf;
use tracing::instrument;

/// Stable identifier of a node inside a [`DependencyTree`].
pub type NodeId = Index;

/// Whether a node mirrors a directory (package) or a single source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Directory,
    File,
}

/// Data payload for tree nodes.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// Base name on disk; files keep their extension
    pub filename: String,
    /// Filesystem location, only used for I/O
    pub path: PathBuf,
    /// Dotted logical name, empty outside any module
    pub qualified_name: String,
    pub kind: NodeKind,
}

impl NodeData {
    pub fn directory(
        filename: impl Into<String>,
        path: impl Into<PathBuf>,
        qualified_name: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
            qualified_name: qualified_name.into(),
            kind: NodeKind::Directory,
        }
    }

    pub fn file(
        filename: impl Into<String>,
        path: impl Into<PathBuf>,
        qualified_name: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
            qualified_name: qualified_name.into(),
            kind: NodeKind::File,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.qualified_name.is_empty() {
            write!(f, "{}", self.filename)
        } else {
            write!(f, "{}", self.qualified_name)
        }
    }
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode {
    pub data: NodeData,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<NodeId>,
    /// Owned children, in display order
    pub children: Vec<NodeId>,
    /// Nodes this node depends on; deduplicated, never the node itself
    pub dependencies: Vec<NodeId>,
    /// Rendering tier among siblings, set by the layering pass
    pub layer: usize,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-based source tree carrying dependency edges.
///
/// Parent/child links form a strict tree; dependency edges are plain
/// [`NodeId`]s and may form arbitrary cycles without ownership issues.
#[derive(Debug)]
pub struct DependencyTree {
    arena: Arena<TreeNode>,
    root: Option<NodeId>,
}

impl Default for DependencyTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
        let node = TreeNode {
            data,
            parent,
            children: Vec::new(),
            dependencies: Vec::new(),
            layer: 0,
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    /// Remove a childless node and unlink it from its parent.
    ///
    /// Returns false if the node is missing, has children, or is the root.
    pub fn remove_leaf(&mut self, idx: NodeId) -> bool {
        let parent = match self.arena.get(idx) {
            Some(node) if node.is_leaf() && Some(idx) != self.root => node.parent,
            _ => return false,
        };
        self.arena.remove(idx);
        if let Some(parent) = parent.and_then(|p| self.arena.get_mut(p)) {
            parent.children.retain(|&c| c != idx);
        }
        true
    }

    pub fn get_node(&self, idx: NodeId) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: NodeId) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    /// Number of levels from the root down to the deepest leaf.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|r| (r, 1)).into_iter().collect();

        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(node) = self.get_node(idx) {
                stack.extend(node.children.iter().map(|&c| (c, depth + 1)));
            }
        }
        max_depth
    }

    /// Child of `parent` whose on-disk name equals `name`.
    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.get_node(parent)?
            .children
            .iter()
            .copied()
            .find(|&c| self.get_node(c).is_some_and(|n| n.data.filename == name))
    }

    /// All nodes carrying the given qualified name, in pre-order.
    pub fn find_by_qualified_name(&self, qualified_name: &str) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.data.qualified_name == qualified_name)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Collects all source file nodes in pre-order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_files(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.data.kind == NodeKind::File)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Record that `from` depends on `to`.
    ///
    /// Returns false for self edges, duplicates and unknown nodes.
    pub fn add_dependency(&mut self, from: NodeId, to: NodeId) -> bool {
        if from == to || !self.arena.contains(to) || self.has_dependency_on(from, to) {
            return false;
        }
        match self.arena.get_mut(from) {
            Some(node) => {
                node.dependencies.push(to);
                true
            }
            None => false,
        }
    }

    /// True if `from` has a direct edge onto `to`.
    pub fn has_dependency_on(&self, from: NodeId, to: NodeId) -> bool {
        self.get_node(from)
            .is_some_and(|n| n.dependencies.contains(&to))
    }

    /// Qualified name if set, file name otherwise.
    pub fn display_name(&self, idx: NodeId) -> String {
        self.get_node(idx)
            .map(|n| n.data.to_string())
            .unwrap_or_default()
    }
}

pub struct TreeIterator<'a> {
    tree: &'a DependencyTree,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a DependencyTree) -> Self {
        Self {
            tree,
            stack: tree.root().into_iter().collect(),
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children.iter().rev());
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a DependencyTree,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a DependencyTree) -> Self {
        Self {
            tree,
            stack: tree.root().map(|r| (r, false)).into_iter().collect(),
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DependencyTree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = DependencyTree::new();
        let root = tree.insert_node(NodeData::directory("app", "/p/app", "org.app"), None);
        let pkg = tree.insert_node(NodeData::directory("pkg", "/p/app/pkg", "org.app.pkg"), Some(root));
        let a = tree.insert_node(NodeData::file("A.java", "/p/app/pkg/A.java", "org.app.pkg.A"), Some(pkg));
        let b = tree.insert_node(NodeData::file("B.java", "/p/app/B.java", "org.app.B"), Some(root));
        (tree, root, pkg, a, b)
    }

    #[test]
    fn given_tree_when_iterating_then_preorder_and_postorder_differ() {
        let (tree, root, pkg, a, b) = sample();

        let pre: Vec<NodeId> = tree.iter().map(|(i, _)| i).collect();
        let post: Vec<NodeId> = tree.iter_postorder().map(|(i, _)| i).collect();

        assert_eq!(pre, vec![root, pkg, a, b]);
        assert_eq!(post, vec![a, pkg, b, root]);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.leaf_files(), vec![a, b]);
    }

    #[test]
    fn given_duplicate_or_self_edge_when_adding_then_rejected() {
        let (mut tree, _, _, a, b) = sample();

        assert!(tree.add_dependency(a, b));
        assert!(!tree.add_dependency(a, b));
        assert!(!tree.add_dependency(a, a));
        assert_eq!(tree.get_node(a).unwrap().dependencies, vec![b]);
        assert!(tree.has_dependency_on(a, b));
        assert!(!tree.has_dependency_on(b, a));
    }

    #[test]
    fn given_cycle_when_adding_edges_then_both_directions_exist() {
        let (mut tree, _, _, a, b) = sample();

        assert!(tree.add_dependency(a, b));
        assert!(tree.add_dependency(b, a));
        assert!(tree.has_dependency_on(a, b) && tree.has_dependency_on(b, a));
    }

    #[test]
    fn given_nodes_when_looking_up_then_finds_by_name() {
        let (tree, root, pkg, a, b) = sample();

        assert_eq!(tree.child_by_name(root, "pkg"), Some(pkg));
        assert_eq!(tree.child_by_name(pkg, "A.java"), Some(a));
        assert_eq!(tree.child_by_name(pkg, "A"), None);
        assert_eq!(tree.find_by_qualified_name("org.app.B"), vec![b]);
    }

    #[test]
    fn given_leaf_when_removing_then_unlinked_from_parent() {
        let (mut tree, root, pkg, a, _) = sample();

        assert!(!tree.remove_leaf(pkg), "nodes with children stay");
        assert!(!tree.remove_leaf(root), "root stays");
        assert!(tree.remove_leaf(a));
        assert!(tree.get_node(pkg).unwrap().children.is_empty());
        assert!(tree.remove_leaf(pkg));
        assert_eq!(tree.len(), 2);
    }
}
