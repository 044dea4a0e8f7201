//! Maps extracted references onto tree nodes.

use tracing::{debug, trace};

use crate::domain::arena::{DependencyTree, NodeId, NodeKind};
use crate::domain::entities::{BasePackage, Reference, SourceRules};

/// Resolves references against every module root of a tree.
///
/// Holds the tree immutably, so a single resolver can be shared across
/// worker threads while edges are collected for later attachment.
pub struct DependencyResolver<'a> {
    tree: &'a DependencyTree,
    base: &'a BasePackage,
    rules: &'a SourceRules,
    module_roots: Vec<NodeId>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(tree: &'a DependencyTree, base: &'a BasePackage, rules: &'a SourceRules) -> Self {
        let module_roots = tree
            .iter()
            .filter(|(_, node)| {
                node.data.kind == NodeKind::Directory && node.data.qualified_name == base.dotted()
            })
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        debug!("found {} module roots", module_roots.len());

        Self {
            tree,
            base,
            rules,
            module_roots,
        }
    }

    /// Nodes a reference denotes, across all module roots.
    ///
    /// Empty if any path segment is missing; wildcard references expand to
    /// every immediate child of the named package.
    pub fn resolve(&self, reference: &Reference) -> Vec<NodeId> {
        let Some(relative) = self.base.strip(reference.target()) else {
            return Vec::new();
        };
        let segments: Vec<&str> = if relative.is_empty() {
            Vec::new()
        } else {
            relative.split('.').collect()
        };

        let mut resolved = Vec::new();
        for &module_root in &self.module_roots {
            if reference.is_wildcard() {
                if let Some(package) = self.descend(module_root, &segments) {
                    if let Some(node) = self.tree.get_node(package) {
                        resolved.extend(node.children.iter().copied());
                    }
                }
            } else if let Some((last, packages)) = segments.split_last() {
                let file_name = self.rules.source_file_name(last);
                let found = self
                    .descend(module_root, packages)
                    .and_then(|package| self.tree.child_by_name(package, &file_name));
                resolved.extend(found);
            }
        }

        trace!("{} -> {} node(s)", reference, resolved.len());
        resolved
    }

    /// Follow directory names from `start`; None if any segment is missing.
    fn descend(&self, start: NodeId, segments: &[&str]) -> Option<NodeId> {
        segments.iter().try_fold(start, |current, segment| {
            self.tree.child_by_name(current, segment).filter(|&c| {
                self.tree
                    .get_node(c)
                    .is_some_and(|n| n.data.kind == NodeKind::Directory)
            })
        })
    }
}

/// Attach resolved targets to `from`; returns the number of new edges.
pub fn attach_dependencies(
    tree: &mut DependencyTree,
    from: NodeId,
    targets: impl IntoIterator<Item = NodeId>,
) -> usize {
    targets
        .into_iter()
        .filter(|&to| tree.add_dependency(from, to))
        .count()
}

/// Union every node's dependencies into its parent, bottom-up.
///
/// Afterwards a package carries the dependencies of all its descendants.
/// The root's aggregate is cleared: it has no siblings to be ordered against.
pub fn aggregate_dependencies(tree: &mut DependencyTree) {
    let order: Vec<(NodeId, Option<NodeId>)> = tree
        .iter_postorder()
        .map(|(idx, node)| (idx, node.parent))
        .collect();

    for (idx, parent) in order {
        let Some(parent) = parent else { continue };
        let deps = tree
            .get_node(idx)
            .map(|n| n.dependencies.clone())
            .unwrap_or_default();
        attach_dependencies(tree, parent, deps);
    }

    if let Some(root) = tree.root().and_then(|r| tree.get_node_mut(r)) {
        root.dependencies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::arena::NodeData;
    use crate::domain::entities::ReferenceKind;

    struct Fixture {
        tree: DependencyTree,
        base: BasePackage,
        rules: SourceRules,
        core: NodeId,
        dep: NodeId,
        wpkg: NodeId,
        w1: NodeId,
        w2: NodeId,
    }

    fn fixture() -> Fixture {
        let mut tree = DependencyTree::new();
        let root = tree.insert_node(NodeData::directory("example", "/r", "org.example"), None);
        let pkg = tree.insert_node(NodeData::directory("pkg", "/r/pkg", "org.example.pkg"), Some(root));
        let wpkg = tree.insert_node(NodeData::directory("wpkg", "/r/wpkg", "org.example.wpkg"), Some(root));
        let core = tree.insert_node(NodeData::file("Core.java", "/r/Core.java", "org.example.Core"), Some(root));
        let dep = tree.insert_node(NodeData::file("Dep.java", "/r/pkg/Dep.java", "org.example.pkg.Dep"), Some(pkg));
        let w1 = tree.insert_node(NodeData::file("W1.java", "/r/wpkg/W1.java", "org.example.wpkg.W1"), Some(wpkg));
        let w2 = tree.insert_node(NodeData::file("W2.java", "/r/wpkg/W2.java", "org.example.wpkg.W2"), Some(wpkg));
        Fixture {
            tree,
            base: BasePackage::parse("org.example").unwrap(),
            rules: SourceRules::default(),
            core,
            dep,
            wpkg,
            w1,
            w2,
        }
    }

    #[test]
    fn given_explicit_reference_when_resolving_then_finds_file() {
        let f = fixture();
        let resolver = DependencyResolver::new(&f.tree, &f.base, &f.rules);

        let found = resolver.resolve(&Reference::new("org.example.pkg.Dep", ReferenceKind::Import));
        assert_eq!(found, vec![f.dep]);
    }

    #[test]
    fn given_unknown_segment_when_resolving_then_drops_reference() {
        let f = fixture();
        let resolver = DependencyResolver::new(&f.tree, &f.base, &f.rules);

        for name in ["org.example.pkg.Missing", "org.example.nope.Dep", "org.example.pkg", "org.other.Dep"] {
            assert!(resolver.resolve(&Reference::new(name, ReferenceKind::Import)).is_empty(), "{name}");
        }
    }

    #[test]
    fn given_wildcard_reference_when_resolving_then_expands_children() {
        let f = fixture();
        let resolver = DependencyResolver::new(&f.tree, &f.base, &f.rules);

        let found = resolver.resolve(&Reference::new("org.example.wpkg.*", ReferenceKind::WildcardImport));
        assert_eq!(found, vec![f.w1, f.w2]);
    }

    #[test]
    fn given_leaf_edges_when_aggregating_then_packages_carry_union() {
        let mut f = fixture();
        attach_dependencies(&mut f.tree, f.w1, [f.dep, f.core]);
        attach_dependencies(&mut f.tree, f.w2, [f.core, f.dep]);

        aggregate_dependencies(&mut f.tree);

        let wpkg = f.tree.get_node(f.wpkg).unwrap();
        assert_eq!(wpkg.dependencies, vec![f.dep, f.core]);
        let root = f.tree.root().unwrap();
        assert!(f.tree.get_node(root).unwrap().dependencies.is_empty());
    }
}
