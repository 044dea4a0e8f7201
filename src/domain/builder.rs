//! Tree builder: mirrors a source directory as a module-aware node tree.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::domain::arena::{DependencyTree, NodeData, NodeId, NodeKind};
use crate::domain::entities::{BasePackage, SourceRules};
use crate::domain::error::{DomainError, DomainResult};

/// Where entries of a visited directory are attached.
#[derive(Debug, Clone)]
struct AttachPoint {
    node: NodeId,
    /// Qualified-name prefix for children; None outside any module
    scope: Option<String>,
}

/// Constructs the node tree for one scan root.
pub struct TreeBuilder {
    base: BasePackage,
    rules: SourceRules,
}

impl TreeBuilder {
    pub fn new(base: BasePackage, rules: SourceRules) -> Self {
        Self { base, rules }
    }

    /// Walk `root` and build the pruned, module-aware tree.
    ///
    /// Only a missing or unreadable root is fatal; unreadable entries
    /// below it are logged and skipped.
    #[instrument(level = "debug", skip(self))]
    pub fn build_from_directory(&self, root: &Path) -> DomainResult<DependencyTree> {
        if !root.exists() {
            return Err(DomainError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(DomainError::NotADirectory(root.to_path_buf()));
        }
        fs::read_dir(root).map_err(|source| DomainError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

        // Names outside a module come from the whole path, so a root
        // inside `src/main/java` still sees that prefix
        let anchor = path_segments(&fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf()));

        let mut tree = DependencyTree::new();
        let root_name = self.root_qualified_name(root, &anchor);
        let root_filename = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        let root_idx = tree.insert_node(
            NodeData::directory(root_filename, root, root_name.clone()),
            None,
        );

        let mut attach: HashMap<PathBuf, AttachPoint> = HashMap::new();
        // Directories between a grafted `src` and its package tree
        let mut graft_paths: HashSet<PathBuf> = HashSet::new();

        // A root that is itself a module's `src` directory
        let root_is_src = self
            .rules
            .module_dir_name()
            .is_some_and(|name| anchor.last().is_some_and(|last| last == name));
        let root_module_dir = (root_name.is_empty() && root_is_src)
            .then(|| self.module_package_dir(root))
            .flatten();
        match root_module_dir {
            Some(module_dir) => {
                self.graft(&mut tree, &mut attach, &mut graft_paths, root_idx, root, module_dir)
            }
            None => {
                attach.insert(
                    root.to_path_buf(),
                    AttachPoint {
                        node: root_idx,
                        scope: (!root_name.is_empty()).then_some(root_name),
                    },
                );
            }
        }

        let rules = &self.rules;
        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by(dirs_first)
            .into_iter()
            .filter_entry(|e| !is_filtered(rules, e));

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            let is_dir = entry.file_type().is_dir();

            let Some(parent) = path.parent().and_then(|p| attach.get(p)).cloned() else {
                // Inside a grafted `src`: only descend towards the package tree
                if is_dir && !graft_paths.contains(path) && !attach.contains_key(path) {
                    walker.skip_current_dir();
                }
                continue;
            };

            let filename = entry.file_name().to_string_lossy().into_owned();

            if is_dir {
                if parent.scope.is_none() && Some(filename.as_str()) == rules.module_dir_name() {
                    if let Some(module_dir) = self.module_package_dir(path) {
                        self.graft(&mut tree, &mut attach, &mut graft_paths, parent.node, path, module_dir);
                        continue;
                    }
                }
                let qualified_name = self.child_name(root, &anchor, &parent, &filename, path);
                let idx = tree.insert_node(
                    NodeData::directory(filename, path, qualified_name.clone()),
                    Some(parent.node),
                );
                attach.insert(
                    path.to_path_buf(),
                    AttachPoint {
                        node: idx,
                        scope: (!qualified_name.is_empty()).then_some(qualified_name),
                    },
                );
            } else if entry.file_type().is_file() && rules.is_source_file(&filename) {
                let logical = rules.logical_name(&filename).to_string();
                let qualified_name = self.child_name(root, &anchor, &parent, &logical, path);
                tree.insert_node(
                    NodeData::file(filename, path, qualified_name),
                    Some(parent.node),
                );
            }
        }

        let pruned = prune_empty_directories(&mut tree);
        debug!("built tree with {} nodes, pruned {} empty directories", tree.len(), pruned);
        Ok(tree)
    }

    /// `<src>/main/java/<base>` if it exists below a `src` directory.
    fn module_package_dir(&self, src_dir: &Path) -> Option<PathBuf> {
        let candidate = self
            .rules
            .module_convention
            .iter()
            .skip(1)
            .fold(src_dir.to_path_buf(), |p, seg| p.join(seg))
            .join(self.base.as_path());
        candidate.is_dir().then_some(candidate)
    }

    /// Turn `owner` into a module root whose children come from `module_dir`.
    fn graft(
        &self,
        tree: &mut DependencyTree,
        attach: &mut HashMap<PathBuf, AttachPoint>,
        graft_paths: &mut HashSet<PathBuf>,
        owner: NodeId,
        src_dir: &Path,
        module_dir: PathBuf,
    ) {
        debug!("module root at {}", module_dir.display());
        if let Some(node) = tree.get_node_mut(owner) {
            node.data.qualified_name = self.base.dotted().to_string();
        }
        let mut intermediate = module_dir.parent();
        while let Some(dir) = intermediate {
            graft_paths.insert(dir.to_path_buf());
            if dir == src_dir {
                break;
            }
            intermediate = dir.parent();
        }
        attach.insert(
            module_dir,
            AttachPoint {
                node: owner,
                scope: Some(self.base.dotted().to_string()),
            },
        );
    }

    fn root_qualified_name(&self, root: &Path, anchor: &[String]) -> String {
        if root.ends_with(self.base.as_path()) {
            return self.base.dotted().to_string();
        }
        self.name_after_convention(anchor)
    }

    /// `anchor` holds the absolute segments of the scan root.
    fn child_name(
        &self,
        root: &Path,
        anchor: &[String],
        parent: &AttachPoint,
        logical: &str,
        path: &Path,
    ) -> String {
        match &parent.scope {
            Some(scope) if !scope.is_empty() => format!("{scope}.{logical}"),
            Some(_) => logical.to_string(),
            None => {
                let Ok(relative) = path.strip_prefix(root) else {
                    return String::new();
                };
                let mut segments: Vec<String> =
                    anchor.iter().cloned().chain(path_segments(relative)).collect();
                if let Some(last) = segments.last_mut() {
                    *last = logical.to_string();
                }
                self.name_after_convention(&segments)
            }
        }
    }

    /// Segments following the last `src/main/java` run, joined by dots.
    fn name_after_convention(&self, segments: &[String]) -> String {
        let convention = &self.rules.module_convention;
        if convention.is_empty() || segments.len() <= convention.len() {
            return String::new();
        }
        (0..=segments.len() - convention.len())
            .rev()
            .find(|&i| segments[i..i + convention.len()] == convention[..])
            .map(|i| segments[i + convention.len()..].join("."))
            .unwrap_or_default()
    }
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

fn dirs_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    b.file_type()
        .is_dir()
        .cmp(&a.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn is_filtered(rules: &SourceRules, entry: &DirEntry) -> bool {
    // walkdir hands the root to the predicate as well
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    rules.is_hidden(&name) || (entry.file_type().is_dir() && rules.is_ignored_dir(&name))
}

/// Remove directories without children, bottom-up, so chains of empty
/// directories vanish as a whole.
fn prune_empty_directories(tree: &mut DependencyTree) -> usize {
    let order: Vec<NodeId> = tree
        .iter_postorder()
        .filter(|(_, node)| node.data.kind == NodeKind::Directory)
        .map(|(idx, _)| idx)
        .collect();

    order
        .into_iter()
        .filter(|&idx| {
            tree.get_node(idx).is_some_and(|n| n.is_leaf()) && tree.remove_leaf(idx)
        })
        .count()
}
