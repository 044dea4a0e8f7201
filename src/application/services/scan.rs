//! Scan service
//!
//! Runs the full pipeline over one source root: build the tree, extract
//! references per file, resolve them to nodes, aggregate package edges and
//! assign sibling order and layers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::application::ApplicationResult;
use crate::domain::{
    aggregate_dependencies, attach_dependencies, BasePackage, DependencyExtractor,
    DependencyResolver, DependencyTree, LayeringEngine, NodeId, Reference, SourceRules,
    TreeBuilder,
};
use crate::infrastructure::traits::FileSystem;

/// What to scan for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub base: BasePackage,
    pub rules: SourceRules,
}

impl ScanOptions {
    pub fn new(base: BasePackage) -> Self {
        Self {
            base,
            rules: SourceRules::default(),
        }
    }
}

/// A reference that matched no node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// Qualified name of the file holding the reference
    pub source: String,
    pub reference: Reference,
}

/// Problems that did not abort the scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanDiagnostics {
    /// Source files that could not be read; treated as empty
    pub unreadable_files: Vec<PathBuf>,
    /// References dropped during resolution
    pub unresolved: Vec<UnresolvedReference>,
}

impl ScanDiagnostics {
    pub fn is_empty(&self) -> bool {
        self.unreadable_files.is_empty() && self.unresolved.is_empty()
    }
}

/// Result of one scan; owns the tree, nothing outlives it.
#[derive(Debug)]
pub struct ScanResult {
    pub tree: DependencyTree,
    pub diagnostics: ScanDiagnostics,
}

impl ScanResult {
    /// First node with the given qualified name, in pre-order.
    pub fn node(&self, qualified_name: &str) -> Option<NodeId> {
        self.tree.find_by_qualified_name(qualified_name).first().copied()
    }

    /// Qualified names of a node's dependencies, in insertion order.
    pub fn dependency_names(&self, idx: NodeId) -> Vec<String> {
        self.tree
            .get_node(idx)
            .map(|n| {
                n.dependencies
                    .iter()
                    .map(|&d| self.tree.display_name(d))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Per-file output of the extraction fan-out.
struct Extracted {
    leaf: NodeId,
    references: Vec<Reference>,
    unreadable: Option<PathBuf>,
}

/// Service driving a dependency scan.
pub struct ScanService {
    fs: Arc<dyn FileSystem>,
}

impl ScanService {
    /// Create a new scan service.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Scan `root` and return the layered dependency tree.
    ///
    /// Fails only if the root itself is missing or unreadable.
    #[instrument(level = "debug", skip(self, options), fields(base = %options.base))]
    pub fn scan(&self, root: &Path, options: &ScanOptions) -> ApplicationResult<ScanResult> {
        let builder = TreeBuilder::new(options.base.clone(), options.rules.clone());
        let mut tree = builder.build_from_directory(root)?;
        let mut diagnostics = ScanDiagnostics::default();

        let extracted = self.extract_all(&tree, &options.base);
        diagnostics
            .unreadable_files
            .extend(extracted.iter().filter_map(|e| e.unreadable.clone()));

        let resolved: Vec<(NodeId, Vec<NodeId>)> = {
            let resolver = DependencyResolver::new(&tree, &options.base, &options.rules);
            let per_leaf: Vec<(NodeId, Vec<NodeId>, Vec<Reference>)> = extracted
                .par_iter()
                .map(|e| {
                    let mut targets = Vec::new();
                    let mut unresolved = Vec::new();
                    for reference in &e.references {
                        let found = resolver.resolve(reference);
                        if found.is_empty() {
                            unresolved.push(reference.clone());
                        }
                        targets.extend(found);
                    }
                    (e.leaf, targets, unresolved)
                })
                .collect();

            per_leaf
                .into_iter()
                .map(|(leaf, targets, unresolved)| {
                    let source = tree.display_name(leaf);
                    diagnostics
                        .unresolved
                        .extend(unresolved.into_iter().map(|reference| {
                            debug!("dropping unresolved {} in {}", reference, source);
                            UnresolvedReference {
                                source: source.clone(),
                                reference,
                            }
                        }));
                    (leaf, targets)
                })
                .collect()
        };

        let edges: usize = resolved
            .into_iter()
            .map(|(leaf, targets)| attach_dependencies(&mut tree, leaf, targets))
            .sum();

        aggregate_dependencies(&mut tree);
        LayeringEngine::new().apply(&mut tree);

        info!(
            "scanned {} nodes (depth {}), {} file edges, {} unresolved",
            tree.len(),
            tree.depth(),
            edges,
            diagnostics.unresolved.len()
        );
        Ok(ScanResult { tree, diagnostics })
    }

    /// Read and extract every module file in parallel.
    ///
    /// Files outside any module (empty qualified name) take no part.
    fn extract_all(&self, tree: &DependencyTree, base: &BasePackage) -> Vec<Extracted> {
        let extractor = DependencyExtractor::new(base.clone());
        let leaves: Vec<(NodeId, PathBuf)> = tree
            .leaf_files()
            .into_iter()
            .filter_map(|idx| tree.get_node(idx).map(|n| (idx, n)))
            .filter(|(_, n)| !n.data.qualified_name.is_empty())
            .map(|(idx, n)| (idx, n.data.path.clone()))
            .collect();
        debug!("extracting from {} files", leaves.len());

        leaves
            .par_iter()
            .map(|(leaf, path)| match self.fs.read_to_string(path) {
                Ok(source) => Extracted {
                    leaf: *leaf,
                    references: extractor.extract(&source),
                    unreadable: None,
                },
                Err(e) => {
                    warn!("cannot read {}: {}", path.display(), e);
                    Extracted {
                        leaf: *leaf,
                        references: Vec::new(),
                        unreadable: Some(path.clone()),
                    }
                }
            })
            .collect()
    }
}
