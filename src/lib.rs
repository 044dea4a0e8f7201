//! deptree: lexical dependency-tree scanner for Java-style source trees.
//!
//! A scan mirrors the source directory as a module-aware tree, extracts
//! intra-project references from every file, resolves them to nodes in the
//! same tree and finally orders siblings and assigns layers for rendering.
//!
//! ```no_run
//! let result = deptree::scan("project/src/main/java/org/example", "org.example")?;
//! println!("{} nodes", result.tree.len());
//! # Ok::<(), deptree::application::ApplicationError>(())
//! ```

use std::path::Path;
use std::sync::Arc;

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::services::{ScanDiagnostics, ScanOptions, ScanResult, ScanService};
pub use application::{ApplicationError, ApplicationResult};
pub use domain::{BasePackage, DependencyTree, NodeId, SourceRules};

/// Scan `root` with default rules and the real filesystem.
pub fn scan(root: impl AsRef<Path>, base_package: &str) -> ApplicationResult<ScanResult> {
    let options = ScanOptions::new(BasePackage::parse(base_package)?);
    let service = ScanService::new(Arc::new(infrastructure::traits::RealFileSystem));
    service.scan(root.as_ref(), &options)
}
