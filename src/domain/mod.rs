//! Domain layer: entities and scanning logic
//!
//! This layer is independent of external concerns (no CLI, no config loading).
//! Only the tree builder touches the filesystem, through `walkdir`.

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod extractor;
pub mod layering;
pub mod resolver;

pub use arena::{DependencyTree, NodeData, NodeId, NodeKind, TreeNode};
pub use builder::TreeBuilder;
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use extractor::{strip_comments, DependencyExtractor};
pub use layering::{LayeringEngine, NodeComparator, SiblingEdges};
pub use resolver::{aggregate_dependencies, attach_dependencies, DependencyResolver};
