//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Lexical dependency-tree scanner for Java-style source trees
#[derive(Parser, Debug)]
#[command(name = "deptree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Raise log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Arguments shared by every scanning command.
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Root directory to scan
    #[arg(value_hint = ValueHint::DirPath)]
    pub root: PathBuf,

    /// Base package, dotted or slashed (overrides config)
    #[arg(short, long)]
    pub base_package: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the source tree with resolved dependencies
    Tree {
        #[command(flatten)]
        scan: ScanArgs,

        /// Show layer indices
        #[arg(short, long)]
        layers: bool,
    },

    /// Show the dependency view, following edges
    Deps {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Report unresolved references and unreadable files
    Check {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show {
        /// Project root whose .deptree.toml is merged
        #[arg(value_hint = ValueHint::DirPath)]
        root: Option<PathBuf>,
    },

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long, conflicts_with = "root")]
        global: bool,

        /// Project root receiving .deptree.toml
        #[arg(value_hint = ValueHint::DirPath)]
        root: Option<PathBuf>,
    },

    /// Show config paths
    Path {
        /// Project root
        #[arg(value_hint = ValueHint::DirPath)]
        root: Option<PathBuf>,
    },
}
