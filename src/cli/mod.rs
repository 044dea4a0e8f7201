//! CLI layer: argument parsing, command dispatch and rendering

pub mod args;
pub mod commands;
pub mod error;
pub mod output;
pub mod tree_view;

pub use args::{Cli, Commands, ConfigCommands, ScanArgs};
pub use commands::execute_command;
pub use error::{CliError, CliResult};
