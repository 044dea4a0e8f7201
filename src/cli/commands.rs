//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, instrument};

use crate::application::services::ScanResult;
use crate::application::IoResultExt;
use crate::cli::args::{Cli, Commands, ConfigCommands, ScanArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::{output, tree_view};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::infrastructure::di::ServiceContainer;
use crate::util::path::{expand_path, relative_to};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Tree { scan, layers }) => cmd_tree(scan, *layers),
        Some(Commands::Deps { scan }) => cmd_deps(scan),
        Some(Commands::Check { scan }) => cmd_check(scan),
        Some(Commands::Config { command }) => cmd_config(command),
        Some(Commands::Completion { shell }) => cmd_completion(*shell),
        None => Err(CliError::Usage(
            "no command given, run with --help for usage".into(),
        )),
    }
}

/// Load settings for the root and run one scan.
fn run_scan(args: &ScanArgs) -> CliResult<(PathBuf, ScanResult)> {
    let root = expand_path(&args.root);
    let settings = Settings::load(Some(&root))?;
    let options = settings.to_scan_options(args.base_package.as_deref())?;
    debug!("scanning {} for {}", root.display(), options.base);

    let container = ServiceContainer::new(settings);
    let result = container.scan_service.scan(&root, &options)?;
    Ok((root, result))
}

#[instrument(level = "debug")]
fn cmd_tree(args: &ScanArgs, layers: bool) -> CliResult<()> {
    let (root, result) = run_scan(args)?;

    output::header(&format!("Dependency tree: {}", root.display()));
    if let Some(rendered) = tree_view::directory_tree(&result.tree, layers) {
        output::info(&rendered);
    }
    if !result.diagnostics.is_empty() {
        output::warning(&format!(
            "{} unresolved reference(s), {} unreadable file(s); see `deptree check`",
            result.diagnostics.unresolved.len(),
            result.diagnostics.unreadable_files.len()
        ));
    }
    Ok(())
}

#[instrument(level = "debug")]
fn cmd_deps(args: &ScanArgs) -> CliResult<()> {
    let (_, result) = run_scan(args)?;
    if let Some(rendered) = tree_view::dependency_tree(&result.tree) {
        output::info(&rendered);
    }
    Ok(())
}

#[instrument(level = "debug")]
fn cmd_check(args: &ScanArgs) -> CliResult<()> {
    let (root, result) = run_scan(args)?;
    let diagnostics = &result.diagnostics;

    if diagnostics.is_empty() {
        output::success(&format!("{} nodes, all references resolved", result.tree.len()));
        return Ok(());
    }

    if !diagnostics.unreadable_files.is_empty() {
        output::header("Unreadable files");
        for path in &diagnostics.unreadable_files {
            output::failure(&relative_to(&root, path).display());
        }
    }
    if !diagnostics.unresolved.is_empty() {
        output::header("Unresolved references");
        for u in &diagnostics.unresolved {
            output::failure(&format!("{} -> {}", u.source, u.reference));
        }
    }
    Ok(())
}

fn cmd_config(command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show { root } => {
            let root = root.as_deref().map(expand_path);
            let settings = Settings::load(root.as_deref())?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path { root } => {
            match global_config_path() {
                Some(path) => print_config_path("Global", &path),
                None => output::action("Global", &"(no config directory)"),
            }
            let root = root
                .as_deref()
                .map(expand_path)
                .unwrap_or_else(|| PathBuf::from("."));
            print_config_path("Project", &local_config_path(&root));
            Ok(())
        }
        ConfigCommands::Init { global, root } => {
            let path = if *global {
                global_config_path()
                    .ok_or_else(|| CliError::Usage("cannot determine config directory".into()))?
            } else {
                let root = root
                    .as_deref()
                    .map(expand_path)
                    .unwrap_or_else(|| PathBuf::from("."));
                local_config_path(&root)
            };

            let container = ServiceContainer::new(Settings::default());
            if container.fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            container
                .fs
                .ensure_parent(&path)
                .with_path_context("create config directory", &path)?;
            container
                .fs
                .write(&path, &Settings::template())
                .with_path_context("write config", &path)?;
            output::action("Created", &path.display());
            Ok(())
        }
    }
}

fn print_config_path(label: &str, path: &Path) {
    let status = if path.exists() { "exists" } else { "not found" };
    output::action(label, &path.display());
    output::detail(&status);
}

fn cmd_completion(shell: Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
