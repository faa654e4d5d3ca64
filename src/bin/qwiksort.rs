//! CLI for the qwiksort file organizer.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use qwiksort::prelude::*;
use qwiksort::snapshot::DEFAULT_MAX_DEPTH;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qwiksort")]
#[command(author, version, about = "Rule-driven file organizer with undo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sort a folder using the rulesets of a config file
    Run {
        /// Path to the YAML or JSON config
        #[arg(short, long)]
        config: PathBuf,

        /// Ask before keeping the changes, undoing them otherwise
        #[arg(long)]
        confirm: bool,
    },

    /// Print the folder tree as the sorter sees it
    Tree {
        /// Folder to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Directory levels to read
        #[arg(short, long, default_value_t = DEFAULT_MAX_DEPTH)]
        depth: usize,
    },

    /// Validate a config file and describe its rules
    Check {
        /// Path to the YAML or JSON config
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qwiksort=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, confirm } => cmd_run(config, confirm),
        Commands::Tree { path, depth } => cmd_tree(path, depth),
        Commands::Check { config } => cmd_check(config),
    }
}

fn cmd_run(config: PathBuf, confirm: bool) -> Result<()> {
    let config = SortConfig::load(&config)
        .with_context(|| format!("Failed to load config {}", config.display()))?;
    let folder = config
        .snapshot()
        .with_context(|| format!("Failed to scan {}", config.target.display()))?;

    let mut undo = UndoManager::new();
    undo.save_restore_point(&folder);

    let report = config
        .job()
        .run(&folder, &mut undo)
        .context("Sorting job failed")?;

    println!(
        "Sorted {} of {} files ({} unmatched, {} failed)",
        report.fired,
        report.files_seen,
        report.unmatched,
        report.failures.len()
    );
    for (path, reason) in &report.failures {
        println!("  ! {}: {}", path.display(), reason);
    }
    if let Some(log) = &report.log_path {
        println!("Action log: {}", log.display());
    }

    if !confirm || report.recorded == 0 {
        return Ok(());
    }

    print!("Keep these changes? [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
        return Ok(());
    }

    match undo.undo_last() {
        UndoOutcome::NothingToUndo => println!("Nothing to undo"),
        UndoOutcome::Undone(undone) if undone.is_complete_success() => {
            println!("Reverted {} file(s)", undone.reverted.len());
        }
        UndoOutcome::Undone(undone) => {
            println!(
                "Reverted {} file(s), {} failed; rolling back to the restore point",
                undone.reverted.len(),
                undone.failures.len()
            );
            rollback(&undo)?;
        }
    }

    Ok(())
}

fn rollback(undo: &UndoManager) -> Result<()> {
    match undo.rollback_to_restore_point() {
        RollbackOutcome::NoRestorePoint => bail!("No restore point to roll back to"),
        RollbackOutcome::RolledBack(report) => {
            println!(
                "Restored {} file(s), {} already in place",
                report.restored.len(),
                report.in_place.len()
            );
            for path in &report.missing {
                println!("  ? missing: {}", path.display());
            }
            for (path, reason) in &report.failures {
                println!("  ! {}: {}", path.display(), reason);
            }
            Ok(())
        }
    }
}

fn cmd_tree(path: PathBuf, depth: usize) -> Result<()> {
    let folder = FolderSnapshot::scan(&path, true, depth)
        .with_context(|| format!("Failed to scan {}", path.display()))?;
    print!("{}", folder.tree_string());
    println!("{} file(s)", folder.file_count());
    Ok(())
}

fn cmd_check(config: PathBuf) -> Result<()> {
    let config = SortConfig::load(&config)
        .with_context(|| format!("Invalid config {}", config.display()))?;

    println!("Target: {} (depth {})", config.target.display(), config.max_depth);
    for ruleset in &config.rulesets {
        let policy = match ruleset.policy() {
            MatchPolicy::FirstMatch => "first match",
            MatchPolicy::MatchAll => "match all",
        };
        println!("{} [{}]", ruleset, policy);
        for rule in ruleset.rules() {
            println!("  {}", rule);
        }
    }
    Ok(())
}
