//! minigit CLI — the command-line interface to minigit.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;

use minigit_core::diff::{ChangeType, DiffReport};
use minigit_core::pr::PrId;
use minigit_core::repo::SyncReport;
use minigit_core::Repository;

#[derive(Parser)]
#[command(name = "minigit", about = "minigit — a minimal snapshot-based version control system", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an empty repository in the current directory.
    Init,

    /// Stage a file for the next commit.
    Add {
        /// Path to the file, relative to the repository root.
        path: String,
    },

    /// Commit staged files plus every new or modified file.
    Commit {
        /// Commit message.
        message: String,
    },

    /// Show the current branch's history, newest first.
    Log {
        /// Output format: "human" (default), "json", or "brief".
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Show staged, modified and new files.
    Status {
        /// Output format: "human" (default) or "json".
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Create a branch from the current branch.
    Branch {
        name: String,
    },

    /// Switch branches and restore the branch's latest files.
    Checkout {
        name: String,
    },

    /// List branches.
    List {
        /// Output format: "human" (default) or "json".
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Delete a branch.
    Delete {
        name: String,
    },

    /// Compare two commits.
    Diff {
        old: String,
        new: String,

        /// Output format: "human" (default) or "json".
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Compare the latest commits of two branches.
    DiffBranch {
        old: String,
        new: String,

        /// Output format: "human" (default) or "json".
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Open a pull request from one branch into another.
    CreatePr {
        source: String,
        target: String,
    },

    /// List pull requests.
    PrList {
        /// Output format: "human" (default) or "json".
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Merge an open pull request.
    PrMerge {
        /// Pull request number.
        id: String,
    },

    /// Show the diff of a pull request.
    PrDiff {
        /// Pull request number.
        id: String,

        /// Output format: "human" (default) or "json".
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Undo a commit by committing the state right before it.
    Revert {
        commit_id: String,
    },

    /// Move the current branch back to a commit, discarding later history.
    Reset {
        commit_id: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd = std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("error: cannot determine current directory: {e}");
        process::exit(1);
    });

    let result = match cli.command {
        Commands::Init => cmd_init(&cwd),
        Commands::Add { path } => cmd_add(&cwd, &path),
        Commands::Commit { message } => cmd_commit(&cwd, &message),
        Commands::Log { format } => cmd_log(&cwd, &format),
        Commands::Status { format } => cmd_status(&cwd, &format),
        Commands::Branch { name } => cmd_branch(&cwd, &name),
        Commands::Checkout { name } => cmd_checkout(&cwd, &name),
        Commands::List { format } => cmd_list(&cwd, &format),
        Commands::Delete { name } => cmd_delete(&cwd, &name),
        Commands::Diff { old, new, format } => cmd_diff(&cwd, &old, &new, &format),
        Commands::DiffBranch { old, new, format } => cmd_diff_branch(&cwd, &old, &new, &format),
        Commands::CreatePr { source, target } => cmd_create_pr(&cwd, &source, &target),
        Commands::PrList { format } => cmd_pr_list(&cwd, &format),
        Commands::PrMerge { id } => cmd_pr_merge(&cwd, &id),
        Commands::PrDiff { id, format } => cmd_pr_diff(&cwd, &id, &format),
        Commands::Revert { commit_id } => cmd_revert(&cwd, &commit_id),
        Commands::Reset { commit_id } => cmd_reset(&cwd, &commit_id),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn open(cwd: &Path) -> Result<Repository> {
    Ok(Repository::open(cwd)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_init(cwd: &PathBuf) -> Result<()> {
    Repository::init(cwd)?;
    println!("Initialized empty minigit repository in .minigit/");
    Ok(())
}

fn cmd_add(cwd: &PathBuf, path: &str) -> Result<()> {
    let repo = open(cwd)?;
    let added = repo.add(path)?;
    if added.newly_staged {
        println!("Added '{}' to staging.", added.path);
    } else {
        println!("'{}' is already staged.", added.path);
    }
    Ok(())
}

fn cmd_commit(cwd: &PathBuf, message: &str) -> Result<()> {
    let repo = open(cwd)?;
    let commit = repo.commit(message)?;
    println!("Committed {}: {}", commit.id, commit.message);
    for file in &commit.files {
        println!("  {file}");
    }
    Ok(())
}

fn cmd_log(cwd: &PathBuf, format: &str) -> Result<()> {
    let repo = open(cwd)?;
    let commits = repo.log()?;

    match format {
        "json" => return print_json(&commits),
        "brief" => {
            for commit in &commits {
                println!("{}", commit.headline());
            }
            return Ok(());
        }
        _ => {}
    }

    if commits.is_empty() {
        println!("No commits yet");
        return Ok(());
    }
    for commit in &commits {
        println!("commit {}", commit.id);
        println!("Date:  {}", commit.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("\n    {}\n", commit.message);
    }
    Ok(())
}

fn cmd_status(cwd: &PathBuf, format: &str) -> Result<()> {
    let repo = open(cwd)?;
    let status = repo.status()?;

    if format == "json" {
        return print_json(&status);
    }

    println!("On branch {}", status.branch);
    match &status.head {
        Some(head) => println!("Last commit: {} - {}", head.id, head.message),
        None => println!("No commits yet"),
    }

    if status.staged.is_empty() {
        println!("\nNo staged files");
    } else {
        println!("\nStaged files:");
        for file in &status.staged {
            println!("  - {file}");
        }
    }

    if status.modified.is_empty() && status.untracked.is_empty() {
        println!("\nNo modified or new files");
    }
    if !status.modified.is_empty() {
        println!("\nModified files not staged:");
        for file in &status.modified {
            println!("  - {file}");
        }
    }
    if !status.untracked.is_empty() {
        println!("\nNew files not staged (will be auto-staged on commit):");
        for file in &status.untracked {
            println!("  - {file}");
        }
    }
    Ok(())
}

fn cmd_branch(cwd: &PathBuf, name: &str) -> Result<()> {
    open(cwd)?.branch(name)?;
    println!("Created branch '{name}'.");
    Ok(())
}

fn print_sync(sync: &SyncReport) {
    if let Some(commit) = &sync.commit {
        for file in &sync.restored {
            println!("Restored '{file}' from commit {commit}");
        }
    }
    for file in &sync.removed {
        println!("Removed '{file}'");
    }
}

fn cmd_checkout(cwd: &PathBuf, name: &str) -> Result<()> {
    let sync = open(cwd)?.checkout(name)?;
    print_sync(&sync);
    println!("Switched to branch '{name}'.");
    Ok(())
}

fn cmd_list(cwd: &PathBuf, format: &str) -> Result<()> {
    let branches = open(cwd)?.list()?;

    if format == "json" {
        return print_json(&branches);
    }

    for branch in &branches {
        if branch.current {
            println!("* {} (current)", branch.name);
        } else {
            println!("  {}", branch.name);
        }
    }
    Ok(())
}

fn cmd_delete(cwd: &PathBuf, name: &str) -> Result<()> {
    open(cwd)?.delete(name)?;
    println!("Deleted branch '{name}'.");
    Ok(())
}

fn cmd_diff(cwd: &PathBuf, old: &str, new: &str, format: &str) -> Result<()> {
    let report = open(cwd)?.diff(old, new)?;
    print_diff(&report, format)
}

fn cmd_diff_branch(cwd: &PathBuf, old: &str, new: &str, format: &str) -> Result<()> {
    let report = open(cwd)?.diff_branch(old, new)?;
    print_diff(&report, format)
}

fn cmd_create_pr(cwd: &PathBuf, source: &str, target: &str) -> Result<()> {
    let pr = open(cwd)?.create_pr(source, target)?;
    println!("Pull request #{} created from {} -> {}.", pr.id, pr.source, pr.target);
    Ok(())
}

fn cmd_pr_list(cwd: &PathBuf, format: &str) -> Result<()> {
    let prs = open(cwd)?.pr_list()?;

    if format == "json" {
        return print_json(&prs);
    }

    if prs.is_empty() {
        println!("No pull requests.");
        return Ok(());
    }
    for pr in &prs {
        println!(
            "PR #{} | {} -> {} | Status: {}",
            pr.id, pr.source, pr.target, pr.status
        );
    }
    Ok(())
}

fn cmd_pr_merge(cwd: &PathBuf, id: &str) -> Result<()> {
    let id: PrId = id.parse()?;
    let merged = open(cwd)?.pr_merge(id)?;
    println!(
        "PR #{id} merged successfully ({} commit(s) added to {}).",
        merged.appended.len(),
        merged.pr.target
    );
    Ok(())
}

fn cmd_pr_diff(cwd: &PathBuf, id: &str, format: &str) -> Result<()> {
    let id: PrId = id.parse()?;
    let report = open(cwd)?.pr_diff(id)?;
    print_diff(&report, format)
}

fn cmd_revert(cwd: &PathBuf, commit_id: &str) -> Result<()> {
    let reverted = open(cwd)?.revert(commit_id)?;
    print_sync(&reverted.sync);
    println!(
        "Created revert commit {} to undo changes from {commit_id}",
        reverted.commit.id
    );
    Ok(())
}

fn cmd_reset(cwd: &PathBuf, commit_id: &str) -> Result<()> {
    let reset = open(cwd)?.reset(commit_id)?;
    print_sync(&reset.sync);
    println!(
        "Reset branch '{}' to commit {commit_id}. {} later commit(s) discarded.",
        reset.sync.branch,
        reset.discarded.len()
    );
    Ok(())
}

fn print_diff(report: &DiffReport, format: &str) -> Result<()> {
    if format == "json" {
        return print_json(report);
    }

    println!("Diff {}", report.description);
    if report.is_empty() {
        println!("\nNo differences.");
        return Ok(());
    }

    for file in &report.files {
        match file.change_type {
            ChangeType::Added => println!("\nFile '{}' was added.", file.path),
            ChangeType::Removed => println!("\nFile '{}' was removed.", file.path),
            ChangeType::Modified => println!("\nChanges in '{}':", file.path),
        }
        if file.is_binary {
            println!("Binary file differs");
            continue;
        }
        for line in &file.excerpt {
            println!("{line}");
        }
        if file.is_truncated() {
            match file.change_type {
                ChangeType::Modified => println!("... (diff truncated)"),
                _ => println!("... and {} more lines", file.omitted),
            }
        }
    }

    println!(
        "\n{} file(s) changed, {} insertion(s)(+), {} deletion(s)(-)",
        report.files.len(),
        report.total_additions(),
        report.total_deletions()
    );
    Ok(())
}
