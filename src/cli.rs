//! CLI Tooling
//!
//! Command-line front end: one-shot scans, a long-running watch loop, and
//! confirmed deletion.

mod format;

pub use format::{format_scan_summary, format_section_heading, format_tree_text, ScanSummary};

use crate::config::{ConfigLoader, SyncConfig};
use crate::error::{SyncError, TreeError};
use crate::project::{
    AllMembers, ConfirmPrompt, ConfirmRequest, ConfirmResponse, FixedResponse, ManifestMembership,
    MembershipOracle, ProjectTree,
};
use crate::scheduler::TickOutcome;
use crate::watch::IdleWaker;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::info;

/// Treesync CLI - keep a project tree in sync with a directory
#[derive(Parser)]
#[command(name = "treesync")]
#[command(about = "Incremental synchronisation of a project tree with a directory on disk")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root directory
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge the whole directory into a fresh tree and print it
    Scan {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Show entries that are not project members
        #[arg(long)]
        show_all: bool,
        /// Declared project member, relative to the root (repeatable); without
        /// any, every entry is a member
        #[arg(long = "member")]
        members: Vec<PathBuf>,
    },
    /// Keep the tree in sync with the disk until interrupted
    Watch {
        /// Show entries that are not project members
        #[arg(long)]
        show_all: bool,
        /// Declared project member, relative to the root (repeatable)
        #[arg(long = "member")]
        members: Vec<PathBuf>,
        /// Fallback idle interval in milliseconds
        #[arg(long, default_value = "250")]
        tick_ms: u64,
    },
    /// Delete a file or folder from disk and from the tree
    Delete {
        /// Path to delete, relative to the root or absolute
        path: PathBuf,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

pub struct CliContext {
    root: PathBuf,
    config: SyncConfig,
}

impl CliContext {
    /// Load configuration for `root`, from `config_path` when given.
    pub fn new(root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, SyncError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&root)?,
        };
        Ok(Self { root, config })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Fold command-line logging flags into the loaded config.
    pub fn apply_logging_overrides(&mut self, cli: &Cli) {
        let logging = &mut self.config.logging;
        if let Some(level) = &cli.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &cli.log_format {
            logging.format = format.clone();
        }
        if let Some(output) = &cli.log_output {
            logging.output = output.clone();
        }
        if let Some(file) = &cli.log_file {
            logging.file = Some(file.clone());
        }
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, SyncError> {
        match command {
            Commands::Scan {
                format,
                show_all,
                members,
            } => self.handle_scan(format, *show_all, members),
            Commands::Watch {
                show_all,
                members,
                tick_ms,
            } => self.handle_watch(*show_all, members, *tick_ms),
            Commands::Delete { path, yes } => self.handle_delete(path, *yes),
        }
    }

    fn open_tree(&self, show_all: bool, members: &[PathBuf]) -> Result<ProjectTree, SyncError> {
        let mut config = self.config.clone();
        config.visibility.show_all_files |= show_all;
        let root = dunce::canonicalize(&self.root).map_err(|source| TreeError::Io {
            path: self.root.clone(),
            source,
        })?;
        let membership: Box<dyn MembershipOracle> = if members.is_empty() {
            Box::new(AllMembers)
        } else {
            Box::new(ManifestMembership::new(&root, members))
        };
        ProjectTree::open(&root, &config, membership)
    }

    fn handle_scan(&self, format: &str, show_all: bool, members: &[PathBuf]) -> Result<String, SyncError> {
        if format != "text" && format != "json" {
            return Err(SyncError::Config(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                format
            )));
        }
        let mut tree = self.open_tree(show_all, members)?;
        let ticks = tree.populate();
        let snapshot = tree.snapshot();

        if format == "json" {
            return serde_json::to_string_pretty(&snapshot)
                .map_err(|e| SyncError::Config(format!("Failed to serialize tree: {}", e)));
        }
        let summary = ScanSummary {
            nodes: snapshot.node_count,
            displayed: snapshot.paths().len(),
            ticks,
            show_all_files: snapshot.show_all_files,
        };
        Ok(format!(
            "{}\n{}",
            format_tree_text(&snapshot),
            format_scan_summary(&summary)
        ))
    }

    fn handle_watch(&self, show_all: bool, members: &[PathBuf], tick_ms: u64) -> Result<String, SyncError> {
        let mut tree = self.open_tree(show_all, members)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to start runtime: {}", e)))?;

        let ticks = runtime.block_on(run_watch_loop(&mut tree, Duration::from_millis(tick_ms.max(1))))?;
        let nodes = tree.store().len();
        tree.close();
        Ok(format!("Stopped after {} idle ticks ({} nodes)", ticks, nodes))
    }

    fn handle_delete(&self, path: &Path, yes: bool) -> Result<String, SyncError> {
        let mut tree = self.open_tree(true, &[])?;
        tree.populate();

        let target = tree.root_path().join(path);
        let id = tree.resolve(&target).ok_or_else(|| TreeError::Io {
            path: target.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not in the project tree"),
        })?;

        let removed = if yes {
            tree.delete_from_disk(id, &FixedResponse(ConfirmResponse::Confirmed))
        } else {
            tree.delete_from_disk(id, &DialoguerPrompt)
        };
        match removed {
            Ok(count) => Ok(format!("Deleted {} ({} item(s))", target.display(), count)),
            Err(SyncError::Cancelled) => Ok("Deletion cancelled".to_string()),
            Err(e) => Err(e),
        }
    }
}

/// Host loop: tick while there is work, otherwise wait for the queue's wake
/// request or the fallback interval. Returns the number of ticks.
async fn run_watch_loop(tree: &mut ProjectTree, interval: Duration) -> Result<usize, SyncError> {
    let notify = Arc::new(Notify::new());
    tree.set_idle_waker(Arc::new(NotifyWaker(Arc::clone(&notify))));
    tree.attach_watcher()?;
    tree.request_full_rescan();

    let mut fallback = tokio::time::interval(interval);
    let mut shutdown = Box::pin(tokio::signal::ctrl_c());
    let mut ticks = 0usize;
    let mut outcome = TickOutcome::MoreWork;
    loop {
        if outcome == TickOutcome::MoreWork {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::task::yield_now() => {}
            }
        } else {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = notify.notified() => {}
                _ = fallback.tick() => {}
            }
        }

        let previous = outcome;
        outcome = tree.on_idle();
        ticks += 1;
        match outcome {
            TickOutcome::Closed => break,
            TickOutcome::Idle if previous == TickOutcome::MoreWork => {
                info!(nodes = tree.store().len(), "Tree in sync");
            }
            _ => {}
        }
    }
    Ok(ticks)
}

struct NotifyWaker(Arc<Notify>);

impl IdleWaker for NotifyWaker {
    fn request_idle(&self) {
        self.0.notify_one();
    }
}

/// Terminal confirmation through `dialoguer`.
struct DialoguerPrompt;

impl ConfirmPrompt for DialoguerPrompt {
    fn confirm(&self, request: &ConfirmRequest) -> ConfirmResponse {
        use dialoguer::Confirm;
        match Confirm::new()
            .with_prompt(request.message())
            .default(false)
            .interact()
        {
            Ok(true) => ConfirmResponse::Confirmed,
            _ => ConfirmResponse::Declined,
        }
    }
}
