//! tfsync CLI - Command-line interface for replaying changeset history.

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tfsync_core::{SyncError, DEFAULT_REMOTE};

mod commands;

#[derive(Parser)]
#[command(name = "tfsync")]
#[command(about = "Replay centralized changeset history into a local commit graph", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a repository tracking one server folder
    Init {
        /// Server collection URL
        url: String,
        /// Server path of the tracked folder (e.g. $/Project/Trunk)
        repository: String,
        /// Remote id
        #[arg(long, default_value = DEFAULT_REMOTE)]
        remote: String,
        /// Regex over repo-relative paths that are never replayed
        #[arg(long)]
        ignore_paths: Option<String>,
        /// Omit the git-tfs-id trailer from commit messages
        #[arg(long)]
        no_meta_data: bool,
        /// Account used against the server
        #[arg(long)]
        username: Option<String>,
    },
    /// Fetch new changesets
    Fetch {
        /// Remote id
        #[arg(long, default_value = DEFAULT_REMOTE)]
        remote: String,
        /// Changeset script to replay
        #[arg(long, env = "TFSYNC_SCRIPT")]
        script: PathBuf,
    },
    /// Seed an empty remote from the latest changeset only
    QuickClone {
        /// Remote id
        #[arg(long, default_value = DEFAULT_REMOTE)]
        remote: String,
        /// Changeset script to replay
        #[arg(long, env = "TFSYNC_SCRIPT")]
        script: PathBuf,
    },
    /// Show fetched commits, newest first
    Log {
        /// Remote id
        #[arg(long, default_value = DEFAULT_REMOTE)]
        remote: String,
        /// Maximum number of commits to show
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Verify repository integrity
    Verify {
        /// Re-hash every reachable object (slow)
        #[arg(long)]
        objects: bool,
    },
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init {
            url,
            repository,
            remote,
            ignore_paths,
            no_meta_data,
            username,
        } => commands::init::run(
            &url,
            &repository,
            &remote,
            ignore_paths,
            no_meta_data,
            username,
        ),
        Commands::Fetch { remote, script } => commands::fetch::run(&remote, &script),
        Commands::QuickClone { remote, script } => commands::quick_clone::run(&remote, &script),
        Commands::Log {
            remote,
            limit,
            format,
        } => commands::log::run(&remote, limit, &format),
        Commands::Verify { objects } => commands::verify::run(objects),
    }
}

fn main() -> ExitCode {
    // Respects RUST_LOG (e.g. RUST_LOG=tfsync_core=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            if let Some(hint) = e
                .downcast_ref::<SyncError>()
                .and_then(SyncError::recovery_suggestion)
            {
                eprintln!("{} {}", style("hint:").cyan(), hint);
            }
            ExitCode::FAILURE
        }
    }
}
