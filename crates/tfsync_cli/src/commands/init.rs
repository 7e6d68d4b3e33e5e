//! Initialize a new tfsync repository.

use anyhow::{Context, Result};
use console::style;
use tfsync_core::{RemoteConfig, SyncRepo};

/// Initialize a repository in the current directory and register one remote.
pub fn run(
    url: &str,
    repository: &str,
    remote: &str,
    ignore_paths: Option<String>,
    no_meta_data: bool,
    username: Option<String>,
) -> Result<()> {
    let mut repo = SyncRepo::init(".").context("Failed to initialize tfsync repository")?;
    repo.add_remote(
        remote,
        RemoteConfig {
            url: url.to_string(),
            repository: repository.to_string(),
            ignore_paths,
            no_meta_data,
            username,
        },
    )
    .with_context(|| format!("Failed to add remote '{}'", remote))?;

    println!("Initialized tfsync repository in .tfsync/");
    println!();
    println!("Directory structure:");
    println!("  .tfsync/objects/   - Content-addressed object storage");
    println!("  .tfsync/refs/      - Remote-tracking refs");
    println!("  .tfsync/index/     - Per-remote staging indexes (gitignored)");
    println!();
    if let Some(tracked) = repo.config().remotes.get(remote) {
        println!("Remote {} tracks {}", style(remote).cyan(), tracked);
    }
    println!("Configuration written to .tfsync/config.toml");

    Ok(())
}
