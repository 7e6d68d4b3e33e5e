//! Seed a remote from its latest changeset.

use super::fetch::print_report;
use super::{load_script, spinner};
use anyhow::{Context, Result};
use std::path::Path;
use tfsync_core::SyncRepo;

/// Copy the tree of the latest changeset without replaying earlier history.
pub fn run(remote: &str, script: &Path) -> Result<()> {
    let repo = SyncRepo::open(".")?;
    let source = load_script(script)?;

    let pb = spinner(&format!("Cloning latest changeset into {}...", remote))?;
    let progress = |n: usize| pb.set_message(format!("{} objects created...", n));
    let result = repo
        .remote(remote)?
        .on_progress(&progress)
        .quick_fetch(&source, &source);
    pb.finish_and_clear();

    let report = result.with_context(|| format!("Quick clone of remote '{}' failed", remote))?;
    print_report(remote, &report);
    Ok(())
}
