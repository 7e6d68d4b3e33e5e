//! Fetch new changesets into a remote.

use super::{load_script, spinner};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use tfsync_core::{FetchReport, SyncRepo};

/// Replay every changeset newer than the remote head.
pub fn run(remote: &str, script: &Path) -> Result<()> {
    let repo = SyncRepo::open(".")?;
    let source = load_script(script)?;

    let pb = spinner(&format!("Fetching {}...", remote))?;
    let progress = |n: usize| pb.set_message(format!("{} objects created...", n));
    let result = repo
        .remote(remote)?
        .on_progress(&progress)
        .fetch(&source, &source);
    pb.finish_and_clear();

    let report = result.with_context(|| format!("Fetch of remote '{}' failed", remote))?;
    print_report(remote, &report);
    Ok(())
}

/// Prints the outcome of a fetch.
pub fn print_report(remote: &str, report: &FetchReport) {
    match report.head {
        Some(head) if report.fetched > 0 => println!(
            "{} Fetched {} changeset(s) into {}, now at C{} ({})",
            style("✓").green(),
            style(report.fetched).cyan(),
            style(remote).bold(),
            report.last_changeset_id,
            head.short()
        ),
        Some(head) => println!(
            "{} is up to date at C{} ({})",
            style(remote).bold(),
            report.last_changeset_id,
            head.short()
        ),
        None => println!("{} Nothing to fetch for {}", style("→").cyan(), style(remote).bold()),
    }
}
