//! Repository verification command.

use super::spinner;
use anyhow::Result;
use console::style;
use tfsync_core::{SyncRepo, VerifyConfig};

/// Verify repository integrity.
pub fn run(objects: bool) -> Result<()> {
    let repo = SyncRepo::open(".")?;

    let config = VerifyConfig {
        check_objects: objects,
        ..Default::default()
    };

    let pb = spinner(if objects {
        "Verifying object integrity..."
    } else {
        "Verifying repository..."
    })?;
    let report = repo.verify(config)?;
    pb.finish_and_clear();

    println!();
    println!("{}", style("Verification Report:").bold());
    println!("  Refs checked:       {}", style(report.refs_checked).cyan());
    if !report.refs_dangling.is_empty() {
        println!(
            "  Dangling refs:      {}",
            style(report.refs_dangling.len()).yellow()
        );
        for ref_name in &report.refs_dangling {
            println!("    {} {}", style("⚠").yellow(), ref_name);
        }
    }

    println!("  Commits checked:    {}", style(report.commits_checked).cyan());
    for (label, ids) in [
        ("Invalid commits:  ", &report.commits_invalid),
        ("Out of order:     ", &report.commits_out_of_order),
    ] {
        if ids.is_empty() {
            continue;
        }
        println!("  {}  {}", label, style(ids.len()).red());
        for id in ids {
            println!("    {} {}", style("×").red(), id.as_hex());
        }
    }

    println!("  Objects checked:    {}", style(report.objects_checked).cyan());
    for (label, ids) in [
        ("Missing objects:  ", &report.objects_missing),
        ("Corrupted objects:", &report.objects_corrupted),
    ] {
        if ids.is_empty() {
            continue;
        }
        println!("  {}  {}", label, style(ids.len()).red());
        for id in ids {
            println!("    {} {}", style("×").red(), id.as_hex());
        }
    }

    println!();
    if report.has_issues() {
        println!("{}", style(&report.summary()).yellow().bold());
        println!();
        println!("{}", style("Recommendations:").bold());
        println!(
            "  {} Delete the affected remote's ref and {} to replay it",
            style("→").cyan(),
            style("tfsync fetch").cyan()
        );
    } else {
        println!("{} {}", style("✓").green(), style(&report.summary()).green());
    }

    Ok(())
}
