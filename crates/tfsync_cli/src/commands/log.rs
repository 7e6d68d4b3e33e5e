//! Show the commits of a remote.

use anyhow::{Context, Result};
use chrono::DateTime;
use console::style;
use serde_json::json;
use tfsync_core::SyncRepo;

/// Print the first-parent history of a remote, newest first.
pub fn run(remote: &str, limit: Option<usize>, format: &str) -> Result<()> {
    let repo = SyncRepo::open(".")?;
    let history = repo
        .log(remote, limit)
        .with_context(|| format!("Failed to read history of remote '{}'", remote))?;

    match format {
        "json" => {
            let commits: Vec<_> = history
                .iter()
                .map(|(id, entry)| {
                    json!({
                        "commit": id.as_hex(),
                        "tree": entry.tree.as_hex(),
                        "parents": entry.parents.iter().map(|p| p.as_hex()).collect::<Vec<_>>(),
                        "changeset": entry.changeset_id,
                        "date": entry.date,
                        "author": { "name": entry.author_name, "email": entry.author_email },
                        "committer": { "name": entry.committer_name, "email": entry.committer_email },
                        "message": entry.log,
                    })
                })
                .collect();
            let json = serde_json::to_string_pretty(&commits).context("Failed to serialize to JSON")?;
            println!("{}", json);
        }
        "text" => {
            if let Some(config) = repo.config().remotes.get(remote) {
                println!("{} {}", style(format!("remote {}:", remote)).bold(), config);
                println!();
            }
            if history.is_empty() {
                println!("No commits fetched for {} yet.", style(remote).bold());
            }
            for (id, entry) in &history {
                let date = DateTime::from_timestamp(entry.date, 0).unwrap_or_default();
                println!(
                    "{} {}",
                    style(format!("commit {}", id.as_hex())).yellow(),
                    style(format!("(C{})", entry.changeset_id)).cyan()
                );
                println!("Author: {} <{}>", entry.author_name, entry.author_email);
                println!("Date:   {}", date.format("%Y-%m-%d %H:%M:%S UTC"));
                println!();
                for line in entry.log.lines() {
                    println!("    {}", line);
                }
                println!();
            }
        }
        other => anyhow::bail!("Unsupported format: {}. Use 'json' or 'text'.", other),
    }
    Ok(())
}
