//! CLI commands.

pub mod fetch;
pub mod init;
pub mod log;
pub mod quick_clone;
pub mod verify;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tfsync_core::ScriptedSource;

/// Loads a changeset script from disk.
pub fn load_script(path: &Path) -> Result<ScriptedSource> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    ScriptedSource::parse(&text).with_context(|| format!("Invalid script {}", path.display()))
}

/// A steadily ticking spinner with a message.
pub fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}
