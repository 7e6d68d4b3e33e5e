//! Seeding a remote from a full tree listing.

use crate::error::Result;
use crate::metadata::CommitMetadataBuilder;
use crate::paths::PathMapping;
use crate::source::ChangesetSource;
use crate::staging::Stage;
use crate::types::{Changeset, LogEntry};
use crate::ObjectId;
use std::time::{Duration, Instant};
use tracing::info;

/// Default wall-clock time between progress notifications.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Result of copying a full tree into a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaOutcome {
    /// Tree materialized from the stage after the copy.
    pub tree: ObjectId,
    /// Highest changeset id reported by any copied item, or the requested
    /// changeset when nothing was copied.
    pub max_changeset_id: i64,
    /// Number of file items visited.
    pub items_copied: usize,
}

/// Writes every live file of a changeset's full tree into a stage.
pub struct FullTreeReplicator<'a> {
    source: &'a dyn ChangesetSource,
    paths: &'a PathMapping,
    progress_interval: Duration,
    on_progress: Option<&'a dyn Fn(usize)>,
}

impl<'a> FullTreeReplicator<'a> {
    /// Creates a replicator for one tracked folder.
    pub fn new(source: &'a dyn ChangesetSource, paths: &'a PathMapping) -> Self {
        Self {
            source,
            paths,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            on_progress: None,
        }
    }

    /// Overrides the time between progress notifications.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Registers a callback receiving the running item count on every
    /// progress notification.
    pub fn on_progress(mut self, callback: &'a dyn Fn(usize)) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Copies the tree at `changeset_id` into `stage`.
    pub fn copy_tree(&self, changeset_id: i64, stage: &mut dyn Stage) -> Result<ReplicaOutcome> {
        let mut last_report = Instant::now();
        let mut items_copied = 0;
        let mut max_changeset_id = 0;

        for item in self.source.full_tree_at(self.paths.repository(), changeset_id)? {
            let item = item?;
            if !item.is_file() {
                continue;
            }
            let Some(path) = self.paths.resolve(&item.server_path) else {
                continue;
            };

            if item.is_live() {
                let mut content = item.download()?;
                stage.upsert(&path, &mut content)?;
            }
            max_changeset_id = max_changeset_id.max(item.changeset_id);

            items_copied += 1;
            if last_report.elapsed() >= self.progress_interval {
                info!("{} objects created...", items_copied);
                if let Some(callback) = self.on_progress {
                    callback(items_copied);
                }
                last_report = Instant::now();
            }
        }

        if items_copied == 0 {
            max_changeset_id = changeset_id;
        }
        Ok(ReplicaOutcome {
            tree: stage.materialize()?,
            max_changeset_id,
            items_copied,
        })
    }

    /// Copies the tree of `changeset` and builds its commit record.
    ///
    /// The commit is stamped with the newest changeset any copied item
    /// reports, whose metadata is fetched from the source when it differs
    /// from `changeset`.
    pub fn replicate(
        &self,
        changeset: &Changeset,
        stage: &mut dyn Stage,
        metadata: &CommitMetadataBuilder<'_>,
        parent: Option<ObjectId>,
    ) -> Result<LogEntry> {
        let outcome = self.copy_tree(changeset.id, stage)?;
        info!(
            changeset = changeset.id,
            stamped = outcome.max_changeset_id,
            items = outcome.items_copied,
            "copied full tree"
        );

        let fetched;
        let logged = if outcome.max_changeset_id == changeset.id {
            changeset
        } else {
            fetched = self.source.changeset(outcome.max_changeset_id)?;
            &fetched
        };
        Ok(metadata.build(logged, outcome.tree, parent))
    }
}
