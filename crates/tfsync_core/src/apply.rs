//! Incremental replay of one changeset onto the staging index.

use crate::error::Result;
use crate::metadata::CommitMetadataBuilder;
use crate::order::order_changes;
use crate::paths::PathMapping;
use crate::source::ChangesetSource;
use crate::staging::Stage;
use crate::types::{Change, Changeset, Item, LogEntry};
use crate::ObjectId;
use tracing::{debug, warn};

/// Applies changesets on top of the parent tree held by a stage.
pub struct ChangeApplier<'a> {
    source: &'a dyn ChangesetSource,
    paths: &'a PathMapping,
    metadata: &'a CommitMetadataBuilder<'a>,
}

impl<'a> ChangeApplier<'a> {
    /// Creates an applier for one tracked folder.
    pub fn new(
        source: &'a dyn ChangesetSource,
        paths: &'a PathMapping,
        metadata: &'a CommitMetadataBuilder<'a>,
    ) -> Self {
        Self {
            source,
            paths,
            metadata,
        }
    }

    /// Applies every change of `changeset` to `stage` and returns the commit
    /// record for the resulting tree.
    ///
    /// Folder changes are ignored; a changeset touching only folders yields
    /// the parent's tree again.
    ///
    /// # Errors
    ///
    /// Content download failures and unsupported history queries propagate;
    /// the stage may then hold a partial result, which the consistency guard
    /// repairs before the next replay.
    pub fn apply(
        &self,
        changeset: &Changeset,
        stage: &mut dyn Stage,
        parent: Option<ObjectId>,
    ) -> Result<LogEntry> {
        for change in order_changes(&changeset.changes) {
            self.apply_change(change, stage)?;
        }
        let tree = stage.materialize()?;
        debug!(changeset = changeset.id, tree = %tree.short(), "applied changeset");
        Ok(self.metadata.build(changeset, tree, parent))
    }

    fn apply_change(&self, change: &Change, stage: &mut dyn Stage) -> Result<()> {
        let item = &change.item;
        if !item.is_file() {
            return Ok(());
        }
        let path = self.paths.resolve(&item.server_path);

        if change.change_type.is_rename() {
            match self.path_before_rename(item)? {
                Some(old) => {
                    if let Some(old_path) = self.paths.to_repo_path(&old) {
                        stage.remove(&old_path)?;
                    }
                }
                None => warn!(
                    path = %item.server_path,
                    changeset = item.changeset_id,
                    "no history found for renamed item, keeping any previous path"
                ),
            }
            if !change.change_type.is_delete() {
                self.update(item, path.as_deref(), stage)?;
            }
        } else if change.change_type.is_delete() {
            if let Some(path) = path {
                stage.remove(&path)?;
            }
        } else {
            self.update(item, path.as_deref(), stage)?;
        }
        Ok(())
    }

    fn update(&self, item: &Item, path: Option<&str>, stage: &mut dyn Stage) -> Result<()> {
        let Some(path) = path else {
            return Ok(());
        };
        if !item.is_live() {
            return Ok(());
        }
        let mut content = item.download()?;
        stage.upsert(path, &mut content)
    }

    /// Server path the item had just before this changeset.
    ///
    /// Asks for the item as of the previous changeset, then for the single
    /// most recent history entry. The first answer is taken as-is even if the
    /// item moved again in between.
    fn path_before_rename(&self, item: &Item) -> Result<Option<String>> {
        let previous = item.changeset_id - 1;
        if let Some(old) = self.source.item_at(item.item_id, previous)? {
            return Ok(Some(old.server_path));
        }

        let history = self.source.history_of(item, previous, 1)?;
        Ok(history
            .first()
            .and_then(|changeset| changeset.changes.first())
            .map(|change| change.item.server_path.clone()))
    }
}
