//! Collaborators the replay engine consumes: the changeset source and the
//! identity directory.

use crate::error::{Result, SyncError};
use crate::types::{Changeset, Identity, Item};

/// Lazily produced changesets, ascending by id.
pub type ChangesetIter<'s> = Box<dyn Iterator<Item = Result<Changeset>> + 's>;

/// Lazily produced items of a full tree listing.
pub type ItemIter<'s> = Box<dyn Iterator<Item = Result<Item>> + 's>;

/// Remote history provider.
///
/// Sequences are built fresh on every call, so a fetch can resume from any
/// persisted changeset id.
pub trait ChangesetSource {
    /// The most recent changeset under the server root, if any.
    fn latest_changeset(&self) -> Result<Option<Changeset>>;

    /// Changesets touching `path` with id strictly greater than `start`.
    fn changesets_after<'s>(&'s self, path: &str, start: i64) -> Result<ChangesetIter<'s>>;

    /// Every item (files and folders) under `path` as of `changeset_id`.
    fn full_tree_at<'s>(&'s self, path: &str, changeset_id: i64) -> Result<ItemIter<'s>>;

    /// Changesets that touched `item`, most recent first, at or before
    /// `at_or_before`, at most `depth` of them.
    fn history_of(&self, item: &Item, at_or_before: i64, depth: usize) -> Result<Vec<Changeset>> {
        let _ = (item, at_or_before, depth);
        Err(SyncError::NotSupported {
            operation: "history_of",
        })
    }

    /// The version of item `item_id` as of `changeset_id`, if it existed.
    fn item_at(&self, item_id: i64, changeset_id: i64) -> Result<Option<Item>> {
        let _ = (item_id, changeset_id);
        Err(SyncError::NotSupported {
            operation: "item_at",
        })
    }

    /// A single changeset by id.
    fn changeset(&self, id: i64) -> Result<Changeset> {
        let _ = id;
        Err(SyncError::NotSupported {
            operation: "changeset",
        })
    }
}

/// Identity directory.
pub trait IdentityLookup {
    /// Resolves a source-system user name.
    fn lookup(&self, username: &str) -> Result<Option<Identity>>;
}

/// Lookup that never resolves anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdentities;

impl IdentityLookup for NoIdentities {
    fn lookup(&self, _username: &str) -> Result<Option<Identity>> {
        Ok(None)
    }
}
