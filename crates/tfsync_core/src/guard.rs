//! Consistency check between the staging index and the last replayed commit.

use crate::error::{Result, SyncError};
use crate::plumbing::Plumbing;
use crate::staging::{Stage, StagingIndex};
use crate::ObjectId;
use tracing::{debug, warn};

/// Makes sure the staging index holds exactly the parent commit's tree
/// before a changeset is applied on top of it.
pub struct ConsistencyGuard<'p> {
    plumbing: &'p dyn Plumbing,
}

impl<'p> ConsistencyGuard<'p> {
    /// Creates a guard that reads expected trees through `plumbing`.
    pub fn new(plumbing: &'p dyn Plumbing) -> Self {
        Self { plumbing }
    }

    /// Reconciles `index` with `parent`.
    ///
    /// Without a parent the index must be empty and leftover state is
    /// discarded. With a parent, an index without state is seeded from the
    /// parent tree; a staged tree that disagrees with it is discarded and
    /// reseeded once.
    ///
    /// # Errors
    ///
    /// Returns `StagingInconsistent` when the index still disagrees with the
    /// parent tree after the reseed.
    pub fn ensure_clean(&self, index: &mut StagingIndex<'_>, parent: Option<ObjectId>) -> Result<()> {
        let Some(parent) = parent else {
            if index.has_state() {
                warn!(
                    entries = index.entries().len(),
                    "discarding leftover staging state before first replay"
                );
                index.clear()?;
            }
            return Ok(());
        };

        let expected = self.plumbing.tree_of(parent)?;
        if !index.has_state() {
            index.seed(expected)?;
        }

        let actual = index.materialize()?;
        if actual == expected {
            debug!(tree = %expected.short(), "staging index matches parent");
            return Ok(());
        }

        warn!(
            expected = %expected.short(),
            actual = %actual.short(),
            "staging index drifted from parent commit, reseeding"
        );
        index.clear()?;
        index.seed(expected)?;

        let actual = index.materialize()?;
        if actual != expected {
            return Err(SyncError::StagingInconsistent { expected, actual });
        }
        Ok(())
    }
}
