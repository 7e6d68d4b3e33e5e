//! Fetching a tracked folder's history into the local store.

use crate::apply::ChangeApplier;
use crate::case::{CaseNormalizer, KnownPaths};
use crate::config::{RemoteConfig, ReplayConfig};
use crate::error::Result;
use crate::guard::ConsistencyGuard;
use crate::metadata::CommitMetadataBuilder;
use crate::paths::PathMapping;
use crate::plumbing::Plumbing;
use crate::refs::{remote_ref_name, Refs};
use crate::replicate::FullTreeReplicator;
use crate::source::{ChangesetIter, ChangesetSource, IdentityLookup};
use crate::staging::StagingIndex;
use crate::types::{Changeset, LogEntry};
use crate::{ObjectId, ObjectStore};
use std::path::{Path, PathBuf};
use tracing::info;

/// Outcome of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    /// Number of commits written.
    pub fetched: usize,
    /// Changeset id of the remote head after the fetch (0 when empty).
    pub last_changeset_id: i64,
    /// Remote head after the fetch.
    pub head: Option<ObjectId>,
}

/// One tracked folder bound to the local store.
pub struct Remote<'r> {
    id: String,
    config: RemoteConfig,
    paths: PathMapping,
    store: &'r ObjectStore,
    refs: &'r Refs,
    replay: &'r ReplayConfig,
    index_file: PathBuf,
    on_progress: Option<&'r dyn Fn(usize)>,
}

impl<'r> Remote<'r> {
    /// Binds remote `id` to a store.
    ///
    /// The staging index lives at `<index_dir>/<id>`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` if the remote's ignore rule does not compile.
    pub fn new(
        id: &str,
        config: RemoteConfig,
        store: &'r ObjectStore,
        refs: &'r Refs,
        replay: &'r ReplayConfig,
        index_dir: &Path,
    ) -> Result<Self> {
        let paths = PathMapping::new(&config.repository, config.ignore_paths.as_deref())?;
        Ok(Self {
            id: id.to_string(),
            config,
            paths,
            store,
            refs,
            replay,
            index_file: index_dir.join(id),
            on_progress: None,
        })
    }

    /// Registers a callback for full-tree copy progress.
    pub fn on_progress(mut self, callback: &'r dyn Fn(usize)) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// The remote id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The remote's configuration.
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Name of the ref tracking this remote.
    pub fn ref_name(&self) -> String {
        remote_ref_name(&self.id)
    }

    /// Commit of the last replayed changeset.
    pub fn head(&self) -> Result<Option<ObjectId>> {
        self.refs.read_ref_opt(&self.ref_name())
    }

    /// Changeset id of the last replayed changeset, 0 before the first fetch.
    pub fn last_changeset_id(&self) -> Result<i64> {
        self.changeset_id_of(self.head()?)
    }

    /// Replays every changeset newer than the remote head.
    ///
    /// The first changeset of an empty remote is copied as a full tree;
    /// later ones are applied incrementally.
    ///
    /// # Errors
    ///
    /// A failure while replaying a changeset is returned as
    /// `ChangesetFailed`; commits for earlier changesets of the same fetch
    /// are kept and the ref points at the last of them.
    pub fn fetch(
        &self,
        source: &dyn ChangesetSource,
        identities: &dyn IdentityLookup,
    ) -> Result<FetchReport> {
        let head = self.head()?;
        let start = self.changeset_id_of(head)?;
        info!(remote = %self.id, tracking = %self.config, from = start, "fetching");
        let changesets = source.changesets_after(self.paths.repository(), start)?;
        self.replay_all(source, identities, head, changesets)
    }

    /// Seeds an empty remote from the latest changeset only, skipping the
    /// history before it. A remote that already has commits is fetched
    /// normally.
    pub fn quick_fetch(
        &self,
        source: &dyn ChangesetSource,
        identities: &dyn IdentityLookup,
    ) -> Result<FetchReport> {
        let head = self.head()?;
        if head.is_some() {
            return self.fetch(source, identities);
        }
        let latest: ChangesetIter<'_> = match source.latest_changeset()? {
            Some(changeset) => {
                info!(remote = %self.id, changeset = changeset.id, "quick fetch");
                Box::new(std::iter::once(Ok(changeset)))
            }
            None => Box::new(std::iter::empty()),
        };
        self.replay_all(source, identities, None, latest)
    }

    /// Commits reachable from the head through first parents, newest first.
    pub fn history(&self, limit: Option<usize>) -> Result<Vec<(ObjectId, LogEntry)>> {
        let mut out = Vec::new();
        let mut next = self.head()?;
        while let Some(id) = next {
            if limit.is_some_and(|limit| out.len() >= limit) {
                break;
            }
            let entry = self.store.get_commit(id)?;
            next = entry.parents.first().copied();
            out.push((id, entry));
        }
        Ok(out)
    }

    fn changeset_id_of(&self, commit: Option<ObjectId>) -> Result<i64> {
        match commit {
            Some(id) => Ok(self.store.get_commit(id)?.changeset_id),
            None => Ok(0),
        }
    }

    fn replay_all(
        &self,
        source: &dyn ChangesetSource,
        identities: &dyn IdentityLookup,
        head: Option<ObjectId>,
        changesets: ChangesetIter<'_>,
    ) -> Result<FetchReport> {
        let mut known = KnownPaths::new(self.replay.ignore_case);
        if let Some(commit) = head {
            known.seed(&self.store.read_tree(self.store.tree_of(commit)?)?);
        }
        let mut index = StagingIndex::open(self.store, &self.index_file, &mut known)?;
        let guard = ConsistencyGuard::new(self.store);
        let metadata = CommitMetadataBuilder::new(identities);

        let mut report = FetchReport {
            fetched: 0,
            last_changeset_id: self.changeset_id_of(head)?,
            head,
        };
        for changeset in changesets {
            let changeset = changeset?;
            let (commit, changeset_id) = self
                .replay_one(source, &metadata, &guard, &mut index, &changeset, report.head)
                .map_err(|e| e.in_changeset(changeset.id))?;
            report.fetched += 1;
            report.last_changeset_id = changeset_id;
            report.head = Some(commit);
        }
        Ok(report)
    }

    fn replay_one(
        &self,
        source: &dyn ChangesetSource,
        metadata: &CommitMetadataBuilder<'_>,
        guard: &ConsistencyGuard<'_>,
        index: &mut StagingIndex<'_>,
        changeset: &Changeset,
        parent: Option<ObjectId>,
    ) -> Result<(ObjectId, i64)> {
        guard.ensure_clean(index, parent)?;

        let mut stage = CaseNormalizer::new(&mut *index);
        let mut entry = match parent {
            None => {
                let mut replicator = FullTreeReplicator::new(source, &self.paths)
                    .with_progress_interval(self.replay.progress_interval());
                if let Some(callback) = self.on_progress {
                    replicator = replicator.on_progress(callback);
                }
                replicator.replicate(changeset, &mut stage, metadata, None)?
            }
            Some(_) => ChangeApplier::new(source, &self.paths, metadata).apply(
                changeset,
                &mut stage,
                parent,
            )?,
        };

        if !self.config.no_meta_data {
            entry.log = format!("{}\n{}\n", entry.log, self.trailer(entry.changeset_id));
        }
        let commit = self.store.put_commit(&entry)?;
        self.refs.write_ref(&self.ref_name(), commit)?;
        info!(remote = %self.id, "C{} = {}", entry.changeset_id, commit.short());
        Ok((commit, entry.changeset_id))
    }

    fn trailer(&self, changeset_id: i64) -> String {
        format!(
            "git-tfs-id: [{}]{};C{}",
            self.config.url,
            self.paths.repository(),
            changeset_id
        )
    }
}
