//! Repository verification.
//!
//! Walks every remote ref's commit chain and checks that the objects it
//! reaches are present and well-formed.

use crate::error::{Result, SyncError};
use crate::object_id::ObjectId;
use crate::object_store::ObjectStore;
use crate::refs::Refs;
use crate::types::TreeEntryKind;
use std::collections::HashSet;

/// Configuration for repository verification.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Re-hash every reachable blob instead of only checking it exists (slow).
    pub check_objects: bool,

    /// Verify refs point to stored objects.
    pub check_refs: bool,

    /// Walk commit chains, their trees and their changeset ordering.
    pub check_commits: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            check_objects: false,
            check_refs: true,
            check_commits: true,
        }
    }
}

/// Report from repository verification.
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Number of refs checked.
    pub refs_checked: usize,

    /// Refs pointing to objects that are not stored.
    pub refs_dangling: Vec<String>,

    /// Number of commits checked.
    pub commits_checked: usize,

    /// Commits that fail to load or whose tree is broken.
    pub commits_invalid: Vec<ObjectId>,

    /// Commits whose parent does not carry a lower changeset id.
    pub commits_out_of_order: Vec<ObjectId>,

    /// Number of distinct trees and blobs checked.
    pub objects_checked: usize,

    /// Objects referenced but absent from the store.
    pub objects_missing: Vec<ObjectId>,

    /// Objects that fail to decode or re-hash.
    pub objects_corrupted: Vec<ObjectId>,
}

impl VerifyReport {
    /// Returns true if any issues were found.
    pub fn has_issues(&self) -> bool {
        !self.refs_dangling.is_empty()
            || !self.commits_invalid.is_empty()
            || !self.commits_out_of_order.is_empty()
            || !self.objects_missing.is_empty()
            || !self.objects_corrupted.is_empty()
    }

    /// Returns a summary message.
    pub fn summary(&self) -> String {
        if !self.has_issues() {
            return "Repository is healthy. No issues found.".to_string();
        }
        let counts = [
            (self.refs_dangling.len(), "dangling refs"),
            (self.commits_invalid.len(), "invalid commits"),
            (self.commits_out_of_order.len(), "commits out of changeset order"),
            (self.objects_missing.len(), "missing objects"),
            (self.objects_corrupted.len(), "corrupted objects"),
        ];
        let issues: Vec<String> = counts
            .iter()
            .filter(|(n, _)| *n > 0)
            .map(|(n, what)| format!("{} {}", n, what))
            .collect();
        format!("Repository has issues: {}", issues.join(", "))
    }
}

/// Verify repository integrity.
///
/// # Examples
///
/// ```no_run
/// use tfsync_core::{verify, SyncRepo, VerifyConfig};
///
/// let repo = SyncRepo::open(".").unwrap();
/// let report = verify(repo.refs(), repo.object_store(), VerifyConfig::default()).unwrap();
///
/// if report.has_issues() {
///     eprintln!("{}", report.summary());
/// }
/// ```
pub fn verify(refs: &Refs, store: &ObjectStore, config: VerifyConfig) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    let heads = refs.list_refs()?;

    if config.check_refs {
        for (name, id) in &heads {
            report.refs_checked += 1;
            if !store.exists(*id) {
                report.refs_dangling.push(format!("refs/{}", name));
            }
        }
    }

    if config.check_commits {
        let mut walker = Walker {
            store,
            rehash: config.check_objects,
            seen_commits: HashSet::new(),
            seen_objects: HashSet::new(),
        };
        for (_, head) in &heads {
            walker.walk_chain(*head, &mut report);
        }
    }

    Ok(report)
}

struct Walker<'s> {
    store: &'s ObjectStore,
    rehash: bool,
    seen_commits: HashSet<ObjectId>,
    seen_objects: HashSet<ObjectId>,
}

impl Walker<'_> {
    fn walk_chain(&mut self, head: ObjectId, report: &mut VerifyReport) {
        let mut next = Some((head, None::<i64>));
        while let Some((id, child_changeset)) = next.take() {
            if !self.seen_commits.insert(id) {
                break;
            }
            report.commits_checked += 1;

            let commit = match self.store.get_commit(id) {
                Ok(commit) => commit,
                Err(_) => {
                    report.commits_invalid.push(id);
                    break;
                }
            };

            if let Some(child) = child_changeset {
                if commit.changeset_id >= child {
                    report.commits_out_of_order.push(id);
                }
            }
            if !self.check_tree(commit.tree, report) {
                report.commits_invalid.push(id);
            }

            for parent in commit.parents.iter().skip(1) {
                report.commits_invalid.push(*parent);
            }
            next = commit
                .parents
                .first()
                .map(|parent| (*parent, Some(commit.changeset_id)));
        }
    }

    /// Returns false if the tree or anything below it is missing or broken.
    fn check_tree(&mut self, id: ObjectId, report: &mut VerifyReport) -> bool {
        if !self.seen_objects.insert(id) {
            return !report.objects_missing.contains(&id) && !report.objects_corrupted.contains(&id);
        }
        report.objects_checked += 1;

        let tree = match self.store.get_tree(id) {
            Ok(tree) => tree,
            Err(e) => {
                self.record(id, &e, report);
                return false;
            }
        };

        let mut healthy = true;
        for entry in &tree.entries {
            let ok = match entry.kind {
                TreeEntryKind::Tree => self.check_tree(entry.id, report),
                TreeEntryKind::Blob => self.check_blob(entry.id, report),
            };
            healthy &= ok;
        }
        healthy
    }

    fn check_blob(&mut self, id: ObjectId, report: &mut VerifyReport) -> bool {
        if !self.seen_objects.insert(id) {
            return !report.objects_missing.contains(&id) && !report.objects_corrupted.contains(&id);
        }
        report.objects_checked += 1;

        let result = if self.rehash {
            self.store.verify_object(id)
        } else if self.store.exists(id) {
            Ok(())
        } else {
            Err(SyncError::ObjectNotFound(id.as_hex()))
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                self.record(id, &e, report);
                false
            }
        }
    }

    fn record(&self, id: ObjectId, error: &SyncError, report: &mut VerifyReport) {
        match error {
            SyncError::ObjectNotFound(_) => report.objects_missing.push(id),
            _ => report.objects_corrupted.push(id),
        }
    }
}
