//! Commit metadata for a replayed changeset.

use crate::source::IdentityLookup;
use crate::types::{Changeset, Identity, LogEntry};
use crate::ObjectId;
use tracing::warn;

/// Name used when the committer cannot be resolved.
pub const UNKNOWN_USER_NAME: &str = "Unknown TFS user";

/// Email used when neither the identity nor the committer string has one.
pub const UNKNOWN_USER_EMAIL: &str = "unknown@tfs.local";

/// Builds [`LogEntry`] values from changesets.
///
/// Names and emails are never left blank: an empty value would let the
/// store fall back to a machine-local identity and the same changeset would
/// produce different commits on different machines.
pub struct CommitMetadataBuilder<'l> {
    identities: &'l dyn IdentityLookup,
}

impl<'l> CommitMetadataBuilder<'l> {
    /// Creates a builder resolving committers through `identities`.
    pub fn new(identities: &'l dyn IdentityLookup) -> Self {
        Self { identities }
    }

    /// Builds the commit record for `changeset` with root `tree`.
    pub fn build(&self, changeset: &Changeset, tree: ObjectId, parent: Option<ObjectId>) -> LogEntry {
        let identity = self.resolve(&changeset.committer);
        let (name, email) = author_fields(identity.as_ref(), &changeset.committer);

        LogEntry {
            tree,
            parents: parent.into_iter().collect(),
            changeset_id: changeset.id,
            date: changeset.creation_date,
            log: format!("{}\n", changeset.comment),
            author_name: name.clone(),
            author_email: email.clone(),
            committer_name: name,
            committer_email: email,
        }
    }

    fn resolve(&self, committer: &str) -> Option<Identity> {
        if committer.trim().is_empty() {
            return None;
        }
        match self.identities.lookup(committer) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(committer, error = %e, "identity lookup failed, using fallback");
                None
            }
        }
    }
}

fn author_fields(identity: Option<&Identity>, committer: &str) -> (String, String) {
    let name = identity
        .map(|id| id.display_name.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_USER_NAME);

    let email = identity
        .map(|id| id.mail_address.trim())
        .filter(|mail| !mail.is_empty())
        .or_else(|| Some(committer.trim()).filter(|c| !c.is_empty()))
        .unwrap_or(UNKNOWN_USER_EMAIL);

    (name.to_string(), email.to_string())
}
