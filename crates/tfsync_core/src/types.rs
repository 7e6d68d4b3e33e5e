//! Core data types: source-side changesets and store-side trees and commits.

use crate::error::{Result, SyncError};
use crate::ObjectId;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::collections::BTreeSet;
use std::fmt;
use std::io::{Cursor, Read};
use std::str::FromStr;
use std::sync::Arc;

// === Source side ===

/// One kind of change the source system can report for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeKind {
    /// Item was added.
    Add,
    /// Item content changed.
    Edit,
    /// Item was deleted.
    Delete,
    /// Item was moved to a new path.
    Rename,
    /// Change came from a merge.
    Merge,
    /// Item was branched from another path.
    Branch,
    /// A deleted item was restored.
    Undelete,
    /// Item encoding changed.
    Encoding,
}

impl ChangeKind {
    const ALL: [ChangeKind; 8] = [
        ChangeKind::Add,
        ChangeKind::Edit,
        ChangeKind::Delete,
        ChangeKind::Rename,
        ChangeKind::Merge,
        ChangeKind::Branch,
        ChangeKind::Undelete,
        ChangeKind::Encoding,
    ];

    /// Name used by the source system ("Add", "Edit", ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Edit => "Edit",
            Self::Delete => "Delete",
            Self::Rename => "Rename",
            Self::Merge => "Merge",
            Self::Branch => "Branch",
            Self::Undelete => "Undelete",
            Self::Encoding => "Encoding",
        }
    }
}

/// The set of change kinds carried by one change.
///
/// A single change may combine several kinds, e.g. `Rename, Edit` or
/// `Rename, Delete`.
///
/// # Examples
///
/// ```
/// use tfsync_core::{ChangeKind, ChangeType};
///
/// let ct: ChangeType = "Rename, Edit".parse().unwrap();
/// assert!(ct.is_rename());
/// assert!(ct.includes_one_of(&[ChangeKind::Delete, ChangeKind::Edit]));
/// assert!(!ct.is_delete());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ChangeType(BTreeSet<ChangeKind>);

impl ChangeType {
    /// Builds a change type from its kinds.
    pub fn new(kinds: impl IntoIterator<Item = ChangeKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    /// True if any of `kinds` is part of this change type.
    pub fn includes_one_of(&self, kinds: &[ChangeKind]) -> bool {
        kinds.iter().any(|k| self.0.contains(k))
    }

    /// True if the change deletes the item.
    pub fn is_delete(&self) -> bool {
        self.0.contains(&ChangeKind::Delete)
    }

    /// True if the change moves the item.
    pub fn is_rename(&self) -> bool {
        self.0.contains(&ChangeKind::Rename)
    }

    /// True if the change adds the item.
    pub fn is_add(&self) -> bool {
        self.0.contains(&ChangeKind::Add)
    }

    /// True if the change edits the item.
    pub fn is_edit(&self) -> bool {
        self.0.contains(&ChangeKind::Edit)
    }

    /// True if the change came from a merge.
    pub fn is_merge(&self) -> bool {
        self.0.contains(&ChangeKind::Merge)
    }

    /// Iterates the kinds in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = ChangeKind> + '_ {
        self.0.iter().copied()
    }
}

impl From<ChangeKind> for ChangeType {
    fn from(kind: ChangeKind) -> Self {
        Self::new([kind])
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("None");
        }
        let names: Vec<&str> = self.kinds().map(ChangeKind::name).collect();
        f.write_str(&names.join(", "))
    }
}

impl FromStr for ChangeType {
    type Err = SyncError;

    /// Parses `"Add"`, `"Rename, Edit"` or `"Rename|Delete"`.
    fn from_str(s: &str) -> Result<Self> {
        let mut kinds = BTreeSet::new();
        for part in s.split(|c: char| c == ',' || c == '|') {
            let part = part.trim();
            if part.is_empty() || part.eq_ignore_ascii_case("none") {
                continue;
            }
            let kind = ChangeKind::ALL
                .iter()
                .copied()
                .find(|k| k.name().eq_ignore_ascii_case(part))
                .ok_or_else(|| SyncError::Deserialization(format!("unknown change type: {part}")))?;
            kinds.insert(kind);
        }
        Ok(Self(kinds))
    }
}

/// Whether a source item is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    /// A versioned file with content.
    File,
    /// A folder; never written to the store.
    Folder,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("File"),
            Self::Folder => f.write_str("Folder"),
        }
    }
}

impl FromStr for ItemType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("file") {
            Ok(Self::File)
        } else if s.eq_ignore_ascii_case("folder") {
            Ok(Self::Folder)
        } else {
            Err(SyncError::Deserialization(format!("unknown item type: {s}")))
        }
    }
}

/// On-demand access to an item's bytes.
///
/// Only called for live file items that are actually written to the
/// staging index.
pub trait ItemContent: Send + Sync {
    /// Opens a fresh reader over the item's content.
    fn open(&self) -> Result<Box<dyn Read + Send>>;
}

impl ItemContent for Vec<u8> {
    fn open(&self) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.clone())))
    }
}

/// One version of a file or folder on the source server.
#[derive(Clone)]
pub struct Item {
    /// Identity of the item; stable across renames.
    pub item_id: i64,
    /// Server path, e.g. `$/Project/Trunk/src/main.c`.
    pub server_path: String,
    /// File or folder.
    pub item_type: ItemType,
    /// Nonzero when this version is a tombstone.
    pub deletion_id: i64,
    /// Changeset in which this version was last changed.
    pub changeset_id: i64,
    /// Size of the content in bytes.
    pub content_length: u64,
    /// Download capability; `None` for folders and tombstones.
    pub content: Option<Arc<dyn ItemContent>>,
}

impl Item {
    /// A live file item with in-memory content.
    pub fn file(item_id: i64, server_path: &str, changeset_id: i64, content: &[u8]) -> Self {
        Self {
            item_id,
            server_path: server_path.to_string(),
            item_type: ItemType::File,
            deletion_id: 0,
            changeset_id,
            content_length: content.len() as u64,
            content: Some(Arc::new(content.to_vec())),
        }
    }

    /// A folder item.
    pub fn folder(item_id: i64, server_path: &str, changeset_id: i64) -> Self {
        Self {
            item_id,
            server_path: server_path.to_string(),
            item_type: ItemType::Folder,
            deletion_id: 0,
            changeset_id,
            content_length: 0,
            content: None,
        }
    }

    /// Marks this version as a tombstone and drops its content.
    pub fn deleted(mut self, deletion_id: i64) -> Self {
        self.deletion_id = deletion_id;
        self.content = None;
        self
    }

    /// True unless this version is a tombstone.
    pub fn is_live(&self) -> bool {
        self.deletion_id == 0
    }

    /// True for file items.
    pub fn is_file(&self) -> bool {
        self.item_type == ItemType::File
    }

    /// Opens the item's content for download.
    ///
    /// # Errors
    ///
    /// Returns `ContentUnavailable` when the item carries no content.
    pub fn download(&self) -> Result<Box<dyn Read + Send>> {
        match &self.content {
            Some(content) => content.open(),
            None => Err(SyncError::ContentUnavailable(self.server_path.clone())),
        }
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("item_id", &self.item_id)
            .field("server_path", &self.server_path)
            .field("item_type", &self.item_type)
            .field("deletion_id", &self.deletion_id)
            .field("changeset_id", &self.changeset_id)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// One path-level change inside a changeset.
#[derive(Debug, Clone)]
pub struct Change {
    /// What happened to the item.
    pub change_type: ChangeType,
    /// The item version after the change.
    pub item: Item,
}

/// One atomic, numbered checkin on the source server.
#[derive(Debug, Clone)]
pub struct Changeset {
    /// Monotonic changeset number.
    pub id: i64,
    /// Changes in source order.
    pub changes: Vec<Change>,
    /// Source-system user name of the committer.
    pub committer: String,
    /// Checkin time (Unix seconds).
    pub creation_date: i64,
    /// Checkin comment.
    pub comment: String,
}

/// A resolved user identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    /// Human-readable name.
    pub display_name: String,
    /// Mail address, possibly empty.
    pub mail_address: String,
}

// === Store side ===

/// File mode bits recorded on tree entries.
#[repr(u32)]
#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Directory.
    Tree = 0o040000,
    /// Regular, non-executable file.
    Regular = 0o100644,
    /// Executable file.
    Executable = 0o100755,
    /// Symbolic link.
    Symlink = 0o120000,
}

impl FileMode {
    /// Mode assigned to a path the replay has never seen a mode for.
    pub const NEW_FILE: FileMode = FileMode::Regular;

    /// Octal rendering as used by git (`100644`, `040000`, ...).
    pub fn as_octal(self) -> String {
        format!("{:06o}", self as u32)
    }
}

/// Directory listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    /// Entries, sorted by name.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Creates a new tree, sorting entries by name.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries }
    }
}

/// Entry in a tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// File or directory name (one path component).
    pub name: String,
    /// Blob or subtree.
    pub kind: TreeEntryKind,
    /// Mode bits.
    pub mode: FileMode,
    /// Blob or tree id.
    pub id: ObjectId,
}

/// Type of tree entry.
#[repr(u8)]
#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEntryKind {
    /// File content.
    Blob = 1,
    /// Subdirectory.
    Tree = 2,
}

/// Commit record produced for one replayed changeset.
///
/// This is also the persisted commit object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Root tree of the snapshot.
    pub tree: ObjectId,
    /// Previous replay's commit, if any.
    pub parents: Vec<ObjectId>,
    /// Changeset this commit represents.
    pub changeset_id: i64,
    /// Checkin time (Unix seconds).
    pub date: i64,
    /// Commit message.
    pub log: String,
    /// Author name; never blank.
    pub author_name: String,
    /// Author email; never blank.
    pub author_email: String,
    /// Committer name; never blank.
    pub committer_name: String,
    /// Committer email; never blank.
    pub committer_email: String,
}
