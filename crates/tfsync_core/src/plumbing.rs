//! Object-store plumbing used by the replay engine.
//!
//! The engine never touches the object layout directly; it stages blobs and
//! asks the store to materialize or read back whole trees through [`Plumbing`].

use crate::error::{Result, SyncError};
use crate::types::{FileMode, Tree, TreeEntry, TreeEntryKind};
use crate::{ObjectId, ObjectStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

/// One staged file: its mode and content blob.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagedEntry {
    /// Mode written to the tree entry.
    pub mode: FileMode,
    /// Content blob.
    pub blob: ObjectId,
}

/// Flat map from repo-relative path (`dir/sub/file.txt`) to staged entry.
pub type StagedEntries = BTreeMap<String, StagedEntry>;

/// Store operations the replay engine consumes.
pub trait Plumbing {
    /// Persists file content and returns its blob id.
    fn write_blob(&self, content: &mut dyn Read) -> Result<ObjectId>;

    /// Materializes a flat path map into a tree and returns the root tree id.
    ///
    /// Must be a pure function of `entries`.
    fn write_tree(&self, entries: &StagedEntries) -> Result<ObjectId>;

    /// Flattens an existing tree back into a path map.
    fn read_tree(&self, tree: ObjectId) -> Result<StagedEntries>;

    /// Returns the root tree recorded on a commit.
    fn tree_of(&self, commit: ObjectId) -> Result<ObjectId>;
}

impl Plumbing for ObjectStore {
    fn write_blob(&self, content: &mut dyn Read) -> Result<ObjectId> {
        self.put_blob_from(content)
    }

    fn write_tree(&self, entries: &StagedEntries) -> Result<ObjectId> {
        build_tree_from_paths(entries, self)
    }

    fn read_tree(&self, tree: ObjectId) -> Result<StagedEntries> {
        let mut out = StagedEntries::new();
        flatten_tree(self, tree, "", &mut out)?;
        Ok(out)
    }

    fn tree_of(&self, commit: ObjectId) -> Result<ObjectId> {
        Ok(self.get_commit(commit)?.tree)
    }
}

/// Builds nested trees bottom-up from a flat path map.
fn build_tree_from_paths(entries: &StagedEntries, store: &ObjectStore) -> Result<ObjectId> {
    // Map: directory path -> (name -> blob entry, or None for a subdirectory)
    let mut dir_structure: BTreeMap<String, BTreeMap<String, Option<StagedEntry>>> =
        BTreeMap::new();
    dir_structure.entry(String::new()).or_default();

    for (path, entry) in entries {
        let (dir_path, filename) = match path.rsplit_once('/') {
            Some((dir, name)) => (dir.to_string(), name.to_string()),
            None => (String::new(), path.clone()),
        };
        if filename.is_empty() {
            return Err(SyncError::Serialization(format!(
                "staged path {:?} has an empty file name",
                path
            )));
        }
        let siblings = dir_structure.entry(dir_path.clone()).or_default();
        if let Some(None) = siblings.get(&filename) {
            return Err(file_and_directory(path));
        }
        siblings.insert(filename, Some(*entry));

        // Register every ancestor directory in its parent
        let mut child = dir_path;
        while !child.is_empty() {
            let (parent, name) = match child.rsplit_once('/') {
                Some((parent, name)) => (parent.to_string(), name.to_string()),
                None => (String::new(), child.clone()),
            };
            let siblings = dir_structure.entry(parent.clone()).or_default();
            if let Some(Some(_)) = siblings.get(&name) {
                return Err(file_and_directory(&child));
            }
            siblings.insert(name, None);
            child = parent;
        }
    }

    // Deepest directories first, so every subtree id is known before its parent
    let mut sorted_dirs: Vec<String> = dir_structure.keys().cloned().collect();
    sorted_dirs.sort_by_key(|dir| std::cmp::Reverse(depth(dir)));

    let mut tree_cache: BTreeMap<String, ObjectId> = BTreeMap::new();
    for dir_path in sorted_dirs {
        let Some(children) = dir_structure.get(&dir_path) else {
            continue;
        };
        let mut tree_entries = Vec::with_capacity(children.len());

        for (name, staged) in children {
            let entry = match staged {
                Some(staged) => TreeEntry {
                    name: name.clone(),
                    kind: TreeEntryKind::Blob,
                    mode: staged.mode,
                    id: staged.blob,
                },
                None => {
                    let subdir = join(&dir_path, name);
                    let id = tree_cache.get(&subdir).copied().ok_or_else(|| {
                        SyncError::ObjectNotFound(format!("subtree for {}", subdir))
                    })?;
                    TreeEntry {
                        name: name.clone(),
                        kind: TreeEntryKind::Tree,
                        mode: FileMode::Tree,
                        id,
                    }
                }
            };
            tree_entries.push(entry);
        }

        let tree_id = store.put_tree(&Tree::new(tree_entries))?;
        tree_cache.insert(dir_path, tree_id);
    }

    tree_cache
        .get("")
        .copied()
        .ok_or_else(|| SyncError::ObjectNotFound("root tree".to_string()))
}

fn file_and_directory(path: &str) -> SyncError {
    SyncError::Serialization(format!("path {} is both a file and a directory", path))
}

fn flatten_tree(
    store: &ObjectStore,
    tree: ObjectId,
    prefix: &str,
    out: &mut StagedEntries,
) -> Result<()> {
    for entry in store.get_tree(tree)?.entries {
        let path = join(prefix, &entry.name);
        match entry.kind {
            TreeEntryKind::Tree => flatten_tree(store, entry.id, &path, out)?,
            TreeEntryKind::Blob => {
                out.insert(
                    path,
                    StagedEntry {
                        mode: entry.mode,
                        blob: entry.id,
                    },
                );
            }
        }
    }
    Ok(())
}

fn depth(dir: &str) -> usize {
    if dir.is_empty() {
        0
    } else {
        dir.matches('/').count() + 1
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}
