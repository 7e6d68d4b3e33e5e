//! The staging index: the tree under construction for one remote.
//!
//! Staged entries live in memory and are written to `.tfsync/index/<remote>`
//! after every mutation, so a crashed replay leaves state behind for the
//! consistency guard to inspect on the next run.

use crate::case::KnownPaths;
use crate::error::{Result, SyncError};
use crate::plumbing::{Plumbing, StagedEntries, StagedEntry};
use crate::types::FileMode;
use crate::ObjectId;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Mutable tree-under-construction.
pub trait Stage {
    /// Writes `content` at `path`, replacing any staged entry.
    fn upsert(&mut self, path: &str, content: &mut dyn Read) -> Result<()>;

    /// Drops the staged entry at `path`; a missing entry is not an error.
    fn remove(&mut self, path: &str) -> Result<()>;

    /// Derives the tree id of the current entries.
    fn materialize(&mut self) -> Result<ObjectId>;

    /// The known-paths table shared by this replay.
    fn known_paths(&mut self) -> &mut KnownPaths;
}

impl<T: Stage + ?Sized> Stage for &mut T {
    fn upsert(&mut self, path: &str, content: &mut dyn Read) -> Result<()> {
        (**self).upsert(path, content)
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        (**self).remove(path)
    }

    fn materialize(&mut self) -> Result<ObjectId> {
        (**self).materialize()
    }

    fn known_paths(&mut self) -> &mut KnownPaths {
        (**self).known_paths()
    }
}

const INDEX_VERSION: u32 = 1;

#[derive(Deserialize)]
struct IndexFile {
    version: u32,
    entries: StagedEntries,
}

#[derive(Serialize)]
struct IndexFileRef<'e> {
    version: u32,
    entries: &'e StagedEntries,
}

/// Durable staging index for one remote.
///
/// Holds an exclusive lock on `<index>.lock` for its whole lifetime; the
/// lock is released on drop, including on error paths. The lock file itself
/// is never deleted.
pub struct StagingIndex<'a> {
    plumbing: &'a dyn Plumbing,
    known: &'a mut KnownPaths,
    file: PathBuf,
    entries: StagedEntries,
    has_state: bool,
    _lock: StagingLock,
}

impl<'a> StagingIndex<'a> {
    /// Opens (or starts) the staging index stored at `file`.
    ///
    /// # Errors
    ///
    /// Returns `StagingLocked` if another replay holds the index, and
    /// `Deserialization` if an existing index file cannot be decoded.
    pub fn open(
        plumbing: &'a dyn Plumbing,
        file: impl AsRef<Path>,
        known: &'a mut KnownPaths,
    ) -> Result<Self> {
        let file = file.as_ref().to_path_buf();
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock = StagingLock::acquire(&sibling(&file, ".lock"))?;

        let (entries, has_state) = if file.exists() {
            let bytes = fs::read(&file)?;
            let decoded: IndexFile = postcard::from_bytes(&bytes).map_err(|e| {
                SyncError::Deserialization(format!(
                    "staging index {}: {}",
                    file.display(),
                    e
                ))
            })?;
            if decoded.version != INDEX_VERSION {
                return Err(SyncError::Deserialization(format!(
                    "staging index {} has unsupported version {}",
                    file.display(),
                    decoded.version
                )));
            }
            (decoded.entries, true)
        } else {
            (StagedEntries::new(), false)
        };

        Ok(Self {
            plumbing,
            known,
            file,
            entries,
            has_state,
            _lock: lock,
        })
    }

    /// True once anything was staged or seeded, including by an earlier run.
    pub fn has_state(&self) -> bool {
        self.has_state
    }

    /// The currently staged entries.
    pub fn entries(&self) -> &StagedEntries {
        &self.entries
    }

    /// True when no entry is staged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discards every staged entry and the on-disk index.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.has_state = false;
        match fs::remove_file(&self.file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the staged entries with the content of `tree`.
    pub fn seed(&mut self, tree: ObjectId) -> Result<()> {
        self.entries = self.plumbing.read_tree(tree)?;
        self.known.seed(&self.entries);
        debug!(tree = %tree.short(), entries = self.entries.len(), "seeded staging index");
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        let bytes = postcard::to_allocvec(&IndexFileRef {
            version: INDEX_VERSION,
            entries: &self.entries,
        })
        .map_err(|e| SyncError::Serialization(e.to_string()))?;

        let tmp_path = sibling(&self.file, ".tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.file)?;
        self.has_state = true;
        Ok(())
    }
}

impl Stage for StagingIndex<'_> {
    fn upsert(&mut self, path: &str, content: &mut dyn Read) -> Result<()> {
        let mode = match self.known.get(path).and_then(|known| known.mode) {
            Some(mode) if mode != FileMode::Tree => mode,
            _ => FileMode::NEW_FILE,
        };
        let blob = self.plumbing.write_blob(content)?;
        debug!("U {}", path);
        self.entries
            .insert(path.to_string(), StagedEntry { mode, blob });
        self.persist()
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        if self.entries.remove(path).is_none() {
            return Ok(());
        }
        debug!("D {}", path);
        self.persist()
    }

    fn materialize(&mut self) -> Result<ObjectId> {
        self.plumbing.write_tree(&self.entries)
    }

    fn known_paths(&mut self) -> &mut KnownPaths {
        &mut *self.known
    }
}

/// `index/my.remote` -> `index/my.remote.lock`
fn sibling(index: &Path, suffix: &str) -> PathBuf {
    let mut name = index.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// RAII guard for a staging index lock.
///
/// The lock file holds the owner's PID for diagnostics. It stays on disk
/// after release so that every contender locks the same inode.
struct StagingLock {
    file: File,
}

impl StagingLock {
    fn acquire(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.try_lock_exclusive()
            .map_err(|_| SyncError::StagingLocked {
                path: path.to_path_buf(),
            })?;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;

        Ok(Self { file })
    }
}

impl Drop for StagingLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
