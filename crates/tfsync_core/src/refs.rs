//! Remote-tracking references.
//!
//! Each tracked remote has one ref, `refs/remotes/<id>/master`, holding the
//! commit of the last replayed changeset.

use crate::error::{Result, SyncError};
use crate::ObjectId;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Returns the ref name tracking a remote.
pub fn remote_ref_name(remote_id: &str) -> String {
    format!("remotes/{}/master", remote_id)
}

/// Manages references to commits.
///
/// References are single-line text files containing a hex ObjectId.
/// Writes are atomic (temp file + rename).
pub struct Refs {
    root: PathBuf,
}

impl Refs {
    /// Creates a Refs manager for the given `.tfsync` directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Reads a named reference (e.g. `remotes/default/master`).
    ///
    /// # Errors
    ///
    /// Returns `RefNotFound` if the ref doesn't exist and `InvalidRef` if its
    /// content is malformed.
    pub fn read_ref(&self, name: &str) -> Result<ObjectId> {
        self.read_ref_opt(name)?
            .ok_or_else(|| SyncError::RefNotFound(name.to_string()))
    }

    /// Reads a named reference, returning `None` when it does not exist yet.
    pub fn read_ref_opt(&self, name: &str) -> Result<Option<ObjectId>> {
        let path = self.ref_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        ObjectId::from_hex(content.trim())
            .map(Some)
            .map_err(|e| SyncError::InvalidRef {
                path,
                reason: e.to_string(),
            })
    }

    /// Writes a named reference atomically, creating parent directories.
    pub fn write_ref(&self, name: &str, id: ObjectId) -> Result<()> {
        let path = self.ref_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            writeln!(file, "{}", id.as_hex())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        #[cfg(unix)]
        {
            if let Some(parent) = path.parent() {
                if let Ok(dir_file) = File::open(parent) {
                    let _ = dir_file.sync_all();
                }
            }
        }

        Ok(())
    }

    /// Lists all references as sorted `(name, id)` pairs.
    ///
    /// Unreadable ref files are skipped.
    pub fn list_refs(&self) -> Result<Vec<(String, ObjectId)>> {
        let refs_dir = self.root.join("refs");
        if !refs_dir.exists() {
            return Ok(vec![]);
        }

        let mut refs = Vec::new();
        collect_refs(self, &refs_dir, &refs_dir, &mut refs)?;
        refs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(refs)
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.root.join("refs").join(name)
    }
}

fn collect_refs(
    refs: &Refs,
    current: &Path,
    base: &Path,
    out: &mut Vec<(String, ObjectId)>,
) -> Result<()> {
    for entry in fs::read_dir(current)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_refs(refs, &path, base, out)?;
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) == Some("tmp") {
            continue;
        }
        let Some(name) = path
            .strip_prefix(base)
            .ok()
            .and_then(|rel| rel.to_str())
            .map(|rel| rel.replace('\\', "/"))
        else {
            continue;
        };
        if let Ok(Some(id)) = refs.read_ref_opt(&name) {
            out.push((name, id));
        }
    }
    Ok(())
}
