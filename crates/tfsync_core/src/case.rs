//! Canonical path casing.
//!
//! The source server is case-sensitive while the working trees people check
//! out usually are not. The first spelling seen for a path wins; every later
//! spelling of the same path is rewritten to it before it reaches the stage.

use crate::error::Result;
use crate::plumbing::StagedEntries;
use crate::staging::Stage;
use crate::types::FileMode;
use crate::ObjectId;
use std::collections::HashMap;
use std::io::Read;

/// A known path with its canonical spelling and last recorded mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitObject {
    /// Canonical spelling of the path.
    pub path: String,
    /// Mode recorded in the parent tree; `None` for paths first seen during
    /// replay.
    pub mode: Option<FileMode>,
}

/// Every path seen by one tracked history, keyed by its folded spelling.
///
/// Entries are only ever added. A deleted path stays known so that a later
/// re-add under a different casing lands on the original spelling.
#[derive(Debug, Clone, Default)]
pub struct KnownPaths {
    ignore_case: bool,
    paths: HashMap<String, GitObject>,
}

impl KnownPaths {
    /// Creates an empty table. With `ignore_case`, keys are lowercased.
    pub fn new(ignore_case: bool) -> Self {
        Self {
            ignore_case,
            paths: HashMap::new(),
        }
    }

    fn key(&self, path: &str) -> String {
        if self.ignore_case {
            path.to_lowercase()
        } else {
            path.to_string()
        }
    }

    /// Looks up a path under any casing.
    pub fn get(&self, path: &str) -> Option<&GitObject> {
        self.paths.get(&self.key(path))
    }

    /// Returns the canonical spelling of `path`, recording it if new.
    ///
    /// An unknown path keeps its own leaf name but inherits the canonical
    /// spelling of its parent directory, resolved recursively.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfsync_core::KnownPaths;
    ///
    /// let mut known = KnownPaths::new(true);
    /// assert_eq!(known.resolve("Dir/File.txt"), "Dir/File.txt");
    /// assert_eq!(known.resolve("dir/file.txt"), "Dir/File.txt");
    /// assert_eq!(known.resolve("DIR/Other.txt"), "Dir/Other.txt");
    /// ```
    pub fn resolve(&mut self, path: &str) -> String {
        let key = self.key(path);
        if let Some(known) = self.paths.get(&key) {
            return known.path.clone();
        }

        let canonical = match path.rsplit_once('/') {
            Some((dir, leaf)) => format!("{}/{}", self.resolve(dir), leaf),
            None => path.to_string(),
        };
        self.paths.insert(
            key,
            GitObject {
                path: canonical.clone(),
                mode: None,
            },
        );
        canonical
    }

    /// Records every file of a tree and its ancestor directories.
    ///
    /// Spellings already known are kept; file modes are refreshed from the
    /// tree.
    pub fn seed(&mut self, entries: &StagedEntries) {
        for (path, entry) in entries {
            let mut dir = path.as_str();
            while let Some((parent, _)) = dir.rsplit_once('/') {
                self.record(parent, FileMode::Tree);
                dir = parent;
            }
            self.record(path, entry.mode);
        }
    }

    fn record(&mut self, path: &str, mode: FileMode) {
        let key = self.key(path);
        self.paths
            .entry(key)
            .and_modify(|known| known.mode = Some(mode))
            .or_insert_with(|| GitObject {
                path: path.to_string(),
                mode: Some(mode),
            });
    }

    /// Number of known paths, directories included.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Stage decorator that rewrites every path to its canonical spelling.
pub struct CaseNormalizer<S: Stage> {
    inner: S,
}

impl<S: Stage> CaseNormalizer<S> {
    /// Wraps a stage.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Unwraps the decorated stage.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Stage> Stage for CaseNormalizer<S> {
    fn upsert(&mut self, path: &str, content: &mut dyn Read) -> Result<()> {
        let canonical = self.inner.known_paths().resolve(path);
        self.inner.upsert(&canonical, content)
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        let canonical = self.inner.known_paths().resolve(path);
        self.inner.remove(&canonical)
    }

    fn materialize(&mut self) -> Result<ObjectId> {
        self.inner.materialize()
    }

    fn known_paths(&mut self) -> &mut KnownPaths {
        self.inner.known_paths()
    }
}
