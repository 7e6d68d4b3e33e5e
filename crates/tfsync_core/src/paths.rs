//! Mapping server paths into repo-relative paths.

use crate::error::{Result, SyncError};
use regex::Regex;

/// Maps server paths under a tracked folder to repo-relative paths and
/// applies the remote's ignore rule.
#[derive(Debug, Clone)]
pub struct PathMapping {
    repository: String,
    ignore: Option<Regex>,
}

impl PathMapping {
    /// Creates a mapping for the tracked folder `repository`
    /// (e.g. `$/Project/Trunk`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` if `ignore` is not a valid regex.
    pub fn new(repository: &str, ignore: Option<&str>) -> Result<Self> {
        let ignore = ignore
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| SyncError::InvalidPattern(e.to_string()))
            })
            .transpose()?;
        Ok(Self {
            repository: repository.trim_end_matches('/').to_string(),
            ignore,
        })
    }

    /// The tracked server folder.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Strips the tracked folder from a server path.
    ///
    /// The match is case-insensitive and must end on a path component.
    /// Returns `None` for paths outside the folder and for the folder itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfsync_core::PathMapping;
    ///
    /// let paths = PathMapping::new("$/Project/Trunk", None).unwrap();
    /// assert_eq!(paths.to_repo_path("$/project/trunk/src/a.c").as_deref(), Some("src/a.c"));
    /// assert_eq!(paths.to_repo_path("$/Project/TrunkOld/a.c"), None);
    /// ```
    pub fn to_repo_path(&self, server_path: &str) -> Option<String> {
        let prefix_len = self.repository.len();
        let head = server_path.get(..prefix_len)?;
        if !head.eq_ignore_ascii_case(&self.repository) {
            return None;
        }
        let rest = &server_path[prefix_len..];
        if !rest.starts_with('/') {
            return None;
        }
        let rest = rest.trim_start_matches('/');
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    /// True if the ignore rule matches `repo_path`.
    pub fn should_skip(&self, repo_path: &str) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(repo_path))
    }

    /// Repo-relative path of an item that should be replayed, if any.
    pub fn resolve(&self, server_path: &str) -> Option<String> {
        self.to_repo_path(server_path)
            .filter(|repo_path| !self.should_skip(repo_path))
    }
}
