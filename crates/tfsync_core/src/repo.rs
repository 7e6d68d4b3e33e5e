//! Repository handle providing the main tfsync API.

use crate::config::{Config, RemoteConfig};
use crate::error::{Result, SyncError};
use crate::refs::Refs;
use crate::remote::{FetchReport, Remote};
use crate::source::{ChangesetSource, IdentityLookup};
use crate::types::LogEntry;
use crate::verify::{verify, VerifyConfig, VerifyReport};
use crate::{ObjectId, ObjectStore};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the directory holding repository state.
pub const REPO_DIR: &str = ".tfsync";

/// Remote id used when none is given.
pub const DEFAULT_REMOTE: &str = "default";

/// tfsync repository handle.
pub struct SyncRepo {
    /// Directory containing `.tfsync`.
    root: PathBuf,
    object_store: ObjectStore,
    refs: Refs,
    config: Config,
}

impl SyncRepo {
    /// Opens an existing repository.
    ///
    /// # Errors
    ///
    /// Returns `NotARepository` if `path` has no `.tfsync` directory.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tfsync_core::SyncRepo;
    ///
    /// let repo = SyncRepo::open(".").unwrap();
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let dir = root.join(REPO_DIR);
        if !dir.is_dir() {
            return Err(SyncError::NotARepository(root));
        }

        let config = Config::load(&dir)?;
        let object_store = ObjectStore::new(dir.join("objects"))
            .with_compression_level(config.storage.compression_level);
        let refs = Refs::new(&dir);
        Ok(Self {
            root,
            object_store,
            refs,
            config,
        })
    }

    /// Initializes a new repository with a default configuration.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyInitialized` if `.tfsync` already exists.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfsync_core::SyncRepo;
    /// use tempfile::TempDir;
    ///
    /// let tmp = TempDir::new().unwrap();
    /// let repo = SyncRepo::init(tmp.path()).unwrap();
    /// assert!(repo.config().remotes.is_empty());
    /// ```
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let dir = root.join(REPO_DIR);
        if dir.exists() {
            return Err(SyncError::AlreadyInitialized(root));
        }

        fs::create_dir_all(dir.join("objects"))?;
        fs::create_dir_all(dir.join("refs"))?;
        fs::create_dir_all(dir.join("index"))?;
        Config::default().save(&dir)?;
        fs::write(dir.join(".gitignore"), "index/\n*.tmp\n*.lock\n")?;

        info!(path = %root.display(), "initialized repository");
        Self::open(root)
    }

    /// Directory containing `.tfsync`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.tfsync` directory.
    pub fn repo_dir(&self) -> PathBuf {
        self.root.join(REPO_DIR)
    }

    /// The object store.
    pub fn object_store(&self) -> &ObjectStore {
        &self.object_store
    }

    /// The refs manager.
    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    /// The loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Adds or replaces a remote and saves the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` if the remote's ignore rule does not compile;
    /// nothing is saved in that case.
    pub fn add_remote(&mut self, id: &str, remote: RemoteConfig) -> Result<()> {
        crate::paths::PathMapping::new(&remote.repository, remote.ignore_paths.as_deref())?;
        self.config.remotes.insert(id.to_string(), remote);
        self.config.save(&self.repo_dir())
    }

    /// Binds a configured remote.
    ///
    /// # Errors
    ///
    /// Returns `RemoteNotFound` for an unknown id.
    pub fn remote(&self, id: &str) -> Result<Remote<'_>> {
        let config = self
            .config
            .remotes
            .get(id)
            .cloned()
            .ok_or_else(|| SyncError::RemoteNotFound(id.to_string()))?;
        Remote::new(
            id,
            config,
            &self.object_store,
            &self.refs,
            &self.config.replay,
            &self.repo_dir().join("index"),
        )
    }

    /// Fetches new changesets for remote `id`.
    pub fn fetch(
        &self,
        id: &str,
        source: &dyn ChangesetSource,
        identities: &dyn IdentityLookup,
    ) -> Result<FetchReport> {
        self.remote(id)?.fetch(source, identities)
    }

    /// Seeds remote `id` from the latest changeset only.
    pub fn quick_fetch(
        &self,
        id: &str,
        source: &dyn ChangesetSource,
        identities: &dyn IdentityLookup,
    ) -> Result<FetchReport> {
        self.remote(id)?.quick_fetch(source, identities)
    }

    /// Commits of remote `id`, newest first.
    pub fn log(&self, id: &str, limit: Option<usize>) -> Result<Vec<(ObjectId, LogEntry)>> {
        self.remote(id)?.history(limit)
    }

    /// Verifies every remote's commit chain.
    pub fn verify(&self, config: VerifyConfig) -> Result<VerifyReport> {
        verify(&self.refs, &self.object_store, config)
    }
}
