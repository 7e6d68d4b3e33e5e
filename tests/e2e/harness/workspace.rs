use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tfsync_core::{Config, RemoteConfig, SyncRepo, REPO_DIR};

/// Manages isolated test environments with tempfile
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Create an empty workspace
    pub fn empty() -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp directory")?;
        Ok(Self { dir })
    }

    /// Read a history script from the fixtures directory
    pub fn fixture_script(name: &str) -> Result<String> {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name)
            .join("history.script");
        fs::read_to_string(&path)
            .with_context(|| format!("Fixture not found: {}", path.display()))
    }

    /// Get workspace path
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Initialize a repository with one remote
    pub fn init_repo(&self, id: &str, remote: RemoteConfig, ignore_case: bool) -> Result<SyncRepo> {
        let mut repo = SyncRepo::init(self.path())?;
        repo.add_remote(id, remote)?;
        if ignore_case {
            return Ok(repo);
        }

        let dir = self.path().join(REPO_DIR);
        let mut config = Config::load(&dir)?;
        config.replay.ignore_case = false;
        config.save(&dir)?;
        self.open_repo()
    }

    /// Open existing repository
    pub fn open_repo(&self) -> Result<SyncRepo> {
        Ok(SyncRepo::open(self.path())?)
    }

    /// Staging index file of a remote
    pub fn index_file(&self, remote: &str) -> PathBuf {
        self.path().join(REPO_DIR).join("index").join(remote)
    }
}
