use super::assertions::Assertion;
use super::steps::{ScenarioStep, ServerOp};
use super::workspace::TestWorkspace;
use anyhow::{anyhow, bail, Context, Result};
use std::collections::BTreeMap;
use std::io::Cursor;
use tfsync_core::{
    Changeset, ChangesetIter, ChangesetSource, FetchReport, ItemIter, KnownPaths, ObjectId,
    Plumbing, RemoteConfig, ScriptBuilder, ScriptedSource, Stage, StagingIndex, SyncError,
    SyncRepo, VerifyConfig,
};

const REMOTE: &str = "default";

/// Midnight, 2010-01-01 UTC; changeset `n` is dated `n` hours later.
const BASE_DATE: i64 = 1_262_304_000;

/// Setup shared by every step of a scenario
pub struct RunnerOptions {
    pub remote: RemoteConfig,
    pub ignore_case: bool,
    pub fixture: Option<String>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            remote: RemoteConfig {
                url: "http://tfs:8080/tfs".to_string(),
                repository: "$/Project/Trunk".to_string(),
                ..Default::default()
            },
            ignore_case: true,
            fixture: None,
        }
    }
}

/// Executes scenarios against a real repository in a temp directory
pub struct ScenarioRunner {
    workspace: TestWorkspace,
    repo: Option<SyncRepo>,
    history: ScriptBuilder,
    last_report: Option<FetchReport>,
    last_error: Option<SyncError>,
    tree_before_fetch: Option<ObjectId>,
    crashed: bool,
    current_step: usize,
}

impl ScenarioRunner {
    /// Create a runner with an initialized repository and one remote
    pub fn new(options: RunnerOptions) -> Result<Self> {
        let workspace = TestWorkspace::empty()?;
        let repo = workspace.init_repo(REMOTE, options.remote, options.ignore_case)?;
        let history = match &options.fixture {
            Some(name) => ScriptBuilder::parse(&TestWorkspace::fixture_script(name)?)?,
            None => ScriptBuilder::new(),
        };

        Ok(Self {
            workspace,
            repo: Some(repo),
            history,
            last_report: None,
            last_error: None,
            tree_before_fetch: None,
            crashed: false,
            current_step: 0,
        })
    }

    /// Get current step number
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Execute all steps in sequence
    pub fn execute(&mut self, steps: &[ScenarioStep]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.current_step = i;
            self.execute_step(step)
                .with_context(|| format!("Step {}: {:?}", i, step))?;
        }
        Ok(())
    }

    fn execute_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::ServerChangeset {
                id,
                comment,
                committer,
            } => {
                self.server_changeset(*id, comment, committer.as_deref());
                Ok(())
            }
            ScenarioStep::ServerChange { op } => {
                self.server_change(op);
                Ok(())
            }
            ScenarioStep::ServerIdentity {
                user,
                display_name,
                mail_address,
            } => {
                self.history = std::mem::take(&mut self.history).identity(
                    user,
                    display_name,
                    mail_address,
                );
                Ok(())
            }

            ScenarioStep::Fetch => self.handle_fetch(false),
            ScenarioStep::QuickFetch => self.handle_fetch(true),
            ScenarioStep::FetchWithoutHistory => self.handle_fetch_without_history(),

            ScenarioStep::CorruptStaging { path, content } => {
                self.handle_corrupt_staging(path, content)
            }
            ScenarioStep::Crash => self.handle_crash(),
            ScenarioStep::Restart => self.handle_restart(),

            ScenarioStep::Assert { assertion } => self.handle_assertion(assertion),
        }
    }

    // ===== Server history =====

    fn server_changeset(&mut self, id: i64, comment: &str, committer: Option<&str>) {
        let mut history =
            std::mem::take(&mut self.history).changeset(id, comment, BASE_DATE + id * 3600);
        if let Some(committer) = committer {
            history = history.by(committer);
        }
        self.history = history;
    }

    fn server_change(&mut self, op: &ServerOp) {
        let history = std::mem::take(&mut self.history);
        self.history = match op {
            ServerOp::AddFile { path, content } => history.add_file(path, content),
            ServerOp::EditFile { path, content } => history.edit_file(path, content),
            ServerOp::DeleteFile { path } => history.delete_file(path),
            ServerOp::RenameFile { from, to } => history.rename_file(from, to),
            ServerOp::RenameEditFile { from, to, content } => {
                history.rename_edit_file(from, to, content)
            }
            ServerOp::RenameDeleteFile { from, to } => history.rename_delete_file(from, to),
            ServerOp::AddFolder { path } => history.add_folder(path),
        };
    }

    fn server(&self) -> Result<ScriptedSource> {
        self.history
            .clone()
            .build()
            .context("Server history does not build")
    }

    // ===== Client actions =====

    fn repo(&self) -> Result<&SyncRepo> {
        self.repo
            .as_ref()
            .ok_or_else(|| anyhow!("Repository not available (crashed?)"))
    }

    fn handle_fetch(&mut self, quick: bool) -> Result<()> {
        let source = self.server()?;
        self.run_fetch(|repo| {
            if quick {
                repo.quick_fetch(REMOTE, &source, &source)
            } else {
                repo.fetch(REMOTE, &source, &source)
            }
        })
    }

    fn handle_fetch_without_history(&mut self) -> Result<()> {
        let source = self.server()?;
        let limited = WithoutHistory(&source);
        self.run_fetch(|repo| repo.fetch(REMOTE, &limited, &source))
    }

    /// Runs a fetch, keeping either its report or its error for assertions
    fn run_fetch(
        &mut self,
        fetch: impl FnOnce(&SyncRepo) -> tfsync_core::Result<FetchReport>,
    ) -> Result<()> {
        self.tree_before_fetch = self.head_tree()?;
        let outcome = fetch(self.repo()?);
        match outcome {
            Ok(report) => {
                self.last_report = Some(report);
                self.last_error = None;
            }
            Err(e) => {
                self.last_report = None;
                self.last_error = Some(e);
            }
        }
        Ok(())
    }

    // ===== Failure simulation =====

    fn handle_corrupt_staging(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let repo = self.repo()?;
        let mut known = KnownPaths::new(repo.config().replay.ignore_case);
        let mut index = StagingIndex::open(
            repo.object_store(),
            self.workspace.index_file(REMOTE),
            &mut known,
        )?;
        index.upsert(path, &mut Cursor::new(content.to_vec()))?;
        Ok(())
    }

    fn handle_crash(&mut self) -> Result<()> {
        // Drop without any cleanup
        self.repo = None;
        self.crashed = true;
        Ok(())
    }

    fn handle_restart(&mut self) -> Result<()> {
        if !self.crashed {
            bail!("Cannot restart: not crashed");
        }
        self.repo = Some(self.workspace.open_repo()?);
        self.crashed = false;
        Ok(())
    }

    // ===== Assertions =====

    fn head_tree(&self) -> Result<Option<ObjectId>> {
        let repo = self.repo()?;
        let Some(head) = repo.remote(REMOTE)?.head()? else {
            return Ok(None);
        };
        Ok(Some(repo.object_store().tree_of(head)?))
    }

    fn head_files(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        let repo = self.repo()?;
        let store = repo.object_store();
        let Some(tree) = self.head_tree()? else {
            return Ok(BTreeMap::new());
        };
        let mut files = BTreeMap::new();
        for (path, entry) in store.read_tree(tree)? {
            files.insert(path, store.get_blob(entry.blob)?);
        }
        Ok(files)
    }

    fn handle_assertion(&self, assertion: &Assertion) -> Result<()> {
        let repo = self.repo()?;

        match assertion {
            Assertion::FetchedCount(expected) => {
                let report = match (&self.last_report, &self.last_error) {
                    (Some(report), _) => report,
                    (None, Some(e)) => bail!("Last fetch failed: {}", e),
                    (None, None) => bail!("Nothing fetched yet"),
                };
                if report.fetched != *expected {
                    bail!(
                        "Expected {} fetched changesets, found {}",
                        expected,
                        report.fetched
                    );
                }
            }

            Assertion::LastFetchFailedAt(expected) => match &self.last_error {
                Some(SyncError::ChangesetFailed { changeset_id, .. })
                    if changeset_id == expected => {}
                Some(other) => bail!("Expected failure in C{}, got: {}", expected, other),
                None => bail!("Expected failure in C{}, but the fetch succeeded", expected),
            },

            Assertion::CommitCount(expected) => {
                let count = repo.log(REMOTE, None)?.len();
                if count != *expected {
                    bail!("Expected {} commits, found {}", expected, count);
                }
            }

            Assertion::HeadChangeset(expected) => {
                let (_, head) = head_entry(repo)?;
                if head.changeset_id != *expected {
                    bail!(
                        "Expected head at C{}, found C{}",
                        expected,
                        head.changeset_id
                    );
                }
            }

            Assertion::HeadMessageContains(text) => {
                let (_, head) = head_entry(repo)?;
                if !head.log.contains(text.as_str()) {
                    bail!("Head message {:?} does not contain {:?}", head.log, text);
                }
            }

            Assertion::HeadMessageEquals(expected) => {
                let (_, head) = head_entry(repo)?;
                if head.log != *expected {
                    bail!("Expected head message {:?}, found {:?}", expected, head.log);
                }
            }

            Assertion::HeadAuthor { name, email } => {
                let (_, head) = head_entry(repo)?;
                if head.author_name != *name || head.author_email != *email {
                    bail!(
                        "Expected author {} <{}>, found {} <{}>",
                        name,
                        email,
                        head.author_name,
                        head.author_email
                    );
                }
            }

            Assertion::HeadTreeUnchanged => {
                let now = self.head_tree()?;
                if now != self.tree_before_fetch {
                    bail!(
                        "Head tree changed from {:?} to {:?}",
                        self.tree_before_fetch,
                        now
                    );
                }
            }

            Assertion::FileInHead { path } => {
                if !self.head_files()?.contains_key(path) {
                    bail!("File not in head: {}", path);
                }
            }

            Assertion::FileContent { path, content } => {
                let files = self.head_files()?;
                let actual = files
                    .get(path)
                    .ok_or_else(|| anyhow!("File not in head: {}", path))?;
                if actual != content.as_bytes() {
                    bail!(
                        "Content mismatch for {}: expected {:?}, found {:?}",
                        path,
                        content,
                        String::from_utf8_lossy(actual)
                    );
                }
            }

            Assertion::FileNotInHead { path } => {
                if self.head_files()?.contains_key(path) {
                    bail!("File unexpectedly in head: {}", path);
                }
            }

            Assertion::HeadPaths(expected) => {
                let actual: Vec<String> = self.head_files()?.into_keys().collect();
                let mut expected = expected.clone();
                expected.sort();
                if actual != expected {
                    bail!("Expected head paths {:?}, found {:?}", expected, actual);
                }
            }

            Assertion::Healthy => {
                let report = repo.verify(VerifyConfig {
                    check_objects: true,
                    ..Default::default()
                })?;
                if report.has_issues() {
                    bail!("{}", report.summary());
                }
            }

            Assertion::Custom(check) => check(repo)?,
        }

        Ok(())
    }
}

fn head_entry(repo: &SyncRepo) -> Result<(ObjectId, tfsync_core::LogEntry)> {
    repo.log(REMOTE, Some(1))?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No commits fetched"))
}

/// A source that answers only the required queries, like a bare server client
struct WithoutHistory<'s>(&'s ScriptedSource);

impl ChangesetSource for WithoutHistory<'_> {
    fn latest_changeset(&self) -> tfsync_core::Result<Option<Changeset>> {
        self.0.latest_changeset()
    }

    fn changesets_after<'a>(&'a self, path: &str, start: i64) -> tfsync_core::Result<ChangesetIter<'a>> {
        self.0.changesets_after(path, start)
    }

    fn full_tree_at<'a>(&'a self, path: &str, changeset_id: i64) -> tfsync_core::Result<ItemIter<'a>> {
        self.0.full_tree_at(path, changeset_id)
    }
}
