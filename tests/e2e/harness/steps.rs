use super::assertions::Assertion;

/// A change recorded on the simulated server
#[derive(Debug, Clone)]
pub enum ServerOp {
    AddFile { path: String, content: Vec<u8> },
    EditFile { path: String, content: Vec<u8> },
    DeleteFile { path: String },
    RenameFile { from: String, to: String },
    RenameEditFile { from: String, to: String, content: Vec<u8> },
    RenameDeleteFile { from: String, to: String },
    AddFolder { path: String },
}

/// All possible actions in a test scenario
#[derive(Debug)]
pub enum ScenarioStep {
    // Server history
    ServerChangeset {
        id: i64,
        comment: String,
        committer: Option<String>,
    },
    ServerChange {
        op: ServerOp,
    },
    ServerIdentity {
        user: String,
        display_name: String,
        mail_address: String,
    },

    // Client actions
    Fetch,
    QuickFetch,
    /// Fetch through a source that cannot answer history queries
    FetchWithoutHistory,

    // Failure simulation
    /// Stage junk into the remote's staging index between runs
    CorruptStaging {
        path: String,
        content: Vec<u8>,
    },
    Crash,
    Restart,

    // Assertions (can be interspersed)
    Assert {
        assertion: Assertion,
    },
}
