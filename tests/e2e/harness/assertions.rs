use anyhow::Result;
use tfsync_core::SyncRepo;

/// Declarative assertions on repository state
pub enum Assertion {
    // Fetch outcome
    FetchedCount(usize),
    LastFetchFailedAt(i64),

    // Commits
    CommitCount(usize),
    HeadChangeset(i64),
    HeadMessageContains(String),
    HeadMessageEquals(String),
    HeadAuthor {
        name: String,
        email: String,
    },
    HeadTreeUnchanged,

    // Files
    FileInHead {
        path: String,
    },
    FileContent {
        path: String,
        content: String,
    },
    FileNotInHead {
        path: String,
    },
    HeadPaths(Vec<String>),

    // Integrity
    Healthy,

    // Custom
    Custom(Box<dyn Fn(&SyncRepo) -> Result<()> + Send + Sync>),
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FetchedCount(n) => write!(f, "FetchedCount({})", n),
            Self::LastFetchFailedAt(id) => write!(f, "LastFetchFailedAt({})", id),
            Self::CommitCount(n) => write!(f, "CommitCount({})", n),
            Self::HeadChangeset(id) => write!(f, "HeadChangeset({})", id),
            Self::HeadMessageContains(s) => write!(f, "HeadMessageContains({:?})", s),
            Self::HeadMessageEquals(s) => write!(f, "HeadMessageEquals({:?})", s),
            Self::HeadAuthor { name, email } => {
                write!(f, "HeadAuthor {{ name: {:?}, email: {:?} }}", name, email)
            }
            Self::HeadTreeUnchanged => write!(f, "HeadTreeUnchanged"),
            Self::FileInHead { path } => write!(f, "FileInHead {{ path: {:?} }}", path),
            Self::FileContent { path, content } => {
                write!(f, "FileContent {{ path: {:?}, content: {:?} }}", path, content)
            }
            Self::FileNotInHead { path } => write!(f, "FileNotInHead {{ path: {:?} }}", path),
            Self::HeadPaths(paths) => write!(f, "HeadPaths({:?})", paths),
            Self::Healthy => write!(f, "Healthy"),
            Self::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}
