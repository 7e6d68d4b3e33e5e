//! tfsync Core Library
//!
//! Replays the changeset history of a centralized version-control server
//! into a content-addressed commit graph, one commit per changeset:
//! - Content-addressed object storage with trees and commits
//! - A durable staging index checked against the last commit before use
//! - Case-preserving path canonicalization
//! - Deterministic ordering of deletes, renames and edits
//! - Full-tree seeding of an empty history
//!
//! # Quick Start
//!
//! ```
//! use tfsync_core::{RemoteConfig, ScriptBuilder, SyncRepo};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let mut repo = SyncRepo::init(tmp.path()).unwrap();
//! repo.add_remote("default", RemoteConfig {
//!     url: "http://tfs:8080/tfs".into(),
//!     repository: "$/Project/Trunk".into(),
//!     ..Default::default()
//! }).unwrap();
//!
//! let history = ScriptBuilder::new()
//!     .changeset(1, "Initial import", 1_262_304_000)
//!     .add_file("$/Project/Trunk/readme.txt", b"hello")
//!     .changeset(2, "Rename", 1_262_390_400)
//!     .rename_file("$/Project/Trunk/readme.txt", "$/Project/Trunk/README.txt")
//!     .build()
//!     .unwrap();
//!
//! let report = repo.fetch("default", &history, &history).unwrap();
//! assert_eq!(report.fetched, 2);
//! assert_eq!(report.last_changeset_id, 2);
//! ```
//!
//! # Replaying a single changeset
//!
//! The engine pieces compose without a repository:
//!
//! ```
//! use tfsync_core::{
//!     CaseNormalizer, ChangeApplier, ChangesetSource, CommitMetadataBuilder, KnownPaths,
//!     NoIdentities, ObjectStore, PathMapping, ScriptBuilder, StagingIndex,
//! };
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let store = ObjectStore::new(tmp.path().join("objects"));
//! let source = ScriptBuilder::new()
//!     .changeset(7, "Add", 0)
//!     .add_file("$/P/Dir/File.txt", b"v1")
//!     .build()
//!     .unwrap();
//!
//! let mut known = KnownPaths::new(true);
//! let mut index = StagingIndex::open(&store, tmp.path().join("index"), &mut known).unwrap();
//! let paths = PathMapping::new("$/P", None).unwrap();
//! let metadata = CommitMetadataBuilder::new(&NoIdentities);
//!
//! let changeset = source.changeset(7).unwrap();
//! let entry = ChangeApplier::new(&source, &paths, &metadata)
//!     .apply(&changeset, &mut CaseNormalizer::new(&mut index), None)
//!     .unwrap();
//! assert_eq!(entry.changeset_id, 7);
//! assert_eq!(entry.committer_name, "Unknown TFS user");
//! ```

mod apply;
mod case;
mod config;
mod error;
mod fake;
mod guard;
mod metadata;
mod object_id;
mod object_store;
mod order;
mod paths;
mod plumbing;
mod refs;
mod remote;
mod replicate;
mod repo;
mod source;
mod staging;
mod types;
mod verify;

pub use apply::ChangeApplier;
pub use case::{CaseNormalizer, GitObject, KnownPaths};
pub use config::{Config, RemoteConfig, ReplayConfig, StorageConfig};
pub use error::{Result, SyncError};
pub use fake::{ScriptBuilder, ScriptedSource};
pub use guard::ConsistencyGuard;
pub use metadata::{CommitMetadataBuilder, UNKNOWN_USER_EMAIL, UNKNOWN_USER_NAME};
pub use object_id::ObjectId;
pub use object_store::ObjectStore;
pub use order::{order_changes, rank};
pub use paths::PathMapping;
pub use plumbing::{Plumbing, StagedEntries, StagedEntry};
pub use refs::{remote_ref_name, Refs};
pub use remote::{FetchReport, Remote};
pub use replicate::{FullTreeReplicator, ReplicaOutcome, DEFAULT_PROGRESS_INTERVAL};
pub use repo::{SyncRepo, DEFAULT_REMOTE, REPO_DIR};
pub use source::{ChangesetIter, ChangesetSource, IdentityLookup, ItemIter, NoIdentities};
pub use staging::{Stage, StagingIndex};
pub use types::*;
pub use verify::{verify, VerifyConfig, VerifyReport};
