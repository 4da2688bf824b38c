//! anybakup vcs - versioned object store and state reconciliation
//!
//! The [`ObjectStore`] trait is the seam between the reconciliation engine and
//! the version-control backend; [`GitStore`] implements it on top of libgit2.

pub mod git;
pub mod history;
pub mod reconcile;
pub mod status;

pub use git::GitStore;
pub use history::{FileBlob, VersionRecord};
pub use reconcile::{Action, Outcome, Reconciler};
pub use status::{FileState, StatusCode, StatusSnapshot, Verb};

use ab_core::{Author, RepoPath, Result, StoreRoot};
use chrono::{DateTime, Utc};

/// Version-control primitives the reconciler drives
///
/// Implementations treat the working tree under [`ObjectStore::root`] as the
/// thing being versioned. Every method is synchronous and runs to completion.
pub trait ObjectStore {
    /// Open an existing store; fails with `StoreCorrupt` if `root` is not one
    fn open(root: &StoreRoot) -> Result<Self>
    where
        Self: Sized;

    /// Create (or re-initialize) a store at `root`
    fn init(root: &StoreRoot) -> Result<Self>
    where
        Self: Sized;

    fn root(&self) -> &StoreRoot;

    /// Stage additions and modifications under each path
    fn stage(&self, paths: &[RepoPath]) -> Result<()>;

    /// Stage the removal of each path
    fn stage_remove(&self, paths: &[RepoPath]) -> Result<()>;

    /// Commit the staging area; returns the new revision id
    fn commit(&self, message: &str, author: &Author, timestamp: DateTime<Utc>) -> Result<String>;

    /// Status of every changed path under `scope`
    fn status(&self, scope: &RepoPath) -> Result<StatusSnapshot>;

    /// Revisions touching `path`, newest first
    fn log(&self, path: &RepoPath) -> Result<Vec<VersionRecord>>;

    /// Current head revision, `None` before the first commit
    fn head(&self) -> Result<Option<String>>;

    fn read_file_at(&self, revision: &str, path: &RepoPath) -> Result<FileBlob>;

    fn exists_at(&self, revision: &str, path: &RepoPath) -> Result<bool>;

    /// Every file recorded in `revision`
    fn files_at(&self, revision: &str) -> Result<Vec<RepoPath>>;
}
