//! anybakup - versioned file backup into a single store
//!
//! Library side of the `abk` binary: the operation facade and the user
//! configuration file.

pub mod facade;
pub mod system_config;
pub mod verify;

pub use facade::{AddReport, Backup, DiffInput, RemoveReport};
pub use verify::{Issue, VerifyReport};

pub use ab_core::{Error, PathStyle, RepoPath, Result, SourcePath, StoreConfig, StoreRoot};
pub use ledger::TrackedEntry;
pub use vcs::{Action, VersionRecord};
