//! Error type shared by every anybakup crate

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Common result type used throughout anybakup
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the path model, the mirror, the reconciliation engine
/// and the ledger.
///
/// Every variant carries enough context (path, phase or operation) to
/// diagnose the failure without a backtrace.
#[derive(Debug, Error)]
pub enum Error {
    /// A path could not be encoded into, or decoded from, the store layout
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A source file, ledger row or history entry does not exist
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The object store answered with something we cannot interpret
    #[error("store corrupt during {op}: {details}")]
    StoreCorrupt { op: &'static str, details: String },

    #[error("revision '{0}' not found")]
    RevisionNotFound(String),

    #[error("'{path}' is not present in revision {revision}")]
    PathNotInRevision { path: String, revision: String },

    #[error("no history recorded for '{0}'")]
    NoHistory(String),

    /// The object store rejected a primitive (stage, commit, ...)
    #[error("{op} failed: {details}")]
    Reconcile { op: &'static str, details: String },

    #[error("I/O error during {phase} on {}: {source}", path.display())]
    Io {
        phase: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ledger {op} failed: {details}")]
    Ledger { op: &'static str, details: String },
}

impl Error {
    /// Classify an I/O error raised while working on `path`
    ///
    /// `NotFound` and `PermissionDenied` get their own variants so callers can
    /// match on them; everything else keeps the original error as its source.
    pub fn io(phase: &'static str, path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => {
                Error::NotFound(format!("{} ({})", path.display(), phase))
            }
            io::ErrorKind::PermissionDenied => {
                Error::PermissionDenied(format!("{} ({})", path.display(), phase))
            }
            _ => Error::Io {
                phase,
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
