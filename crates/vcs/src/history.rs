//! Version records returned by history queries

use chrono::{DateTime, Utc};

/// One committed revision touching a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    /// Full commit hash (hex)
    pub revision: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl VersionRecord {
    /// Abbreviated hash for display
    pub fn short_revision(&self) -> &str {
        let end = self.revision.len().min(8);
        &self.revision[..end]
    }
}

/// Bytes of a file as stored in one revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub bytes: Vec<u8>,
    pub executable: bool,
}
