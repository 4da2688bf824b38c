//! Ledger row types

use chrono::{DateTime, Utc};
use ab_core::RepoPath;

/// One row of the `file_operations` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEntry {
    pub id: i64,
    pub repo_path: RepoPath,
    /// Source location as recorded at the last add
    pub source_path: String,
    pub is_file: bool,
    /// Number of history entries at the last upsert (1 for directory roots)
    pub revision_count: i64,
    /// Discovered under a tracked directory rather than added directly
    pub is_sub: bool,
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of [`crate::Ledger::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted(i64),
    Updated(i64),
}

impl Upsert {
    pub fn id(self) -> i64 {
        match self {
            Upsert::Inserted(id) | Upsert::Updated(id) => id,
        }
    }
}
