//! anybakup ledger - SQLite side table of tracked paths
//!
//! One row per tracked file or directory root, keyed by its repo path. The
//! table lives next to the store (`file_operations.db`) and records the
//! source location, tag and revision count of each entry.

pub mod entry;
pub mod ledger;
pub mod schema;

pub use entry::{TrackedEntry, Upsert};
pub use ledger::Ledger;
