//! anybakup core - path model, mirror copy and shared error type
//!
//! This crate provides the foundation every other anybakup crate builds on:
//! - Source, repo and store-root path types with an invertible encoding
//! - Mirroring of source files and directories into the store working tree
//! - The in-process store configuration
//! - The shared `Error` enum

pub mod config;
pub mod error;
pub mod mirror;
pub mod path;

// Re-export main types for convenience
pub use config::{Author, StoreConfig};
pub use error::{Error, Result};
pub use mirror::{copy_into_store, EntryKind, Mirrored};
pub use path::{to_absolute_store_path, PathStyle, RepoPath, SourcePath, StoreRoot};
