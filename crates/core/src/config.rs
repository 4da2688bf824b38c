//! In-process store configuration
//!
//! Passed explicitly into the engine and the facade, so several stores can be
//! driven from one process.

use crate::error::Result;
use crate::path::StoreRoot;
use std::path::Path;

pub const DEFAULT_AUTHOR_NAME: &str = "anybakup";
pub const DEFAULT_AUTHOR_EMAIL: &str = "anybakup@localhost";

/// Identity recorded on every commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl Default for Author {
    fn default() -> Self {
        Self::new(DEFAULT_AUTHOR_NAME, DEFAULT_AUTHOR_EMAIL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: StoreRoot,
    pub author: Author,
}

impl StoreConfig {
    pub fn new(root: StoreRoot, author: Author) -> Self {
        Self { root, author }
    }

    /// Config for `root` with the default author
    pub fn at(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(StoreRoot::new(root)?, Author::default()))
    }
}
