//! Common utilities for integration tests

#![allow(dead_code)]

pub mod cli;

use anybakup::{Backup, SourcePath, StoreConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub use cli::{AbkCommand, CommandResult};

/// Temp sandbox with separate source, store and config directories
pub struct TestEnv {
    _dir: TempDir,
    pub source: PathBuf,
    pub store: PathBuf,
    pub config: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let base = dir.path().canonicalize().expect("canonicalize temp dir");
        let env = Self {
            source: base.join("source"),
            store: base.join("store"),
            config: base.join("config"),
            _dir: dir,
        };
        fs::create_dir_all(&env.source).expect("create source dir");
        env
    }

    /// Write `content` to `rel` under the source directory
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.source.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, content).expect("write source file");
        path
    }

    pub fn source_path(&self, rel: &str) -> SourcePath {
        SourcePath::new(self.source.join(rel)).expect("utf-8 source path")
    }

    /// Open (initializing first if needed) a store with the default author
    pub fn backup(&self) -> Backup {
        let config = StoreConfig::at(&self.store).expect("valid store root");
        if self.store.join(".git").exists() {
            Backup::open(config).expect("open store")
        } else {
            Backup::init(config).expect("init store")
        }
    }

    pub fn command(&self) -> AbkCommand {
        AbkCommand::new(&self.source, &self.config)
    }

    pub fn store_file(&self, path: &Path) -> PathBuf {
        let rel = path
            .to_str()
            .expect("utf-8 path")
            .trim_start_matches('/');
        self.store.join(rel)
    }
}
