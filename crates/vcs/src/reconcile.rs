//! State reconciliation engine
//!
//! Drives the object store through the add and remove protocols. Each protocol
//! reads status strictly before and strictly after its mutating primitive and
//! commits once per call.

use crate::status::{StatusCode, Verb};
use crate::ObjectStore;
use ab_core::{Author, Error, RepoPath, Result};
use chrono::Utc;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What a protocol run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
    NoChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub action: Action,
    /// Files added/updated (Add) or removed (Remove)
    pub paths: Vec<RepoPath>,
    /// Commit created by this run
    pub revision: Option<String>,
}

impl Outcome {
    fn no_change() -> Self {
        Self {
            action: Action::NoChange,
            paths: Vec::new(),
            revision: None,
        }
    }
}

pub struct Reconciler<S: ObjectStore> {
    store: S,
    author: Author,
}

impl<S: ObjectStore> Reconciler<S> {
    pub fn new(store: S, author: Author) -> Self {
        Self { store, author }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stage and commit everything new or changed under `path`
    ///
    /// Returns `NoChange` without touching the index when nothing under `path`
    /// is untracked or modified.
    pub fn add(&self, path: &RepoPath) -> Result<Outcome> {
        refuse_root(path)?;

        let before = self.store.status(path)?;
        if !before.needs_add() {
            debug!(path = %path, "nothing to add");
            return Ok(Outcome::no_change());
        }

        self.store.stage(std::slice::from_ref(path))?;

        let after = self.store.status(path)?;
        let Some(verb) = after.commit_verb() else {
            warn!(path = %path, "stage left nothing to commit");
            return Ok(Outcome::no_change());
        };
        let affected = after.staged(&[StatusCode::Added, StatusCode::Modified]);

        let revision = self
            .store
            .commit(&verb.message(path), &self.author, Utc::now())?;
        info!(path = %path, %verb, files = affected.len(), "add committed");

        Ok(Outcome {
            action: Action::Add,
            paths: affected,
            revision: Some(revision),
        })
    }

    /// Delete `path` from the working tree and commit its removal
    pub fn remove(&self, path: &RepoPath) -> Result<Outcome> {
        refuse_root(path)?;

        // 1. working tree first
        let root = self.store.root().as_path();
        let abs = path.to_store_path(self.store.root());
        delete_from_worktree(&abs)?;
        prune_empty_ancestors(root, &abs)?;

        // 2. everything under the path that either axis reports as gone
        let before = self.store.status(path)?;
        let candidates = before.deleted();
        if candidates.is_empty() {
            debug!(path = %path, "nothing tracked to remove");
            return Ok(Outcome::no_change());
        }

        // 3. stage each removal individually
        self.store.stage_remove(&candidates)?;

        // 4. staging decides what the commit will drop
        let after = self.store.status(path)?;
        let to_remove = after.staged(&[StatusCode::Deleted]);
        if to_remove.is_empty() {
            warn!(path = %path, "removal staged nothing");
            return Ok(Outcome::no_change());
        }

        let message = Verb::Rm.message(path);
        let revision = self.store.commit(&message, &self.author, Utc::now())?;
        info!(path = %path, files = to_remove.len(), "remove committed");

        Ok(Outcome {
            action: Action::Remove,
            paths: to_remove,
            revision: Some(revision),
        })
    }
}

fn refuse_root(path: &RepoPath) -> Result<()> {
    if path.is_root() {
        return Err(Error::invalid_path(".", "the store root cannot be added or removed"));
    }
    Ok(())
}

fn delete_from_worktree(abs: &Path) -> Result<()> {
    let result = match fs::symlink_metadata(abs) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(abs),
        Ok(_) => fs::remove_file(abs),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io("stat store entry", abs, e)),
    };
    result.map_err(|e| Error::io("delete store entry", abs, e))
}

/// Remove ancestors of `abs` that hold no files, bottom-up, stopping below `root`
fn prune_empty_ancestors(root: &Path, abs: &Path) -> Result<()> {
    let mut current = abs.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        match fs::symlink_metadata(dir) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                current = dir.parent();
                continue;
            }
            Err(e) => return Err(Error::io("stat directory", dir, e)),
        }
        if !holds_no_files(dir)? {
            break;
        }
        fs::remove_dir_all(dir).map_err(|e| Error::io("prune directory", dir, e))?;
        debug!(dir = %dir.display(), "pruned empty directory");
        current = dir.parent();
    }
    Ok(())
}

fn holds_no_files(dir: &Path) -> Result<bool> {
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
            Error::io("scan directory", &path, source)
        })?;
        if !entry.file_type().is_dir() {
            return Ok(false);
        }
    }
    Ok(true)
}
