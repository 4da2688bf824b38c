//! Per-path status codes and scoped snapshots
//!
//! A snapshot is taken strictly before and strictly after every mutating
//! primitive; the reconciler reads the commit verb and the affected set from it.

use ab_core::RepoPath;
use std::collections::BTreeMap;
use std::fmt;

/// State of a path on one axis (staging or worktree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Unmodified,
    Untracked,
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    ConflictedUnmerged,
    Error,
}

impl StatusCode {
    /// Porcelain-style single character
    pub fn as_char(self) -> char {
        match self {
            StatusCode::Unmodified => ' ',
            StatusCode::Untracked => '?',
            StatusCode::Modified => 'M',
            StatusCode::Added => 'A',
            StatusCode::Deleted => 'D',
            StatusCode::Renamed => 'R',
            StatusCode::Copied => 'C',
            StatusCode::ConflictedUnmerged => 'U',
            StatusCode::Error => '!',
        }
    }
}

/// Both axes for one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileState {
    /// What would be committed
    pub staging: StatusCode,
    /// What differs on disk from the index
    pub worktree: StatusCode,
}

impl FileState {
    pub fn new(staging: StatusCode, worktree: StatusCode) -> Self {
        Self { staging, worktree }
    }
}

/// Commit message verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Add,
    Rm,
    Update,
}

impl Verb {
    /// `"<VERB> <path>"`
    pub fn message(self, path: &RepoPath) -> String {
        format!("{} {}", self, path.as_str())
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verb::Add => "ADD",
            Verb::Rm => "RM",
            Verb::Update => "UPDATE",
        })
    }
}

/// Status of every changed path under one scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    scope: RepoPath,
    entries: BTreeMap<RepoPath, FileState>,
}

impl StatusSnapshot {
    pub fn new(scope: RepoPath) -> Self {
        Self {
            scope,
            entries: BTreeMap::new(),
        }
    }

    pub fn scope(&self) -> &RepoPath {
        &self.scope
    }

    /// Record a path; paths outside the scope are dropped
    pub fn insert(&mut self, path: RepoPath, state: FileState) -> bool {
        if !self.scope.contains(&path) {
            return false;
        }
        self.entries.insert(path, state);
        true
    }

    pub fn get(&self, path: &RepoPath) -> Option<&FileState> {
        self.entries.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RepoPath, &FileState)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if staging would pick anything up
    ///
    /// Untracked or modified files on disk count, and so do changes already
    /// staged but never committed.
    pub fn needs_add(&self) -> bool {
        self.entries.values().any(|s| {
            matches!(s.worktree, StatusCode::Untracked | StatusCode::Modified)
                || matches!(s.staging, StatusCode::Added | StatusCode::Modified)
        })
    }

    /// Verb for the whole snapshot: `ADD` over `RM` over `UPDATE`
    ///
    /// `None` when nothing is staged.
    pub fn commit_verb(&self) -> Option<Verb> {
        let has = |code| self.entries.values().any(|s| s.staging == code);
        if has(StatusCode::Added) {
            Some(Verb::Add)
        } else if has(StatusCode::Deleted) {
            Some(Verb::Rm)
        } else if has(StatusCode::Modified) {
            Some(Verb::Update)
        } else {
            None
        }
    }

    /// Paths whose staging code is one of `codes`, in path order
    pub fn staged(&self, codes: &[StatusCode]) -> Vec<RepoPath> {
        self.entries
            .iter()
            .filter(|(_, s)| codes.contains(&s.staging))
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Paths deleted on either axis
    pub fn deleted(&self) -> Vec<RepoPath> {
        self.entries
            .iter()
            .filter(|(_, s)| s.staging == StatusCode::Deleted || s.worktree == StatusCode::Deleted)
            .map(|(p, _)| p.clone())
            .collect()
    }
}
