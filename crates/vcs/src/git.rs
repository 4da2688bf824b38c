//! libgit2-backed object store
//!
//! The store root is a plain (non-bare) repository. The ledger database sits in
//! the same directory and is kept out of status through `.git/info/exclude`.

use crate::history::{FileBlob, VersionRecord};
use crate::status::{FileState, StatusCode, StatusSnapshot};
use crate::ObjectStore;
use ab_core::path::RESERVED_ROOT_NAMES;
use ab_core::{Author, Error, RepoPath, Result, StoreRoot};
use chrono::{DateTime, Utc};
use git2::{
    Commit, ErrorCode, IndexAddOption, ObjectType, Oid, Repository, Signature, Sort, Status,
    StatusOptions, Time, Tree, TreeWalkMode, TreeWalkResult,
};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const FILEMODE_EXECUTABLE: i32 = 0o100755;

pub struct GitStore {
    repo: Repository,
    root: StoreRoot,
}

impl GitStore {
    /// Borrow the underlying repository
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    fn resolve_commit(&self, revision: &str) -> Result<Commit<'_>> {
        self.repo
            .revparse_single(revision)
            .and_then(|object| object.peel_to_commit())
            .map_err(|_| Error::RevisionNotFound(revision.to_string()))
    }

    fn head_commit(&self) -> Result<Option<Commit<'_>>> {
        match self.repo.head() {
            Ok(reference) => reference
                .peel_to_commit()
                .map(Some)
                .map_err(corrupt("resolve HEAD")),
            Err(e) if is_unborn(&e) => Ok(None),
            Err(e) => Err(corrupt("resolve HEAD")(e)),
        }
    }

    /// Make sure the ledger files never show up in status
    fn write_excludes(&self) -> Result<()> {
        let info_dir = self.repo.path().join("info");
        let exclude = info_dir.join("exclude");
        let existing = match fs::read_to_string(&exclude) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(Error::io("read exclude file", &exclude, e)),
        };

        let missing: Vec<String> = RESERVED_ROOT_NAMES
            .iter()
            .map(|name| format!("/{name}"))
            .filter(|line| !existing.lines().any(|l| l.trim() == line.as_str()))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let mut content = existing;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        for line in missing {
            content.push_str(&line);
            content.push('\n');
        }
        fs::create_dir_all(&info_dir).map_err(|e| Error::io("create info dir", &info_dir, e))?;
        fs::write(&exclude, content).map_err(|e| Error::io("write exclude file", &exclude, e))
    }

    fn from_repository(repo: Repository, root: &StoreRoot) -> Result<Self> {
        if repo.workdir().is_none() {
            return Err(Error::StoreCorrupt {
                op: "open",
                details: format!("{root} is a bare repository"),
            });
        }
        let store = Self {
            repo,
            root: root.clone(),
        };
        store.write_excludes()?;
        Ok(store)
    }
}

impl ObjectStore for GitStore {
    fn open(root: &StoreRoot) -> Result<Self> {
        let repo = Repository::open(root.as_path()).map_err(|e| Error::StoreCorrupt {
            op: "open",
            details: format!("{root} is not a backup store: {}", e.message()),
        })?;
        Self::from_repository(repo, root)
    }

    fn init(root: &StoreRoot) -> Result<Self> {
        fs::create_dir_all(root.as_path())
            .map_err(|e| Error::io("create store root", root.as_path(), e))?;
        let repo = Repository::init(root.as_path()).map_err(corrupt("init"))?;
        info!(root = %root, "initialized store");
        Self::from_repository(repo, root)
    }

    fn root(&self) -> &StoreRoot {
        &self.root
    }

    fn stage(&self, paths: &[RepoPath]) -> Result<()> {
        let mut index = self.repo.index().map_err(rejected("open index"))?;
        for path in paths {
            if has_glob_chars(path) {
                // pathspec matching would misread the name, add each file literally
                let snapshot = self.status(path)?;
                for (file, state) in snapshot.iter() {
                    if matches!(state.worktree, StatusCode::Untracked | StatusCode::Modified) {
                        index
                            .add_path(Path::new(file.as_str()))
                            .map_err(rejected("stage"))?;
                    }
                }
            } else {
                index
                    .add_all([path.as_str()], IndexAddOption::FORCE, None)
                    .map_err(rejected("stage"))?;
            }
            debug!(path = %path, "staged");
        }
        index.write().map_err(rejected("write index"))
    }

    fn stage_remove(&self, paths: &[RepoPath]) -> Result<()> {
        let mut index = self.repo.index().map_err(rejected("open index"))?;
        for path in paths {
            index
                .remove_path(Path::new(path.as_str()))
                .map_err(rejected("stage removal"))?;
            debug!(path = %path, "staged removal");
        }
        index.write().map_err(rejected("write index"))
    }

    fn commit(&self, message: &str, author: &Author, timestamp: DateTime<Utc>) -> Result<String> {
        let mut index = self.repo.index().map_err(rejected("open index"))?;
        let tree_id = index.write_tree().map_err(rejected("write tree"))?;
        let tree = self.repo.find_tree(tree_id).map_err(corrupt("find tree"))?;

        let time = Time::new(timestamp.timestamp(), 0);
        let signature =
            Signature::new(&author.name, &author.email, &time).map_err(rejected("signature"))?;

        let parent = self.head_commit()?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(rejected("commit"))?;

        info!(revision = %oid, message, "committed");
        Ok(oid.to_string())
    }

    fn status(&self, scope: &RepoPath) -> Result<StatusSnapshot> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(true)
            .recurse_ignored_dirs(true);
        if !scope.is_root() && !has_glob_chars(scope) {
            opts.pathspec(scope.as_str());
        }

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(corrupt("status"))?;

        let mut snapshot = StatusSnapshot::new(scope.clone());
        for entry in statuses.iter() {
            let Some(raw) = entry.path() else {
                return Err(Error::StoreCorrupt {
                    op: "status",
                    details: "path is not valid UTF-8".to_string(),
                });
            };
            // ledger files and other names outside the store layout
            let Ok(path) = RepoPath::parse(raw.trim_end_matches('/')) else {
                continue;
            };
            let flags = entry.status();
            snapshot.insert(path, FileState::new(staging_code(flags), worktree_code(flags)));
        }

        debug!(scope = %scope, entries = snapshot.len(), "status snapshot");
        Ok(snapshot)
    }

    fn log(&self, path: &RepoPath) -> Result<Vec<VersionRecord>> {
        let Some(head) = self.head_commit()? else {
            return Ok(Vec::new());
        };
        let mut walk = self.repo.revwalk().map_err(corrupt("log"))?;
        walk.push(head.id()).map_err(corrupt("log"))?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .map_err(corrupt("log"))?;

        let mut records = Vec::new();
        for oid in walk {
            let oid = oid.map_err(corrupt("log"))?;
            let commit = self.repo.find_commit(oid).map_err(corrupt("log"))?;
            if touches(&commit, path)? {
                records.push(version_record(&commit)?);
            }
        }
        Ok(records)
    }

    fn head(&self) -> Result<Option<String>> {
        Ok(self.head_commit()?.map(|c| c.id().to_string()))
    }

    fn read_file_at(&self, revision: &str, path: &RepoPath) -> Result<FileBlob> {
        if path.is_root() {
            return Err(Error::invalid_path(".", "the store root is not a file"));
        }
        let commit = self.resolve_commit(revision)?;
        let tree = commit.tree().map_err(corrupt("read tree"))?;
        let entry = tree
            .get_path(Path::new(path.as_str()))
            .map_err(|_| Error::PathNotInRevision {
                path: path.to_string(),
                revision: revision.to_string(),
            })?;
        if entry.kind() != Some(ObjectType::Blob) {
            return Err(Error::invalid_path(
                path.as_str(),
                format!("is a directory in revision {revision}"),
            ));
        }
        let blob = self.repo.find_blob(entry.id()).map_err(corrupt("read blob"))?;
        Ok(FileBlob {
            bytes: blob.content().to_vec(),
            executable: entry.filemode() == FILEMODE_EXECUTABLE,
        })
    }

    fn exists_at(&self, revision: &str, path: &RepoPath) -> Result<bool> {
        let commit = self.resolve_commit(revision)?;
        let tree = commit.tree().map_err(corrupt("read tree"))?;
        Ok(entry_key(&tree, path).is_some())
    }

    fn files_at(&self, revision: &str) -> Result<Vec<RepoPath>> {
        let commit = self.resolve_commit(revision)?;
        let tree = commit.tree().map_err(corrupt("read tree"))?;

        let mut files = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    if let Ok(path) = RepoPath::parse(&format!("{dir}{name}")) {
                        files.push(path);
                    }
                }
            }
            TreeWalkResult::Ok
        })
        .map_err(corrupt("walk tree"))?;
        Ok(files)
    }
}

/// Staging axis: what would be committed
fn staging_code(flags: Status) -> StatusCode {
    if flags.contains(Status::CONFLICTED) {
        StatusCode::ConflictedUnmerged
    } else if flags.contains(Status::INDEX_NEW) {
        StatusCode::Added
    } else if flags.intersects(Status::INDEX_MODIFIED | Status::INDEX_TYPECHANGE) {
        StatusCode::Modified
    } else if flags.contains(Status::INDEX_DELETED) {
        StatusCode::Deleted
    } else if flags.contains(Status::INDEX_RENAMED) {
        StatusCode::Renamed
    } else if flags.intersects(Status::WT_NEW | Status::IGNORED) {
        StatusCode::Untracked
    } else {
        StatusCode::Unmodified
    }
}

/// Worktree axis: what differs on disk
fn worktree_code(flags: Status) -> StatusCode {
    if flags.contains(Status::CONFLICTED) {
        StatusCode::ConflictedUnmerged
    } else if flags.intersects(Status::WT_NEW | Status::IGNORED) {
        StatusCode::Untracked
    } else if flags.intersects(Status::WT_MODIFIED | Status::WT_TYPECHANGE) {
        StatusCode::Modified
    } else if flags.contains(Status::WT_DELETED) {
        StatusCode::Deleted
    } else if flags.contains(Status::WT_RENAMED) {
        StatusCode::Renamed
    } else {
        StatusCode::Unmodified
    }
}

/// Blob/tree id and mode of `path` inside `tree`
fn entry_key(tree: &Tree<'_>, path: &RepoPath) -> Option<(Oid, i32)> {
    if path.is_root() {
        return Some((tree.id(), 0o040000));
    }
    tree.get_path(Path::new(path.as_str()))
        .ok()
        .map(|entry| (entry.id(), entry.filemode()))
}

/// A commit touches `path` when its entry differs from the first parent's
fn touches(commit: &Commit<'_>, path: &RepoPath) -> Result<bool> {
    let tree = commit.tree().map_err(corrupt("read tree"))?;
    let current = entry_key(&tree, path);
    if commit.parent_count() == 0 {
        return Ok(current.is_some());
    }
    let parent = commit.parent(0).map_err(corrupt("read parent"))?;
    let parent_tree = parent.tree().map_err(corrupt("read tree"))?;
    Ok(current != entry_key(&parent_tree, path))
}

fn version_record(commit: &Commit<'_>) -> Result<VersionRecord> {
    let seconds = commit.time().seconds();
    let timestamp = DateTime::from_timestamp(seconds, 0).ok_or_else(|| Error::StoreCorrupt {
        op: "log",
        details: format!("commit {} has timestamp {seconds} out of range", commit.id()),
    })?;
    Ok(VersionRecord {
        revision: commit.id().to_string(),
        author: String::from_utf8_lossy(commit.author().name_bytes()).into_owned(),
        timestamp,
        message: String::from_utf8_lossy(commit.message_bytes())
            .trim_end()
            .to_string(),
    })
}

fn has_glob_chars(path: &RepoPath) -> bool {
    path.as_str().contains(&['*', '?', '[', '\\'][..])
}

fn is_unborn(e: &git2::Error) -> bool {
    matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound)
}

fn corrupt(op: &'static str) -> impl Fn(git2::Error) -> Error {
    move |e| Error::StoreCorrupt {
        op,
        details: e.message().to_string(),
    }
}

fn rejected(op: &'static str) -> impl Fn(git2::Error) -> Error {
    move |e| Error::Reconcile {
        op,
        details: e.message().to_string(),
    }
}
