//! Operation facade
//!
//! `Backup` ties the path model, mirror copy, reconciliation engine and ledger
//! together. Each call runs to completion: the ledger is written only after a
//! commit succeeded, and a ledger failure after a commit is reported in the
//! returned report rather than as an error (the commit stands).

use ab_core::mirror::{copy_into_store, EntryKind};
use ab_core::{Error, RepoPath, Result, SourcePath, StoreConfig, StoreRoot};
use ledger::{Ledger, TrackedEntry};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{error, info};
use vcs::{Action, GitStore, ObjectStore, Reconciler, VersionRecord};

/// Result of [`Backup::add_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddReport {
    pub repo_path: RepoPath,
    pub action: Action,
    /// Files added or updated by the commit
    pub affected: Vec<RepoPath>,
    pub revision: Option<String>,
    /// Set when the commit succeeded but recording it in the ledger failed
    pub ledger_error: Option<String>,
}

/// Result of [`Backup::remove_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveReport {
    pub repo_path: RepoPath,
    pub action: Action,
    pub removed: Vec<RepoPath>,
    pub revision: Option<String>,
    pub ledger_error: Option<String>,
}

/// Stored bytes next to the current source bytes, for rendering a diff
#[derive(Debug, Clone)]
pub struct DiffInput {
    pub repo_path: RepoPath,
    pub revision: String,
    /// Empty if the path is absent from `revision`
    pub stored: Vec<u8>,
    /// Empty if the source file no longer exists
    pub current: Vec<u8>,
}

pub struct Backup {
    pub(crate) config: StoreConfig,
    pub(crate) engine: Reconciler<GitStore>,
    pub(crate) ledger: Ledger,
}

impl Backup {
    /// Create a new store (or re-initialize an existing one) and open it
    pub fn init(config: StoreConfig) -> Result<Self> {
        let store = GitStore::init(&config.root)?;
        Self::assemble(config, store)
    }

    /// Open an existing store
    pub fn open(config: StoreConfig) -> Result<Self> {
        let store = GitStore::open(&config.root)?;
        Self::assemble(config, store)
    }

    fn assemble(config: StoreConfig, store: GitStore) -> Result<Self> {
        let ledger = Ledger::open(&config.root)?;
        let engine = Reconciler::new(store, config.author.clone());
        Ok(Self {
            config,
            engine,
            ledger,
        })
    }

    pub fn root(&self) -> &StoreRoot {
        &self.config.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Mirror `source` into the store and commit it
    ///
    /// Directories are added as a whole; every new or changed file below
    /// them gets its own ledger row.
    pub fn add_file(&mut self, source: &SourcePath) -> Result<AddReport> {
        self.add_file_tagged(source, None)
    }

    /// [`Backup::add_file`], tagging the root row before any file row is written
    ///
    /// Files recorded by the same call inherit `tag` through the root.
    pub fn add_file_tagged(&mut self, source: &SourcePath, tag: Option<&str>) -> Result<AddReport> {
        let repo_path = source.to_repo_path()?;
        if repo_path.is_root() {
            return Err(Error::invalid_path(source.as_str(), "cannot back up a filesystem root"));
        }

        let mirrored = copy_into_store(source, &self.config.root)?;
        let outcome = self.engine.add(&repo_path)?;

        let ledger_error = if outcome.action == Action::Add {
            self.record_add(source, &repo_path, mirrored.kind, &outcome.paths, tag)
                .err()
                .map(|e| {
                    error!(path = %repo_path, error = %e, "committed but ledger update failed");
                    e.to_string()
                })
        } else {
            if let Some(tag) = tag {
                self.ledger.set_tag(&repo_path, tag)?;
            }
            None
        };

        Ok(AddReport {
            repo_path,
            action: outcome.action,
            affected: outcome.paths,
            revision: outcome.revision,
            ledger_error,
        })
    }

    fn record_add(
        &mut self,
        source: &SourcePath,
        root: &RepoPath,
        kind: EntryKind,
        affected: &[RepoPath],
        tag: Option<&str>,
    ) -> Result<()> {
        let enclosing = self.ledger.find_enclosing_directory(source)?;

        // the root row goes first so files below it can inherit its tag
        match kind {
            EntryKind::Directory => {
                self.ledger
                    .upsert(root, source.as_str(), false, enclosing.is_some(), 1)?;
                self.tag_root(root, tag, enclosing.as_ref())?;
            }
            EntryKind::File => {
                let replaced_dir = self.ledger.get(root)?.is_some_and(|row| !row.is_file);
                if replaced_dir {
                    let dropped = self.ledger.remove_under(root)?;
                    info!(path = %root, dropped, "directory replaced by a file");
                }
            }
        }

        for path in affected {
            let file_source = if path == root {
                source.clone()
            } else {
                path.to_source_path()?
            };
            let is_sub = path != root || enclosing.is_some();
            let revisions = self.engine.store().log(path)?.len() as i64;
            self.ledger
                .upsert(path, file_source.as_str(), true, is_sub, revisions)?;

            if path == root && kind == EntryKind::File {
                self.tag_root(root, tag, enclosing.as_ref())?;
            } else {
                let parent_dir = self.ledger.find_enclosing_directory(&file_source)?;
                self.inherit_tag(path, parent_dir.as_ref())?;
            }
        }

        info!(path = %root, files = affected.len(), "ledger updated");
        Ok(())
    }

    fn tag_root(&self, root: &RepoPath, tag: Option<&str>, enclosing: Option<&TrackedEntry>) -> Result<()> {
        match tag {
            Some(tag) => self.ledger.set_tag(root, tag),
            None => self.inherit_tag(root, enclosing),
        }
    }

    /// Copy the enclosing directory's tag onto an untagged row
    pub(crate) fn inherit_tag(&self, path: &RepoPath, enclosing: Option<&TrackedEntry>) -> Result<()> {
        let Some(tag) = enclosing.and_then(|dir| dir.tag.as_deref()) else {
            return Ok(());
        };
        if self.ledger.get_tag(path)?.is_none() {
            self.ledger.set_tag(path, tag)?;
        }
        Ok(())
    }

    /// Delete `source`'s mirror from the store and commit the removal
    ///
    /// The ledger loses the root row, every removed file and anything nested
    /// below the root.
    pub fn remove_file(&mut self, source: &SourcePath) -> Result<RemoveReport> {
        let repo_path = source.to_repo_path()?;
        let outcome = self.engine.remove(&repo_path)?;

        let ledger_error = self
            .forget(&repo_path, &outcome.paths)
            .err()
            .map(|e| {
                error!(path = %repo_path, error = %e, "removed but ledger cleanup failed");
                e.to_string()
            });

        Ok(RemoveReport {
            repo_path,
            action: outcome.action,
            removed: outcome.paths,
            revision: outcome.revision,
            ledger_error,
        })
    }

    fn forget(&self, root: &RepoPath, removed: &[RepoPath]) -> Result<()> {
        self.ledger.remove(root)?;
        for path in removed {
            self.ledger.remove(path)?;
        }
        let nested = self.ledger.remove_under(root)?;
        info!(path = %root, files = removed.len(), nested, "ledger rows dropped");
        Ok(())
    }

    /// Write the bytes `repo_path` had at `revision` to `destination`
    ///
    /// Parent directories are created; the file is swapped in atomically and
    /// gets the executable bit back if it was recorded.
    pub fn get_file_at_revision(
        &self,
        repo_path: &RepoPath,
        revision: &str,
        destination: &Path,
    ) -> Result<()> {
        let blob = self.engine.store().read_file_at(revision, repo_path)?;

        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| Error::io("create directory", parent, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| Error::io("create temp file", parent, e))?;
        tmp.write_all(&blob.bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| Error::io("write checkout", tmp.path(), e))?;
        set_mode(tmp.as_file(), blob.executable)
            .map_err(|e| Error::io("set permissions", destination, e))?;
        tmp.persist(destination)
            .map_err(|e| Error::io("replace destination", destination, e.error))?;

        info!(path = %repo_path, revision, dest = %destination.display(), "checked out");
        Ok(())
    }

    /// Revisions touching `repo_path`, newest first
    pub fn list_history(&self, repo_path: &RepoPath) -> Result<Vec<VersionRecord>> {
        let history = self.engine.store().log(repo_path)?;
        if history.is_empty() {
            return Err(Error::NoHistory(repo_path.to_string()));
        }
        Ok(history)
    }

    pub fn set_tag(&self, source: &SourcePath, tag: &str) -> Result<()> {
        self.ledger.set_tag(&source.to_repo_path()?, tag)
    }

    pub fn get_tag(&self, source: &SourcePath) -> Result<Option<String>> {
        self.ledger.get_tag(&source.to_repo_path()?)
    }

    pub fn entry(&self, source: &SourcePath) -> Result<Option<TrackedEntry>> {
        self.ledger.get(&source.to_repo_path()?)
    }

    /// Every ledger row, most recently updated first
    pub fn entries(&self) -> Result<Vec<TrackedEntry>> {
        self.ledger.list_all()
    }

    pub fn entries_by_tag(&self, tag: &str) -> Result<Vec<TrackedEntry>> {
        self.ledger.list_by_tag(tag)
    }

    pub fn tags(&self) -> Result<Vec<String>> {
        self.ledger.list_tags()
    }

    /// Stored bytes at `revision` (default: newest) next to the source's current bytes
    pub fn diff(&self, source: &SourcePath, revision: Option<&str>) -> Result<DiffInput> {
        let repo_path = source.to_repo_path()?;
        let revision = match revision {
            Some(revision) => revision.to_string(),
            None => self
                .list_history(&repo_path)?
                .into_iter()
                .next()
                .map(|record| record.revision)
                .ok_or_else(|| Error::NoHistory(repo_path.to_string()))?,
        };

        let stored = match self.engine.store().read_file_at(&revision, &repo_path) {
            Ok(blob) => blob.bytes,
            Err(Error::PathNotInRevision { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        let current = match fs::read(source.as_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(Error::io("read source", source.as_path(), e)),
        };

        Ok(DiffInput {
            repo_path,
            revision,
            stored,
            current,
        })
    }
}

#[cfg(unix)]
fn set_mode(file: &fs::File, executable: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = if executable { 0o755 } else { 0o644 };
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &fs::File, _executable: bool) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backup() -> (TempDir, Backup) {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::at(dir.path().join("store")).unwrap();
        (dir, Backup::init(config).unwrap())
    }

    fn source(path: &Path) -> SourcePath {
        SourcePath::new(path).unwrap()
    }

    #[test]
    fn test_open_requires_initialized_store() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::at(dir.path().join("missing")).unwrap();
        assert!(matches!(Backup::open(config), Err(Error::StoreCorrupt { .. })));
    }

    #[test]
    fn test_add_records_file_row() {
        let (dir, mut backup) = backup();
        let file = dir.path().join("src/notes.txt");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "hello").unwrap();

        let report = backup.add_file(&source(&file)).unwrap();
        assert_eq!(report.action, Action::Add);
        assert_eq!(report.affected, vec![report.repo_path.clone()]);
        assert!(report.ledger_error.is_none());

        let entry = backup.entry(&source(&file)).unwrap().unwrap();
        assert!(entry.is_file);
        assert!(!entry.is_sub);
        assert_eq!(entry.revision_count, 1);
        assert_eq!(entry.source_path, source(&file).as_str());
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let (dir, mut backup) = backup();
        let err = backup.add_file(&source(&dir.path().join("ghost.txt"))).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(backup.entries().unwrap().is_empty());
    }

    #[test]
    fn test_filesystem_root_refused() {
        let (_dir, mut backup) = backup();
        let root = SourcePath::new(if cfg!(windows) { "C:\\" } else { "/" }).unwrap();
        assert!(matches!(backup.add_file(&root), Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn test_checkout_is_atomic_and_creates_parents() {
        let (dir, mut backup) = backup();
        let file = dir.path().join("src/a.txt");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "v1").unwrap();
        let report = backup.add_file(&source(&file)).unwrap();
        let revision = report.revision.unwrap();

        let dest = dir.path().join("restore/deep/a.txt");
        backup
            .get_file_at_revision(&report.repo_path, &revision, &dest)
            .unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "v1");

        let leftovers: Vec<_> = fs::read_dir(dest.parent().unwrap()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_history_of_unknown_path() {
        let (_dir, backup) = backup();
        let path = RepoPath::parse("never/added.txt").unwrap();
        assert!(matches!(backup.list_history(&path), Err(Error::NoHistory(_))));
    }

    #[test]
    fn test_diff_against_newest() {
        let (dir, mut backup) = backup();
        let file = dir.path().join("src/a.txt");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "old\n").unwrap();
        backup.add_file(&source(&file)).unwrap();
        fs::write(&file, "new\n").unwrap();

        let diff = backup.diff(&source(&file), None).unwrap();
        assert_eq!(diff.stored, b"old\n");
        assert_eq!(diff.current, b"new\n");
    }

    #[test]
    fn test_history_on_fresh_store_is_no_history() {
        let (dir, backup) = backup();
        let path = RepoPath::parse("never/added.txt").unwrap();
        assert!(matches!(backup.list_history(&path), Err(Error::NoHistory(_))));

        let file = dir.path().join("src/a.txt");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "a").unwrap();
        assert!(matches!(backup.diff(&source(&file), None), Err(Error::NoHistory(_))));
    }

    #[test]
    fn test_remove_is_repeatable() {
        let (dir, mut backup) = backup();
        let file = dir.path().join("src/a.txt");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "a").unwrap();
        backup.add_file(&source(&file)).unwrap();

        assert_eq!(backup.remove_file(&source(&file)).unwrap().action, Action::Remove);
        assert_eq!(backup.remove_file(&source(&file)).unwrap().action, Action::NoChange);

        let never = dir.path().join("nowhere/x.txt");
        let report = backup.remove_file(&source(&never)).unwrap();
        assert_eq!(report.action, Action::NoChange);
        assert!(report.ledger_error.is_none());
    }

    #[test]
    fn test_tag_given_with_directory_add_reaches_its_files() {
        let (dir, mut backup) = backup();
        let root = dir.path().join("photos");
        fs::create_dir_all(root.join("raw")).unwrap();
        fs::write(root.join("one.jpg"), "1").unwrap();
        fs::write(root.join("raw/two.cr2"), "2").unwrap();

        backup.add_file_tagged(&source(&root), Some("pictures")).unwrap();

        let rows = backup.entries_by_tag("pictures").unwrap();
        assert_eq!(rows.len(), 3);
        let two = backup.entry(&source(&root.join("raw/two.cr2"))).unwrap().unwrap();
        assert_eq!(two.tag.as_deref(), Some("pictures"));
    }

    #[test]
    fn test_tag_given_with_unchanged_add() {
        let (dir, mut backup) = backup();
        let file = dir.path().join("a.txt");
        fs::write(&file, "a").unwrap();
        backup.add_file(&source(&file)).unwrap();

        let report = backup.add_file_tagged(&source(&file), Some("late")).unwrap();
        assert_eq!(report.action, Action::NoChange);
        assert_eq!(backup.get_tag(&source(&file)).unwrap().as_deref(), Some("late"));
    }

    #[test]
    fn test_file_replacing_directory_drops_nested_rows() {
        let (dir, mut backup) = backup();
        let target = dir.path().join("x");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("a.txt"), "a").unwrap();
        fs::write(target.join("b.txt"), "b").unwrap();
        backup.add_file(&source(&target)).unwrap();
        assert_eq!(backup.entries().unwrap().len(), 3);

        fs::remove_dir_all(&target).unwrap();
        fs::write(&target, "now a file").unwrap();
        let report = backup.add_file(&source(&target)).unwrap();
        assert_eq!(report.action, Action::Add);

        let entries = backup.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_file);
        assert_eq!(entries[0].source_path, source(&target).as_str());
    }
}
