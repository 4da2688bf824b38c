//! Mirror copy - replicate source files and directories into the store tree
//!
//! The mirror only writes bytes under the store root. Version-control state
//! and the ledger are left to the callers.

use crate::error::{Error, Result};
use crate::path::{RepoPath, SourcePath, StoreRoot};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What kind of filesystem entry was mirrored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Result of a mirror copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirrored {
    /// Location of the mirrored root inside the store
    pub repo_path: RepoPath,
    pub kind: EntryKind,
    /// Number of files (and links) written
    pub files: usize,
}

/// Copy `source` into the store working tree at its repo path
///
/// Directories are mirrored recursively and the copy stops at the first error.
/// Files that disappeared from the source since a previous copy stay in the
/// mirror. Nested `.git` directories are skipped.
pub fn copy_into_store(source: &SourcePath, root: &StoreRoot) -> Result<Mirrored> {
    let src = source.as_path();
    if src.starts_with(root.as_path()) {
        return Err(Error::invalid_path(source.as_str(), "source lies inside the store"));
    }
    if root.as_path().starts_with(src) {
        return Err(Error::invalid_path(source.as_str(), "source contains the store root"));
    }

    let repo_path = source.to_repo_path()?;
    let meta = fs::symlink_metadata(src).map_err(|e| Error::io("stat source", src, e))?;
    let dest = repo_path.to_store_path(root);

    let (kind, files) = if meta.is_dir() {
        (EntryKind::Directory, mirror_dir(src, &dest)?)
    } else if meta.file_type().is_symlink() {
        copy_symlink(src, &dest)?;
        (EntryKind::File, 1)
    } else {
        copy_file(src, &dest)?;
        (EntryKind::File, 1)
    };

    debug!(source = %source, dest = %dest.display(), files, "mirrored into store");
    Ok(Mirrored {
        repo_path,
        kind,
        files,
    })
}

fn mirror_dir(src: &Path, dest: &Path) -> Result<usize> {
    let mut files = 0;
    let mut walker = WalkDir::new(src).follow_links(false).into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| walk_error(e, src))?;
        let file_type = entry.file_type();

        if entry.depth() > 0 && entry.file_name().eq_ignore_ascii_case(".git") {
            warn!(path = %entry.path().display(), "skipping nested .git entry");
            if file_type.is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        let rel = entry.path().strip_prefix(src).map_err(|_| {
            Error::invalid_path(entry.path().display().to_string(), "escaped the source root")
        })?;
        let target = dest.join(rel);

        if file_type.is_dir() {
            ensure_dir(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            files += 1;
        } else {
            copy_file(entry.path(), &target)?;
            files += 1;
        }
    }

    Ok(files)
}

/// Copy bytes and permission bits, replacing whatever sits at `dest`
fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    prepare_destination(dest)?;
    fs::copy(src, dest).map_err(|e| Error::io("copy file", src, e))?;

    let perms = fs::metadata(src)
        .map_err(|e| Error::io("read permissions", src, e))?
        .permissions();
    fs::set_permissions(dest, perms).map_err(|e| Error::io("set permissions", dest, e))?;

    debug!(src = %src.display(), "copied file");
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let target = fs::read_link(src).map_err(|e| Error::io("read link", src, e))?;
    prepare_destination(dest)?;
    std::os::unix::fs::symlink(&target, dest).map_err(|e| Error::io("create link", dest, e))?;
    debug!(src = %src.display(), target = %target.display(), "recreated link");
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    copy_file(src, dest)
}

/// Create the parent of `dest` and clear any existing entry at `dest`
///
/// Existing files are unlinked rather than overwritten so read-only copies
/// do not block a refresh. A directory where a file now lives is removed.
fn prepare_destination(dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io("create directory", parent, e))?;
    }
    match fs::symlink_metadata(dest) {
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir_all(dest).map_err(|e| Error::io("replace directory", dest, e))
        }
        Ok(_) => fs::remove_file(dest).map_err(|e| Error::io("replace file", dest, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io("stat destination", dest, e)),
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => fs::remove_file(path).map_err(|e| Error::io("replace file", path, e))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io("stat destination", path, e)),
    }
    fs::create_dir_all(path).map_err(|e| Error::io("create directory", path, e))
}

fn walk_error(err: walkdir::Error, fallback: &Path) -> Error {
    let path = err.path().unwrap_or(fallback).to_path_buf();
    match err.into_io_error() {
        Some(source) => Error::io("walk source", &path, source),
        None => Error::Io {
            phase: "walk source",
            path,
            source: io::Error::new(io::ErrorKind::Other, "filesystem loop"),
        },
    }
}
