//! Path model: source paths, store-relative repo paths and the store root
//!
//! Every tracked file lives in three coordinate systems:
//! - [`SourcePath`]: where it lives on this machine (`/home/u/notes.txt`, `D:\docs\a.txt`)
//! - [`RepoPath`]: where it lives inside the store, `/`-separated (`home/u/notes.txt`, `volD/docs/a.txt`)
//! - the absolute store path: [`StoreRoot`] joined with the repo path
//!
//! The source <-> repo mapping is invertible without external state: drive
//! letters are folded into a `vol<letter>` first segment.

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// File names at the store root that belong to the ledger
pub const RESERVED_ROOT_NAMES: &[&str] = &[
    "file_operations.db",
    "file_operations.db-journal",
    "file_operations.db-wal",
    "file_operations.db-shm",
];

const DRIVE_MARKER: &str = "vol";

/// Separator conventions of the machine the source path comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStyle {
    /// Single `/` root
    Unix,
    /// Drive letters (`C:\`), `\` or `/` separators
    Windows,
}

impl PathStyle {
    /// Style of the running platform
    pub const fn native() -> Self {
        if cfg!(windows) {
            PathStyle::Windows
        } else {
            PathStyle::Unix
        }
    }

    fn separator(self) -> char {
        match self {
            PathStyle::Unix => '/',
            PathStyle::Windows => '\\',
        }
    }

    fn is_separator(self, c: char) -> bool {
        match self {
            PathStyle::Unix => c == '/',
            PathStyle::Windows => c == '/' || c == '\\',
        }
    }
}

/// Absolute, lexically normalized path on the source filesystem
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourcePath {
    text: String,
    style: PathStyle,
}

impl SourcePath {
    /// Build a source path in the native style
    ///
    /// Fails with `InvalidPath` if the path is relative or not valid UTF-8.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = path
            .to_str()
            .ok_or_else(|| Error::invalid_path(path.display().to_string(), "not valid UTF-8"))?;
        Self::parse(text, PathStyle::native())
    }

    /// Parse and normalize `text` under an explicit style
    ///
    /// `.` segments and repeated separators are dropped, `..` pops the previous
    /// segment, trailing separators are removed and drive letters are upper-cased.
    pub fn parse(text: &str, style: PathStyle) -> Result<Self> {
        let (drive, rest) = split_root(text, style)?;
        let segments = normalize_segments(rest, style);
        Ok(Self::from_parts(drive, &segments, style))
    }

    fn from_parts(drive: Option<char>, segments: &[&str], style: PathStyle) -> Self {
        let sep = style.separator();
        let mut text = String::new();
        if let Some(letter) = drive {
            text.push(letter);
            text.push(':');
        }
        text.push(sep);
        text.push_str(&segments.join(&sep.to_string()));
        Self { text, style }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.text)
    }

    pub fn style(&self) -> PathStyle {
        self.style
    }

    /// Drive letter and path segments below the root
    fn parts(&self) -> (Option<char>, Vec<&str>) {
        let (drive, rest) = match self.style {
            PathStyle::Unix => (None, self.text.as_str()),
            PathStyle::Windows => (self.text.chars().next(), &self.text[2..]),
        };
        let segments = rest
            .split(|c| self.style.is_separator(c))
            .filter(|s| !s.is_empty())
            .collect();
        (drive, segments)
    }

    /// Map onto the store layout
    ///
    /// Fails only for paths whose segments collide with the store's own
    /// bookkeeping (`.git`, ledger files at the root).
    pub fn to_repo_path(&self) -> Result<RepoPath> {
        let (drive, segments) = self.parts();
        let mut encoded: Vec<String> = Vec::with_capacity(segments.len() + 1);
        if let Some(letter) = drive {
            encoded.push(format!("{DRIVE_MARKER}{letter}"));
        }
        encoded.extend(segments.iter().map(|s| s.to_string()));
        RepoPath::parse(&encoded.join("/")).map_err(|err| match err {
            Error::InvalidPath { reason, .. } => Error::invalid_path(self.text.clone(), reason),
            other => other,
        })
    }

    /// True if `self` is a strict filesystem ancestor of `other`
    pub fn is_ancestor_of(&self, other: &SourcePath) -> bool {
        if self.style != other.style {
            return false;
        }
        let (drive_a, segs_a) = self.parts();
        let (drive_b, segs_b) = other.parts();
        drive_a == drive_b && segs_a.len() < segs_b.len() && segs_b.starts_with(&segs_a)
    }

    /// True if `self` is `other` or one of its ancestors
    pub fn contains(&self, other: &SourcePath) -> bool {
        self == other || self.is_ancestor_of(other)
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Canonical store-relative path, always `/`-separated
///
/// The empty repo path is the store root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoPath(String);

impl RepoPath {
    /// Validate a `/`-separated store path
    ///
    /// Rejects leading `/`, empty, `.` and `..` segments, any `.git` segment and
    /// ledger file names at the root.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        if text.starts_with('/') {
            return Err(Error::invalid_path(text, "repo paths are relative to the store root"));
        }
        for (idx, segment) in text.split('/').enumerate() {
            match segment {
                "" => return Err(Error::invalid_path(text, "empty path segment")),
                "." | ".." => return Err(Error::invalid_path(text, "relative path segment")),
                s if s.eq_ignore_ascii_case(".git") => {
                    return Err(Error::invalid_path(text, "'.git' is reserved by the store"));
                }
                s if idx == 0 && RESERVED_ROOT_NAMES.iter().any(|r| s.eq_ignore_ascii_case(r)) => {
                    return Err(Error::invalid_path(text, "name is reserved by the ledger"));
                }
                _ => {}
            }
        }
        Ok(Self(text.to_string()))
    }

    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment, `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    pub fn parent(&self) -> Option<RepoPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Append a single segment
    pub fn join(&self, name: &str) -> Result<RepoPath> {
        if self.is_root() {
            Self::parse(name)
        } else {
            Self::parse(&format!("{}/{}", self.0, name))
        }
    }

    /// True if `other` is `self` or lives below it
    pub fn contains(&self, other: &RepoPath) -> bool {
        if self.is_root() {
            return true;
        }
        other.0 == self.0
            || (other.0.len() > self.0.len()
                && other.0.starts_with(&self.0)
                && other.0.as_bytes()[self.0.len()] == b'/')
    }

    /// True if `other` lives strictly below `self`
    pub fn is_ancestor_of(&self, other: &RepoPath) -> bool {
        self != other && self.contains(other)
    }

    /// Decode back to a source path in the native style
    pub fn to_source_path(&self) -> Result<SourcePath> {
        self.to_source_path_with(PathStyle::native())
    }

    /// Decode back to a source path under an explicit style
    ///
    /// Under the Windows style the first segment must be a drive marker
    /// (`vol` followed by one ASCII letter).
    pub fn to_source_path_with(&self, style: PathStyle) -> Result<SourcePath> {
        let segments: Vec<&str> = self.segments().collect();
        match style {
            PathStyle::Unix => Ok(SourcePath::from_parts(None, &segments, style)),
            PathStyle::Windows => {
                let (marker, rest) = segments
                    .split_first()
                    .ok_or_else(|| Error::invalid_path(self.0.clone(), "missing drive marker"))?;
                let letter = decode_drive_marker(marker)
                    .ok_or_else(|| Error::invalid_path(self.0.clone(), "malformed drive marker"))?;
                Ok(SourcePath::from_parts(Some(letter), rest, style))
            }
        }
    }

    /// Absolute location of this entry inside the store
    pub fn to_store_path(&self, root: &StoreRoot) -> PathBuf {
        to_absolute_store_path(self, root)
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Absolute path of the backing directory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreRoot(PathBuf);

impl StoreRoot {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_absolute() {
            return Err(Error::invalid_path(
                path.display().to_string(),
                "store root must be absolute",
            ));
        }
        Ok(Self(path.to_path_buf()))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Inverse of [`to_absolute_store_path`] for paths below the root
    pub fn repo_path_of(&self, abs: &Path) -> Result<RepoPath> {
        let rel = abs.strip_prefix(&self.0).map_err(|_| {
            Error::invalid_path(abs.display().to_string(), "not inside the store root")
        })?;
        let mut segments = Vec::new();
        for component in rel.components() {
            let segment = component.as_os_str().to_str().ok_or_else(|| {
                Error::invalid_path(abs.display().to_string(), "not valid UTF-8")
            })?;
            segments.push(segment);
        }
        RepoPath::parse(&segments.join("/"))
    }
}

impl fmt::Display for StoreRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Join a repo path onto the store root with native separators
pub fn to_absolute_store_path(repo: &RepoPath, root: &StoreRoot) -> PathBuf {
    let mut path = root.0.clone();
    for segment in repo.segments() {
        path.push(segment);
    }
    path
}

fn split_root(text: &str, style: PathStyle) -> Result<(Option<char>, &str)> {
    match style {
        PathStyle::Unix => match text.strip_prefix('/') {
            Some(rest) => Ok((None, rest)),
            None => Err(Error::invalid_path(text, "source path must be absolute")),
        },
        PathStyle::Windows => {
            let mut chars = text.chars();
            match (chars.next(), chars.next(), chars.next()) {
                (Some(letter), Some(':'), Some(sep))
                    if letter.is_ascii_alphabetic() && style.is_separator(sep) =>
                {
                    Ok((Some(letter.to_ascii_uppercase()), &text[3..]))
                }
                (Some(a), Some(b), _) if style.is_separator(a) && style.is_separator(b) => {
                    Err(Error::invalid_path(text, "UNC paths are not supported"))
                }
                _ => Err(Error::invalid_path(text, "source path must start with a drive letter")),
            }
        }
    }
}

fn normalize_segments(rest: &str, style: PathStyle) -> Vec<&str> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split(|c| style.is_separator(c)) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments
}

fn decode_drive_marker(segment: &str) -> Option<char> {
    let letter = segment.strip_prefix(DRIVE_MARKER)?;
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => Some(c),
        _ => None,
    }
}
