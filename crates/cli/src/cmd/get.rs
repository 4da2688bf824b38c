//! Restore a path from a revision

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(path: &Path, revision: &str, out: Option<&Path>, profile: Option<&str>) -> Result<()> {
    let source = util::source_path(path)?;
    let repo_path = source.to_repo_path()?;
    let (_, backup) = util::open_backup(profile)?;

    let destination = match out {
        Some(out) => util::absolutize(out)?,
        None => source.as_path().to_path_buf(),
    };

    backup
        .get_file_at_revision(&repo_path, revision, &destination)
        .with_context(|| format!("Failed to restore {} at {}", source, revision))?;

    let size = std::fs::metadata(&destination).map(|m| m.len()).unwrap_or(0);
    println!(
        "{} Restored {} @ {} to {} ({})",
        "✓".green(),
        repo_path,
        revision.yellow(),
        destination.display(),
        util::format_size(size)
    );
    Ok(())
}
