//! Diff a stored revision against the current source file

use crate::diff_utils;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(path: &Path, revision: Option<&str>, context: usize, profile: Option<&str>) -> Result<()> {
    let source = util::source_path(path)?;
    let (_, backup) = util::open_backup(profile)?;

    let input = backup
        .diff(&source, revision)
        .with_context(|| format!("Failed to diff {}", source))?;

    let short = input.revision.get(..8).unwrap_or(&input.revision);
    let old_label = format!("{}@{}", input.repo_path, short);
    let new_label = source.to_string();
    let rendered = diff_utils::render_unified_diff(
        &input.stored,
        &input.current,
        &old_label,
        &new_label,
        context,
    );

    if rendered.is_empty() {
        println!("{} {} matches {}", "✓".green(), source, short.yellow());
    } else {
        print!("{}", rendered);
    }
    Ok(())
}
