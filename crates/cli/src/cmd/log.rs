//! Show the revisions of a path

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(path: &Path, profile: Option<&str>) -> Result<()> {
    let source = util::source_path(path)?;
    let repo_path = source.to_repo_path()?;
    let (_, backup) = util::open_backup(profile)?;

    let history = backup
        .list_history(&repo_path)
        .with_context(|| format!("No history for {}", source))?;

    println!("{} ({} revisions)\n", source.bold(), history.len());
    for record in &history {
        println!(
            "{} {} {} {}",
            record.short_revision().yellow(),
            util::format_absolute_time(record.timestamp),
            format!("({})", util::format_relative_time(record.timestamp)).dimmed(),
            record.message
        );
    }
    Ok(())
}
