//! Show whether a path is tracked

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(path: &Path, profile: Option<&str>) -> Result<()> {
    let source = util::source_path(path)?;
    let (_, backup) = util::open_backup(profile)?;

    let Some(entry) = backup.entry(&source)? else {
        println!("{} is {}", source, "not tracked".yellow());
        return Ok(());
    };

    println!("{} is {}", source, "tracked".green());
    println!(
        "  {} {}",
        "kind:".dimmed(),
        if entry.is_file { "file" } else { "directory" }
    );
    if entry.is_file {
        println!("  {} {}", "revisions:".dimmed(), entry.revision_count);
    }
    if entry.is_sub {
        println!("  {} part of a tracked directory", "via:".dimmed());
    }
    println!(
        "  {} {}",
        "tag:".dimmed(),
        entry.tag.as_deref().unwrap_or("(untagged)")
    );
    println!(
        "  {} {}",
        "updated:".dimmed(),
        util::format_absolute_time(entry.updated_at)
    );
    Ok(())
}
