//! Set or show the tag of a tracked path

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(path: &Path, tag: Option<&str>, profile: Option<&str>) -> Result<()> {
    let source = util::source_path(path)?;
    let (_, backup) = util::open_backup(profile)?;

    match tag {
        Some(tag) => {
            backup
                .set_tag(&source, tag)
                .with_context(|| format!("Failed to tag {}", source))?;
            println!("{} {} {}", "✓".green(), source, tag.cyan());
        }
        None => {
            let current = backup
                .get_tag(&source)
                .with_context(|| format!("{} is not tracked", source))?;
            match current {
                Some(tag) => println!("{}", tag),
                None => println!("{}", "(untagged)".dimmed()),
            }
        }
    }
    Ok(())
}
