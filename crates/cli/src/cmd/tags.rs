//! List all tags in use

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub fn run(profile: Option<&str>) -> Result<()> {
    let (_, backup) = util::open_backup(profile)?;
    let tags = backup.tags()?;

    if tags.is_empty() {
        println!("{}", "No tags".dimmed());
    }
    for tag in tags {
        println!("{}", tag.cyan());
    }
    Ok(())
}
