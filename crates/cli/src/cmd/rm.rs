//! Remove a file or directory from the store

use crate::util;
use anybakup::Action;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(path: &Path, profile: Option<&str>) -> Result<()> {
    let source = util::source_path(path)?;
    let (_, mut backup) = util::open_backup(profile)?;

    let report = backup
        .remove_file(&source)
        .with_context(|| format!("Failed to remove {}", source))?;

    if report.action == Action::NoChange {
        println!("{} {} was not in the store", "·".dimmed(), source);
    } else {
        println!(
            "{} {} {} ({} file{})",
            "✓".green(),
            source,
            util::format_action(report.action),
            report.removed.len(),
            if report.removed.len() == 1 { "" } else { "s" }
        );
        for path in &report.removed {
            println!("  {} {}", "-".red(), path);
        }
    }

    if let Some(error) = &report.ledger_error {
        println!("{} ledger not updated: {}", "!".yellow(), error);
    }
    Ok(())
}
