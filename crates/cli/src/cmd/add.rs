//! Back up a file or directory

use crate::util;
use anybakup::Action;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(path: &Path, tag: Option<&str>, profile: Option<&str>) -> Result<()> {
    let source = util::source_path(path)?;
    let (_, mut backup) = util::open_backup(profile)?;

    let report = backup
        .add_file_tagged(&source, tag)
        .with_context(|| format!("Failed to back up {}", source))?;

    match report.action {
        Action::NoChange => {
            println!("{} {} {}", "·".dimmed(), source, util::format_action(report.action));
        }
        _ => {
            let revision = report.revision.as_deref().unwrap_or("");
            println!(
                "{} {} {} ({} file{}, {})",
                "✓".green(),
                source,
                util::format_action(report.action),
                report.affected.len(),
                if report.affected.len() == 1 { "" } else { "s" },
                revision.get(..8).unwrap_or(revision).yellow()
            );
        }
    }

    if let Some(error) = &report.ledger_error {
        println!("{} ledger not updated: {}", "!".yellow(), error);
        println!("  Run 'abk verify --repair' to reconcile it.");
    }

    if let Some(tag) = tag {
        println!("  {} {}", "tag:".dimmed(), tag.cyan());
    }

    Ok(())
}
