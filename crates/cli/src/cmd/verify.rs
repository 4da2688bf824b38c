//! Check the ledger against the store history

use crate::util;
use anyhow::{bail, Result};
use owo_colors::OwoColorize;

pub fn run(repair: bool, profile: Option<&str>) -> Result<()> {
    let (_, mut backup) = util::open_backup(profile)?;
    let report = backup.verify(repair)?;

    println!("Checked {} ledger entries", report.checked);
    if report.is_clean() {
        println!("{} Ledger and history agree", "✓".green());
        return Ok(());
    }

    for issue in &report.issues {
        println!("  {} {}", "!".yellow(), issue);
    }
    if repair {
        println!("{} Repaired {} of {} issues", "✓".green(), report.repaired, report.issues.len());
    } else {
        bail!(
            "{} issues found. Run 'abk verify --repair' to fix them.",
            report.issues.len()
        );
    }
    Ok(())
}
