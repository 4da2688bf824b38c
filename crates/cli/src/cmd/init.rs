//! Create a backup store and register it as a profile

use crate::util;
use anybakup::system_config;
use anybakup::{Backup, StoreConfig, StoreRoot};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(dir: &Path, profile: Option<&str>) -> Result<()> {
    let dir = util::absolutize(dir)?;
    let mut config = system_config::load()?;
    let name = config.profile_name(profile).to_string();

    let root = StoreRoot::new(&dir).context("Invalid store directory")?;
    Backup::init(StoreConfig::new(root, config.author()))
        .with_context(|| format!("Failed to initialize store at {}", dir.display()))?;

    config.set_profile(&name, &dir);
    system_config::save(&config)?;

    println!("{} Initialized backup store at {}", "✓".green(), dir.display());
    println!("  {} {}", "profile:".dimmed(), name.cyan());
    println!();
    println!("Next steps:");
    println!("  - Run 'abk add <path>' to back up a file or directory");
    println!("  - Run 'abk ls' to list tracked entries");
    Ok(())
}
