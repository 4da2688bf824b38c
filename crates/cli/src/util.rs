//! Shared utilities for CLI commands

use anybakup::system_config::{self, SystemConfig};
use anybakup::{Action, Backup, SourcePath};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Make `path` absolute against the current directory and wrap it
pub fn source_path(path: &Path) -> Result<SourcePath> {
    let absolute = absolutize(path)?;
    SourcePath::new(&absolute).with_context(|| format!("Invalid source path: {}", path.display()))
}

pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.join(path))
}

/// Load the config file and open the store of the selected profile
pub fn open_backup(profile: Option<&str>) -> Result<(SystemConfig, Backup)> {
    let config = system_config::load()?;
    let store_config = config.store_config(profile)?;
    let root = store_config.root.clone();
    let backup = Backup::open(store_config)
        .with_context(|| format!("Failed to open backup store at {}", root))?;
    Ok((config, backup))
}

/// Colored label for a protocol outcome
pub fn format_action(action: Action) -> String {
    match action {
        Action::Add => "added".green().to_string(),
        Action::Remove => "removed".red().to_string(),
        Action::NoChange => "unchanged".dimmed().to_string(),
    }
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(at: DateTime<Utc>) -> String {
    let seconds = (Utc::now() - at).num_seconds();
    if seconds < 0 {
        return "in the future".to_string();
    }

    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format timestamp in local time ("2024-01-03 14:30:00")
pub fn format_absolute_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
