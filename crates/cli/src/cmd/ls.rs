//! List tracked entries

use crate::util;
use anybakup::TrackedEntry;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Serialize)]
struct EntryView<'a> {
    repo_path: String,
    source_path: &'a str,
    kind: &'static str,
    revisions: i64,
    sub_entry: bool,
    tag: Option<&'a str>,
    created_at: String,
    updated_at: String,
}

impl<'a> From<&'a TrackedEntry> for EntryView<'a> {
    fn from(entry: &'a TrackedEntry) -> Self {
        Self {
            repo_path: entry.repo_path.to_string(),
            source_path: &entry.source_path,
            kind: if entry.is_file { "file" } else { "directory" },
            revisions: entry.revision_count,
            sub_entry: entry.is_sub,
            tag: entry.tag.as_deref(),
            created_at: entry.created_at.to_rfc3339(),
            updated_at: entry.updated_at.to_rfc3339(),
        }
    }
}

pub fn run(tag: Option<&str>, json: bool, profile: Option<&str>) -> Result<()> {
    let (_, backup) = util::open_backup(profile)?;
    let entries = match tag {
        Some(tag) => backup.entries_by_tag(tag)?,
        None => backup.entries()?,
    };

    if json {
        let views: Vec<EntryView> = entries.iter().map(EntryView::from).collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No tracked entries".dimmed());
        return Ok(());
    }

    for entry in &entries {
        let kind = if entry.is_file { "F" } else { "D" };
        let revisions = if entry.is_file {
            format!("{:>3}", entry.revision_count)
        } else {
            "  -".to_string()
        };
        let tag = entry
            .tag
            .as_deref()
            .map(|t| format!(" [{}]", t.cyan()))
            .unwrap_or_default();
        println!(
            "{} {} {} {}{}",
            kind.bold(),
            revisions.yellow(),
            util::format_relative_time(entry.updated_at).dimmed(),
            entry.source_path,
            tag
        );
    }
    println!("\n{} entries", entries.len());
    Ok(())
}
