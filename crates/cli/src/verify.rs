//! Ledger/history consistency check
//!
//! The commit and the ledger write are not one transaction, so a crash or a
//! ledger failure can leave them apart. `verify` finds the gaps and, with
//! `repair`, closes them from the history side.

use crate::facade::Backup;
use ab_core::{RepoPath, Result};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{info, warn};
use vcs::ObjectStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// File row whose path was never committed
    MissingHistory(RepoPath),
    /// Row whose path is absent from the head revision
    MissingFromStore(RepoPath),
    /// File row whose revision count disagrees with history
    RevisionDrift {
        path: RepoPath,
        recorded: i64,
        actual: i64,
    },
    /// File in the head revision with no ledger row
    Unrecorded(RepoPath),
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingHistory(path) => write!(f, "{path}: recorded but never committed"),
            Issue::MissingFromStore(path) => write!(f, "{path}: recorded but not in the store"),
            Issue::RevisionDrift {
                path,
                recorded,
                actual,
            } => write!(f, "{path}: ledger says {recorded} revisions, history has {actual}"),
            Issue::Unrecorded(path) => write!(f, "{path}: stored but missing from the ledger"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Ledger rows examined
    pub checked: usize,
    pub issues: Vec<Issue>,
    pub repaired: usize,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl Backup {
    /// Cross-check every ledger row against history; write nothing unless `repair`
    pub fn verify(&mut self, repair: bool) -> Result<VerifyReport> {
        let mut report = VerifyReport::default();
        let head = self.engine.store().head()?;
        let entries = self.ledger.list_all()?;

        let mut recorded = BTreeSet::new();
        for entry in entries {
            report.checked += 1;
            recorded.insert(entry.repo_path.clone());
            let path = entry.repo_path;

            let history = if entry.is_file {
                Some(self.engine.store().log(&path)?.len() as i64)
            } else {
                None
            };

            if history == Some(0) {
                report.issues.push(Issue::MissingHistory(path.clone()));
                if repair && self.ledger.remove(&path)? {
                    report.repaired += 1;
                }
                continue;
            }

            let present = match &head {
                Some(revision) => self.engine.store().exists_at(revision, &path)?,
                None => false,
            };
            if !present {
                report.issues.push(Issue::MissingFromStore(path.clone()));
                if repair && self.ledger.remove(&path)? {
                    report.repaired += 1;
                }
                continue;
            }

            if let Some(actual) = history.filter(|n| *n != entry.revision_count) {
                report.issues.push(Issue::RevisionDrift {
                    path: path.clone(),
                    recorded: entry.revision_count,
                    actual,
                });
                if repair {
                    self.ledger.set_revision_count(&path, actual)?;
                    report.repaired += 1;
                }
            }
        }

        if let Some(revision) = &head {
            for path in self.engine.store().files_at(revision)? {
                if recorded.contains(&path) {
                    continue;
                }
                report.issues.push(Issue::Unrecorded(path.clone()));
                if repair && self.record_orphan(&path)? {
                    report.repaired += 1;
                }
            }
        }

        info!(
            checked = report.checked,
            issues = report.issues.len(),
            repaired = report.repaired,
            "verify finished"
        );
        Ok(report)
    }

    /// Give a stored file without a row its own sub-entry
    fn record_orphan(&mut self, path: &RepoPath) -> Result<bool> {
        let source = match path.to_source_path() {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %path, error = %e, "cannot map stored file back to a source path");
                return Ok(false);
            }
        };
        let enclosing = self.ledger.find_enclosing_directory(&source)?;
        let revisions = self.engine.store().log(path)?.len() as i64;
        self.ledger
            .upsert(path, source.as_str(), true, enclosing.is_some(), revisions)?;
        self.inherit_tag(path, enclosing.as_ref())?;
        Ok(true)
    }
}
