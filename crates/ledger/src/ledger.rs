//! Ledger operations over the `file_operations` table

use crate::entry::{TrackedEntry, Upsert};
use crate::schema;
use ab_core::{Error, RepoPath, Result, SourcePath, StoreRoot};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Ledger file name at the store root
pub const LEDGER_FILE: &str = "file_operations.db";

const COLUMNS: &str =
    "id, srcfile, destfile, isfile, revcount, sub, tag, add_time, update_time";

pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    /// Open (creating if needed) the ledger of the store at `root`
    pub fn open(root: &StoreRoot) -> Result<Self> {
        Self::open_at(&root.as_path().join(LEDGER_FILE))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(ledger_err("open"))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(ledger_err("open"))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(ledger_err("open"))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        schema::install(&conn).map_err(ledger_err("install schema"))?;
        Ok(Self { conn })
    }

    /// Insert a row for `path`, or refresh the existing one
    ///
    /// An existing row keeps its id, creation time and tag.
    pub fn upsert(
        &mut self,
        path: &RepoPath,
        source: &str,
        is_file: bool,
        is_sub: bool,
        revision_count: i64,
    ) -> Result<Upsert> {
        let now = timestamp(Utc::now());
        let tx = self.conn.transaction().map_err(ledger_err("upsert"))?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM file_operations WHERE destfile = ?1",
                params![path.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(ledger_err("upsert"))?;

        let outcome = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE file_operations
                     SET srcfile = ?1, isfile = ?2, sub = ?3, revcount = ?4, update_time = ?5
                     WHERE id = ?6",
                    params![source, is_file, is_sub, revision_count, now, id],
                )
                .map_err(ledger_err("upsert"))?;
                Upsert::Updated(id)
            }
            None => {
                tx.execute(
                    "INSERT INTO file_operations
                     (srcfile, destfile, isfile, revcount, sub, add_time, update_time)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                    params![source, path.as_str(), is_file, revision_count, is_sub, now],
                )
                .map_err(ledger_err("upsert"))?;
                Upsert::Inserted(tx.last_insert_rowid())
            }
        };

        tx.commit().map_err(ledger_err("upsert"))?;
        info!(path = %path, revisions = revision_count, ?outcome, "ledger upsert");
        Ok(outcome)
    }

    /// Delete the row for `path`; `false` if there was none
    pub fn remove(&self, path: &RepoPath) -> Result<bool> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM file_operations WHERE destfile = ?1",
                params![path.as_str()],
            )
            .map_err(ledger_err("remove"))?;
        debug!(path = %path, deleted, "ledger remove");
        Ok(deleted > 0)
    }

    /// Delete every row strictly below `path`
    pub fn remove_under(&self, path: &RepoPath) -> Result<usize> {
        let deleted = if path.is_root() {
            self.conn
                .execute("DELETE FROM file_operations WHERE destfile <> ''", [])
        } else {
            let prefix = format!("{}/", path.as_str());
            self.conn.execute(
                "DELETE FROM file_operations WHERE substr(destfile, 1, ?2) = ?1",
                params![prefix, prefix.chars().count() as i64],
            )
        }
        .map_err(ledger_err("remove nested"))?;
        debug!(path = %path, deleted, "ledger remove nested");
        Ok(deleted)
    }

    /// Tag the row for `path`; an empty tag leaves the row untouched
    pub fn set_tag(&self, path: &RepoPath, tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Ok(());
        }
        let updated = self
            .conn
            .execute(
                "UPDATE file_operations SET tag = ?1 WHERE destfile = ?2",
                params![tag, path.as_str()],
            )
            .map_err(ledger_err("set tag"))?;
        if updated == 0 {
            return Err(not_tracked(path));
        }
        Ok(())
    }

    /// Tag of the row for `path`; fails with `NotFound` if untracked
    pub fn get_tag(&self, path: &RepoPath) -> Result<Option<String>> {
        let tag: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT tag FROM file_operations WHERE destfile = ?1",
                params![path.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(ledger_err("get tag"))?;
        match tag {
            Some(tag) => Ok(tag.filter(|t| !t.is_empty())),
            None => Err(not_tracked(path)),
        }
    }

    /// Overwrite the recorded revision count
    pub fn set_revision_count(&self, path: &RepoPath, revision_count: i64) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE file_operations SET revcount = ?1 WHERE destfile = ?2",
                params![revision_count, path.as_str()],
            )
            .map_err(ledger_err("set revision count"))?;
        if updated == 0 {
            return Err(not_tracked(path));
        }
        Ok(())
    }

    pub fn get(&self, path: &RepoPath) -> Result<Option<TrackedEntry>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM file_operations WHERE destfile = ?1"),
                params![path.as_str()],
                RawEntry::from_row,
            )
            .optional()
            .map_err(ledger_err("get"))?;
        raw.map(RawEntry::into_entry).transpose()
    }

    /// Deepest tracked directory whose source path is a proper ancestor of `source`
    pub fn find_enclosing_directory(&self, source: &SourcePath) -> Result<Option<TrackedEntry>> {
        let directories = self.query(
            "find enclosing directory",
            &format!("SELECT {COLUMNS} FROM file_operations WHERE isfile = 0"),
            [],
        )?;

        let enclosing = directories
            .into_iter()
            .filter_map(|entry| {
                let dir = SourcePath::parse(&entry.source_path, source.style()).ok()?;
                dir.is_ancestor_of(source).then_some((dir, entry))
            })
            .max_by_key(|(dir, _)| dir.as_str().len())
            .map(|(_, entry)| entry);
        Ok(enclosing)
    }

    /// Every row, most recently updated first
    pub fn list_all(&self) -> Result<Vec<TrackedEntry>> {
        self.query(
            "list",
            &format!("SELECT {COLUMNS} FROM file_operations ORDER BY update_time DESC, id DESC"),
            [],
        )
    }

    pub fn list_by_tag(&self, tag: &str) -> Result<Vec<TrackedEntry>> {
        self.query(
            "list by tag",
            &format!(
                "SELECT {COLUMNS} FROM file_operations WHERE tag = ?1 \
                 ORDER BY update_time DESC, id DESC"
            ),
            params![tag],
        )
    }

    /// Distinct non-empty tags, sorted
    pub fn list_tags(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT DISTINCT tag FROM file_operations \
                 WHERE tag IS NOT NULL AND tag <> '' ORDER BY tag",
            )
            .map_err(ledger_err("list tags"))?;
        let tags = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(ledger_err("list tags"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(ledger_err("list tags"))?;
        Ok(tags)
    }

    fn query<P: rusqlite::Params>(
        &self,
        op: &'static str,
        sql: &str,
        params: P,
    ) -> Result<Vec<TrackedEntry>> {
        let mut stmt = self.conn.prepare(sql).map_err(ledger_err(op))?;
        let rows = stmt
            .query_map(params, RawEntry::from_row)
            .map_err(ledger_err(op))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(ledger_err(op))?;
        rows.into_iter().map(RawEntry::into_entry).collect()
    }
}

/// Row as stored, before path and time parsing
struct RawEntry {
    id: i64,
    srcfile: String,
    destfile: String,
    isfile: bool,
    revcount: i64,
    sub: bool,
    tag: Option<String>,
    add_time: String,
    update_time: String,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            srcfile: row.get(1)?,
            destfile: row.get(2)?,
            isfile: row.get(3)?,
            revcount: row.get(4)?,
            sub: row.get(5)?,
            tag: row.get(6)?,
            add_time: row.get(7)?,
            update_time: row.get(8)?,
        })
    }

    fn into_entry(self) -> Result<TrackedEntry> {
        let repo_path = RepoPath::parse(&self.destfile).map_err(|e| Error::Ledger {
            op: "read row",
            details: format!("row {} has an invalid destfile: {e}", self.id),
        })?;
        Ok(TrackedEntry {
            id: self.id,
            repo_path,
            source_path: self.srcfile,
            is_file: self.isfile,
            revision_count: self.revcount,
            is_sub: self.sub,
            tag: self.tag.filter(|t| !t.is_empty()),
            created_at: parse_timestamp(self.id, &self.add_time)?,
            updated_at: parse_timestamp(self.id, &self.update_time)?,
        })
    }
}

/// RFC 3339 with fixed millisecond precision, so text order is time order
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(id: i64, text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Ledger {
            op: "read row",
            details: format!("row {id} has an invalid timestamp '{text}': {e}"),
        })
}

fn not_tracked(path: &RepoPath) -> Error {
    Error::NotFound(format!("no ledger entry for '{path}'"))
}

fn ledger_err(op: &'static str) -> impl Fn(rusqlite::Error) -> Error {
    move |e| Error::Ledger {
        op,
        details: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_core::PathStyle;
    use tempfile::TempDir;

    fn path(s: &str) -> RepoPath {
        RepoPath::parse(s).unwrap()
    }

    fn source(s: &str) -> SourcePath {
        SourcePath::parse(s, PathStyle::Unix).unwrap()
    }

    fn ledger() -> Ledger {
        Ledger::open_in_memory().unwrap()
    }

    #[test]
    fn test_upsert_insert_then_update() {
        let mut ledger = ledger();
        let first = ledger.upsert(&path("tmp/a/1.txt"), "/tmp/a/1.txt", true, false, 1).unwrap();
        assert!(matches!(first, Upsert::Inserted(_)));

        ledger.set_tag(&path("tmp/a/1.txt"), "work").unwrap();
        let second = ledger.upsert(&path("tmp/a/1.txt"), "/tmp/a/1.txt", true, true, 2).unwrap();
        assert_eq!(second, Upsert::Updated(first.id()));

        let entry = ledger.get(&path("tmp/a/1.txt")).unwrap().unwrap();
        assert_eq!(entry.revision_count, 2);
        assert!(entry.is_sub);
        assert!(entry.is_file);
        assert_eq!(entry.tag.as_deref(), Some("work"));
        assert!(entry.updated_at >= entry.created_at);
        assert_eq!(ledger.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_reports_presence() {
        let mut ledger = ledger();
        ledger.upsert(&path("a.txt"), "/a.txt", true, false, 1).unwrap();
        assert!(ledger.remove(&path("a.txt")).unwrap());
        assert!(!ledger.remove(&path("a.txt")).unwrap());
        assert!(ledger.get(&path("a.txt")).unwrap().is_none());
    }

    #[test]
    fn test_remove_under_is_strict() {
        let mut ledger = ledger();
        for (p, is_file) in [("tmp/a", false), ("tmp/a/1.txt", true), ("tmp/a/b/2.txt", true), ("tmp/ab.txt", true)] {
            ledger.upsert(&path(p), &format!("/{p}"), is_file, false, 1).unwrap();
        }

        assert_eq!(ledger.remove_under(&path("tmp/a")).unwrap(), 2);
        let left: Vec<String> = ledger
            .list_all()
            .unwrap()
            .into_iter()
            .map(|e| e.repo_path.as_str().to_string())
            .collect();
        assert_eq!(left.len(), 2);
        assert!(left.contains(&"tmp/a".to_string()));
        assert!(left.contains(&"tmp/ab.txt".to_string()));
    }

    #[test]
    fn test_tags() {
        let mut ledger = ledger();
        ledger.upsert(&path("x"), "/x", true, false, 1).unwrap();
        ledger.upsert(&path("y"), "/y", true, false, 1).unwrap();
        ledger.upsert(&path("z"), "/z", true, false, 1).unwrap();

        assert_eq!(ledger.get_tag(&path("x")).unwrap(), None);
        ledger.set_tag(&path("x"), "photos").unwrap();
        ledger.set_tag(&path("y"), "docs").unwrap();
        ledger.set_tag(&path("z"), "photos").unwrap();
        ledger.set_tag(&path("z"), "").unwrap();

        assert_eq!(ledger.get_tag(&path("z")).unwrap().as_deref(), Some("photos"));
        assert_eq!(ledger.list_tags().unwrap(), vec!["docs", "photos"]);
        assert_eq!(ledger.list_by_tag("photos").unwrap().len(), 2);

        assert!(matches!(ledger.set_tag(&path("nope"), "t"), Err(Error::NotFound(_))));
        assert!(matches!(ledger.get_tag(&path("nope")), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_find_enclosing_directory_picks_deepest() {
        let mut ledger = ledger();
        ledger.upsert(&path("tmp"), "/tmp", false, false, 1).unwrap();
        ledger.upsert(&path("tmp/a"), "/tmp/a", false, true, 1).unwrap();
        ledger.upsert(&path("tmp/a/b.txt"), "/tmp/a/b.txt", true, true, 1).unwrap();
        ledger.upsert(&path("tmp/ab"), "/tmp/ab", false, false, 1).unwrap();

        let found = ledger.find_enclosing_directory(&source("/tmp/a/new.txt")).unwrap().unwrap();
        assert_eq!(found.repo_path, path("tmp/a"));

        let found = ledger.find_enclosing_directory(&source("/tmp/abc.txt")).unwrap().unwrap();
        assert_eq!(found.repo_path, path("tmp"));

        // a directory does not enclose itself
        let found = ledger.find_enclosing_directory(&source("/tmp")).unwrap();
        assert!(found.is_none());

        assert!(ledger.find_enclosing_directory(&source("/home/x")).unwrap().is_none());
    }

    #[test]
    fn test_list_all_orders_by_update() {
        let mut ledger = ledger();
        ledger.upsert(&path("first"), "/first", true, false, 1).unwrap();
        ledger.upsert(&path("second"), "/second", true, false, 1).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        ledger.upsert(&path("first"), "/first", true, false, 2).unwrap();

        let order: Vec<String> = ledger
            .list_all()
            .unwrap()
            .into_iter()
            .map(|e| e.repo_path.as_str().to_string())
            .collect();
        assert_eq!(order, vec!["first", "second"]);
    }

    #[test]
    fn test_revision_count_rewrite() {
        let mut ledger = ledger();
        ledger.upsert(&path("a"), "/a", true, false, 1).unwrap();
        ledger.set_revision_count(&path("a"), 4).unwrap();
        assert_eq!(ledger.get(&path("a")).unwrap().unwrap().revision_count, 4);
        assert!(ledger.set_revision_count(&path("b"), 1).is_err());
    }

    #[test]
    fn test_persists_at_store_root() {
        let dir = TempDir::new().unwrap();
        let root = StoreRoot::new(dir.path()).unwrap();
        {
            let mut ledger = Ledger::open(&root).unwrap();
            ledger.upsert(&path("kept.txt"), "/kept.txt", true, false, 3).unwrap();
        }
        assert!(dir.path().join(LEDGER_FILE).exists());

        let ledger = Ledger::open(&root).unwrap();
        assert_eq!(ledger.get(&path("kept.txt")).unwrap().unwrap().revision_count, 3);
    }
}
