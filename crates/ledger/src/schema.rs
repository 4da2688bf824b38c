//! Table layout of the ledger database

use rusqlite::Connection;

pub const SCHEMA_VERSION: i64 = 1;

pub const TABLE: &str = "file_operations";

const CREATE: &str = r#"
CREATE TABLE IF NOT EXISTS file_operations (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    srcfile     TEXT NOT NULL,
    destfile    TEXT NOT NULL UNIQUE,
    isfile      BOOLEAN NOT NULL,
    revcount    INTEGER NOT NULL DEFAULT 0,
    sub         BOOLEAN NOT NULL DEFAULT 0,
    tag         TEXT,
    add_time    TEXT NOT NULL,
    update_time TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_file_operations_tag ON file_operations(tag);
CREATE INDEX IF NOT EXISTS idx_file_operations_update_time ON file_operations(update_time);
"#;

/// Create the table and indices if missing and stamp the schema version
pub fn install(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE)?;
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version == 0 {
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        install(&conn).unwrap();
        install(&conn).unwrap();

        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        let columns: Vec<String> = conn
            .prepare(&format!("PRAGMA table_info({TABLE})"))
            .unwrap()
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            columns,
            ["id", "srcfile", "destfile", "isfile", "revcount", "sub", "tag", "add_time", "update_time"]
        );
    }
}
