use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension};

use crate::error::SetupError;
use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "1.0.0";

/// Tables the loader writes to, in foreign-key dependency order.
pub const REQUIRED_TABLES: [&str; 6] = [
    "profiles",
    "topics",
    "comments",
    "attachments",
    "polls",
    "poll_answers",
];

pub fn open_connection(db_path: &Path, busy_timeout: Duration) -> Result<Connection, SetupError> {
    let connection = Connection::open(db_path).map_err(|source| SetupError::Open {
        path: db_path.to_path_buf(),
        source,
    })?;
    configure_connection(&connection, busy_timeout)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection, busy_timeout: Duration) -> Result<(), SetupError> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .map_err(|source| SetupError::Configure {
            setting: "journal_mode=WAL",
            source,
        })?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .map_err(|source| SetupError::Configure {
            setting: "synchronous=NORMAL",
            source,
        })?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .map_err(|source| SetupError::Configure {
            setting: "foreign_keys=ON",
            source,
        })?;
    connection
        .busy_timeout(busy_timeout)
        .map_err(|source| SetupError::Configure {
            setting: "busy_timeout",
            source,
        })?;
    Ok(())
}

pub fn migrate_schema(connection: &Connection) -> Result<(), SetupError> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS profiles (
              id INTEGER PRIMARY KEY,
              first_name TEXT NOT NULL,
              last_name TEXT NOT NULL,
              screen_name TEXT NOT NULL,
              photo TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS topics (
              id INTEGER PRIMARY KEY,
              title TEXT NOT NULL,
              is_closed INTEGER NOT NULL,
              is_fixed INTEGER NOT NULL,
              created_at INTEGER NOT NULL,
              updated_at INTEGER NOT NULL,
              created_by INTEGER NOT NULL,
              updated_by INTEGER NOT NULL,
              FOREIGN KEY(created_by) REFERENCES profiles(id) ON DELETE CASCADE,
              FOREIGN KEY(updated_by) REFERENCES profiles(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS comments (
              id INTEGER PRIMARY KEY,
              from_id INTEGER NOT NULL,
              date INTEGER NOT NULL,
              text TEXT NOT NULL,
              likes INTEGER NOT NULL,
              reply_to_uid INTEGER,
              reply_to_cid INTEGER,
              topic_id INTEGER NOT NULL,
              FOREIGN KEY(topic_id) REFERENCES topics(id) ON DELETE CASCADE,
              FOREIGN KEY(from_id) REFERENCES profiles(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS attachments (
              content TEXT NOT NULL,
              comment_id INTEGER NOT NULL,
              PRIMARY KEY (comment_id, content),
              FOREIGN KEY(comment_id) REFERENCES comments(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS polls (
              id INTEGER PRIMARY KEY,
              question TEXT NOT NULL,
              votes INTEGER NOT NULL,
              multiple INTEGER NOT NULL,
              end_date INTEGER NOT NULL,
              closed INTEGER NOT NULL,
              topic_id INTEGER NOT NULL,
              FOREIGN KEY(topic_id) REFERENCES topics(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS poll_answers (
              id INTEGER PRIMARY KEY,
              text TEXT NOT NULL,
              votes INTEGER NOT NULL,
              rate REAL NOT NULL,
              poll_id INTEGER NOT NULL,
              FOREIGN KEY(poll_id) REFERENCES polls(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_topics_created_by ON topics(created_by);
            CREATE INDEX IF NOT EXISTS idx_topics_updated_by ON topics(updated_by);
            CREATE INDEX IF NOT EXISTS idx_topics_updated_at ON topics(updated_at);
            CREATE INDEX IF NOT EXISTS idx_comments_topic ON comments(topic_id);
            CREATE INDEX IF NOT EXISTS idx_comments_from ON comments(from_id);
            CREATE INDEX IF NOT EXISTS idx_attachments_comment ON attachments(comment_id);
            CREATE INDEX IF NOT EXISTS idx_polls_topic ON polls(topic_id);
            CREATE INDEX IF NOT EXISTS idx_poll_answers_poll ON poll_answers(poll_id);
            ",
        )
        .map_err(SetupError::Schema)?;

    let now = now_utc_string();
    connection
        .execute(
            "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            [DB_SCHEMA_VERSION],
        )
        .map_err(SetupError::Schema)?;
    connection
        .execute(
            "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            [now],
        )
        .map_err(SetupError::Schema)?;

    Ok(())
}

pub fn check_schema(connection: &Connection) -> Result<(), SetupError> {
    let mut statement = connection
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
        .map_err(SetupError::Schema)?;
    let tables = statement
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(SetupError::Schema)?;

    for required in REQUIRED_TABLES {
        if !tables.iter().any(|table| table == required) {
            return Err(SetupError::MissingTable(required));
        }
    }

    Ok(())
}

pub fn schema_version(connection: &Connection) -> rusqlite::Result<Option<String>> {
    connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
}

pub fn count_rows(connection: &Connection, table: &str) -> rusqlite::Result<i64> {
    connection.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
}
