//! SQLite persistence for the closure table.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers keep a consistent snapshot while a
//!   writer commits
//! - `busy_timeout` (default 5s) so a second writer waits for the first
//!   instead of failing immediately
//! - `foreign_keys = ON`

pub mod migrations;
pub mod schema;
pub mod store;

pub use store::SqliteClosureStore;

use anyhow::{Context, Result};
use rusqlite::Connection;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::{path::Path, time::Duration};

use crate::model::{EdgeId, VertexId};

/// Busy timeout used for closure DB connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the closure database, apply runtime pragmas, and migrate
/// the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_graph_db(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create graph db directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open graph database {}", path.display()))?;

    configure_connection(&conn, busy_timeout).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply graph migrations")?;

    Ok(conn)
}

/// Open a private in-memory closure database with the latest schema.
///
/// # Errors
///
/// Returns an error if migration fails.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory graph database")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply graph migrations")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

impl ToSql for VertexId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.get()))
    }
}

impl FromSql for VertexId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self::new)
    }
}

impl ToSql for EdgeId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.get()))
    }
}

impl FromSql for EdgeId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self::new)
    }
}
