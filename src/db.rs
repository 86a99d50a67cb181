use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::{OptionalExtension, params};
use thiserror::Error;

use crate::model::{Link, RedirectMethod};

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DbError {
    #[error("database unavailable: {0}")]
    Unavailable(String),
    #[error("no link for short code {0:?}")]
    NotFound(String),
    #[error("constraint violated: {0}")]
    Conflict(String),
    #[error("{0}")]
    Storage(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => DbError::Conflict(e.to_string()),
            _ => DbError::Storage(e.to_string()),
        }
    }
}

/// Durable mapping from short code to target and redirect method.
///
/// A row is unique by `short` and by `(target, redirect)`. All calls block
/// on the backing medium.
pub trait LinkStore: Send + Sync + 'static {
    /// Fails with `NotFound` when no row has this code.
    fn lookup(&self, short: &str) -> Result<Link, DbError>;

    /// Returns the code already holding `(target, redirect)` together with
    /// `true`, or inserts a row under `requested_short` and returns it with
    /// `false`. A taken `requested_short` surfaces as `Conflict`.
    fn insert_if_absent(
        &self,
        target: &str,
        requested_short: &str,
        redirect: RedirectMethod,
    ) -> Result<(String, bool), DbError>;

    /// Inserts or overwrites the row for `short` with no dedup check.
    fn insert_direct(&self, short: &str, target: &str, redirect: RedirectMethod) -> Result<(), DbError>;

    fn delete_by_short(&self, short: &str) -> Result<usize, DbError>;

    fn delete_by_target(&self, target: &str) -> Result<usize, DbError>;
}

/// SQLite backed link store. Clones share the same connection.
#[derive(Clone, Debug)]
pub struct Db {
    connection: Arc<Mutex<rusqlite::Connection>>,
}

fn create_link_table(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        r#"create table if not exists links(
    short    TEXT    PRIMARY KEY NOT NULL CHECK (short <> ''),
    target   TEXT    NOT NULL,
    redirect TEXT    NOT NULL DEFAULT 'http',
    created  TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (target, redirect)
)"#,
        (),
    )?;

    Ok(())
}

fn row_to_link(row: &rusqlite::Row<'_>) -> rusqlite::Result<Link> {
    // legacy rows may carry an empty or NULL method
    let redirect: Option<String> = row.get(2)?;
    Ok(Link {
        short: row.get(0)?,
        target: row.get(1)?,
        redirect: RedirectMethod::normalize(redirect.as_deref().unwrap_or_default()),
        created: row.get(3)?,
    })
}

impl Db {
    /// Wraps an open connection and makes sure the schema exists.
    pub fn new(connection: rusqlite::Connection) -> Result<Self, DbError> {
        let db = Self {
            connection: Arc::new(Mutex::new(connection)),
        };
        db.initialize()?;
        Ok(db)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let connection = rusqlite::Connection::open(path).map_err(|e| DbError::Unavailable(e.to_string()))?;
        Self::new(connection)
    }

    pub fn in_memory() -> Result<Self, DbError> {
        let connection = rusqlite::Connection::open_in_memory().map_err(|e| DbError::Unavailable(e.to_string()))?;
        Self::new(connection)
    }

    /// Creates the links table if it is missing. Safe to call repeatedly.
    pub fn initialize(&self) -> Result<(), DbError> {
        let conn = self.lock()?;
        create_link_table(&conn).map_err(|e| DbError::Unavailable(e.to_string()))
    }

    pub fn count(&self) -> Result<usize, DbError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn lock(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, DbError> {
        self.connection
            .lock()
            .map_err(|_| DbError::Storage("database connection lock poisoned".to_string()))
    }
}

impl LinkStore for Db {
    fn lookup(&self, short: &str) -> Result<Link, DbError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare_cached("SELECT short, target, redirect, created FROM links WHERE short = ?1")?;
        stmt.query_row([short], row_to_link)
            .optional()?
            .ok_or_else(|| DbError::NotFound(short.to_string()))
    }

    fn insert_if_absent(
        &self,
        target: &str,
        requested_short: &str,
        redirect: RedirectMethod,
    ) -> Result<(String, bool), DbError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                r#"SELECT short FROM links
    WHERE target = ?1
      AND (redirect = ?2 OR (?2 = 'http' AND redirect = ''))
    LIMIT 1"#,
                params![target, redirect.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(short) = existing {
            return Ok((short, true));
        }

        tx.execute(
            r#"INSERT INTO links (short, target, redirect, created) values (?1, ?2, ?3, ?4)"#,
            params![requested_short, target, redirect.as_str(), chrono::Utc::now()],
        )?;
        tx.commit()?;

        Ok((requested_short.to_string(), false))
    }

    fn insert_direct(&self, short: &str, target: &str, redirect: RedirectMethod) -> Result<(), DbError> {
        let conn = self.lock()?;

        conn.execute(
            r#"INSERT INTO links (short, target, redirect, created) values (?1, ?2, ?3, ?4)
    ON CONFLICT(short) DO UPDATE SET
        target = excluded.target,
        redirect = excluded.redirect,
        created = excluded.created"#,
            params![short, target, redirect.as_str(), chrono::Utc::now()],
        )?;

        Ok(())
    }

    fn delete_by_short(&self, short: &str) -> Result<usize, DbError> {
        let conn = self.lock()?;
        Ok(conn.execute(r#"DELETE FROM links WHERE short = ?1"#, [short])?)
    }

    fn delete_by_target(&self, target: &str) -> Result<usize, DbError> {
        let conn = self.lock()?;
        Ok(conn.execute(r#"DELETE FROM links WHERE target = ?1"#, [target])?)
    }
}
