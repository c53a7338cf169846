//! SQLite bootstrap for the reference repository adapters.
//!
//! # Responsibility
//! - Open connections for `SqlitePathIndex` and `SqliteCommitSink` with the
//!   ingest schema applied.
//!
//! # Invariants
//! - `PRAGMA user_version` equals the last applied migration.
//! - A failed migration leaves the previous version in place.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Connection setup or a schema query failed.
    Sqlite(rusqlite::Error),
    /// One migration script was rejected; nothing from the batch was kept.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// The file carries ingest tables from a newer build.
    SchemaTooNew { found: u32, supported: u32 },
}

impl DbError {
    /// Schema version involved in the error, when there is one.
    pub fn schema_version(&self) -> Option<u32> {
        match self {
            Self::Sqlite(_) => None,
            Self::Migration { version, .. } => Some(*version),
            Self::SchemaTooNew { found, .. } => Some(*found),
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "ingest store unavailable: {err}"),
            Self::Migration { version, source } => {
                write!(f, "ingest schema migration {version} failed: {source}")
            }
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "ingest store is at schema {found}; this build reads up to {supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
