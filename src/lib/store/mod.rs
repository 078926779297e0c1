//! SQLite-backed store for transcripts, samples and their coverage stats.
//!
//! Each worker opens its own [`CoverageStore`] on the same database file.
//! Writers for different samples serialize on SQLite's write lock; the busy
//! timeout makes them queue instead of failing.
//!
//! Every stat set for a sample is written in a single transaction, so readers
//! see either the old set or the new one.

mod query;
mod schema;
mod writer;

use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::Result;
use crate::core::fs::make_parent_dirs;

pub use query::SampleSummary;

const BUSY_TIMEOUT: Duration = Duration::from_secs(60);

pub struct CoverageStore {
    connection: Connection,
    path: Option<PathBuf>,
}

impl CoverageStore {
    /// Open (or create) the database at `path`. Tables are created on
    /// demand.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        make_parent_dirs(path)?;
        let connection = Connection::open(path)?;
        let store = Self::configure(connection, Some(path.to_path_buf()))?;
        debug!("Opened store {}", path.display());
        Ok(store)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::configure(Connection::open_in_memory()?, None)
    }

    fn configure(connection: Connection, path: Option<PathBuf>) -> Result<Self> {
        connection.pragma_update(None, "foreign_keys", true)?;
        connection.busy_timeout(BUSY_TIMEOUT)?;
        if path.is_some() {
            let mode: String =
                connection.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            debug!("journal mode {}", mode);
        }
        let store = Self { connection, path };
        store.create_tables()?;
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        self.connection.execute_batch(schema::CREATE_TABLES)?;
        Ok(())
    }

    /// Create the tables, dropping everything first when `reset` is set.
    pub fn setup(&mut self, reset: bool) -> Result<()> {
        if reset {
            info!("Dropping all tables");
            self.connection.execute_batch(schema::DROP_TABLES)?;
        }
        self.create_tables()
    }

    /// Database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.connection
    }
}
