//! Database layer for the construction tracker.
//!
//! Every multi-step mutation runs inside [`Database::with_tx`]: the record
//! write and the stats cascade it triggers commit together or not at all.

pub mod categories;
pub mod projects;
pub mod propagate;
pub mod stats;
pub mod tasks;
pub mod teams;
pub mod villas;

use anyhow::{Result, anyhow};
use rusqlite::{Connection, Params, Row, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub use propagate::{Cascade, StatsPropagator};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Database handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    propagator: Arc<dyn StatsPropagator>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent access
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            propagator: Arc::new(Cascade::default()),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Replace the stats propagator used by mutations.
    pub fn with_propagator(mut self, propagator: Arc<dyn StatsPropagator>) -> Self {
        self.propagator = propagator;
        self
    }

    /// The propagator mutations report changes to.
    pub fn propagator(&self) -> &dyn StatsPropagator {
        self.propagator.as_ref()
    }

    /// Run database migrations.
    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.lock()?;
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Execute a function inside a transaction.
    ///
    /// Commits when `f` returns `Ok`; on `Err` the transaction is dropped and
    /// every write made through it is rolled back.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Run a query and collect every row through `parse`.
pub(crate) fn query_all<T, P>(
    conn: &Connection,
    sql: &str,
    params: P,
    parse: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>>
where
    P: Params,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, parse)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
