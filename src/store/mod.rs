//! Embedded SQLite property-graph store.
//!
//! The store exposes three surfaces: a schema catalog (reached through
//! [`Management`]), element and traversal primitives on [`GraphStore`], and
//! transaction control. Like the graph engines it stands in for, the first
//! access after a commit or rollback implicitly begins a new transaction,
//! so every caller has to end it explicitly (see [`ReadScope`] and
//! [`TransactionGuard`]).

mod catalog;
mod elements;
pub mod layout;
mod management;
pub mod metrics;
mod transaction;
mod traversal;
pub mod types;

use std::{cell::Cell, collections::BTreeMap};

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::{config::StoreConfig, errors::GraphLifeError};

pub use management::Management;
pub use metrics::{TxMetrics, TxMetricsSnapshot};
pub use transaction::{ReadScope, TransactionGuard};

use layout::{STORE_TABLES, ensure_layout, read_layout_version};
use metrics::InstrumentedConnection;

/// Capabilities a store advertises to the components driving it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreFeatures {
    /// Graph writes are buffered in transactions that need an explicit end.
    pub transactions: bool,
    /// Geo points are stored natively rather than as plain float pairs.
    pub geoshape: bool,
    /// Undeclared labels and keys are accepted without catalog entries.
    pub auto_schema: bool,
}

impl Default for StoreFeatures {
    fn default() -> Self {
        Self {
            transactions: true,
            geoshape: true,
            auto_schema: true,
        }
    }
}

pub struct GraphStore {
    conn: Connection,
    features: StoreFeatures,
    metrics: TxMetrics,
    location: String,
    /// Set while the open transaction holds writes or belongs to a guard.
    write_open: Cell<bool>,
}

fn is_in_memory_connection(conn: &Connection) -> bool {
    match conn.pragma_query_value(None, "database_list", |row| {
        let name: String = row.get(2)?;
        Ok(name)
    }) {
        Ok(name) => name.is_empty() || name == ":memory:",
        Err(_) => true,
    }
}

impl GraphStore {
    pub fn open(config: &StoreConfig) -> Result<Self, GraphLifeError> {
        config.validate()?;
        let (conn, location) = match config.file_path() {
            None => (
                Connection::open_in_memory()
                    .map_err(|e| GraphLifeError::connection(e.to_string()))?,
                String::from(":memory:"),
            ),
            Some(path) => {
                if !config.create_if_missing && !path.exists() {
                    return Err(GraphLifeError::connection(format!(
                        "store {} does not exist",
                        path.display()
                    )));
                }
                let conn = Connection::open(path).map_err(|e| {
                    GraphLifeError::connection(format!("{}: {e}", path.display()))
                })?;
                (conn, path.display().to_string())
            }
        };
        ensure_layout(&conn)?;
        let store = Self::from_connection(conn, config.features(), location);
        store.apply_pragmas(&config.pragmas)?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, GraphLifeError> {
        Self::open(&StoreConfig::in_memory())
    }

    fn from_connection(conn: Connection, features: StoreFeatures, location: String) -> Self {
        conn.set_prepared_statement_cache_capacity(64);

        if !is_in_memory_connection(&conn) {
            if conn.pragma_update(None, "journal_mode", "WAL").is_err() {
                // network filesystems may refuse WAL
                let _ = conn.pragma_update(None, "journal_mode", "DELETE");
            }
            let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        }

        Self {
            conn,
            features,
            metrics: TxMetrics::default(),
            location,
            write_open: Cell::new(false),
        }
    }

    fn apply_pragmas(&self, pragmas: &BTreeMap<String, String>) -> Result<(), GraphLifeError> {
        for (key, value) in pragmas {
            let sql = format!("PRAGMA {key} = {value}");
            match self.conn.execute(&sql, []) {
                Ok(_) | Err(rusqlite::Error::ExecuteReturnedResults) => {
                    debug!(pragma = %key, value = %value, "applied store pragma");
                }
                Err(e) => {
                    return Err(GraphLifeError::connection(format!(
                        "PRAGMA {key} = {value}: {e}"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn features(&self) -> StoreFeatures {
        self.features
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn layout_version(&self) -> Result<i64, GraphLifeError> {
        read_layout_version(&self.conn)
    }

    pub fn metrics_snapshot(&self) -> TxMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    pub(crate) fn connection(&self) -> InstrumentedConnection<'_> {
        InstrumentedConnection::new(&self.conn, &self.metrics)
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// True while a write transaction (guard, management handle or
    /// uncommitted write) is open on this connection.
    pub fn has_open_write(&self) -> bool {
        self.write_open.get() && self.in_transaction()
    }

    pub(crate) fn mark_written(&self) {
        if self.in_transaction() {
            self.write_open.set(true);
        }
    }

    /// Starts the transaction owned by a `TransactionGuard`. Refuses to join
    /// an open write; a read transaction left open by a traversal is ended
    /// first.
    pub(crate) fn begin_write(&self) -> Result<(), GraphLifeError> {
        if !self.features.transactions {
            return Ok(());
        }
        if self.has_open_write() {
            return Err(GraphLifeError::transaction(
                "cannot begin: a write transaction is already open on this session",
            ));
        }
        if self.in_transaction() {
            debug!("ending read transaction left open before write");
            self.rollback()?;
        }
        self.ensure_transaction()?;
        self.write_open.set(true);
        Ok(())
    }

    /// Begins the implicit transaction if none is open.
    pub(crate) fn ensure_transaction(&self) -> Result<(), GraphLifeError> {
        if !self.features.transactions || self.in_transaction() {
            return Ok(());
        }
        self.write_open.set(false);
        self.connection()
            .execute("BEGIN DEFERRED", [])
            .map_err(|e| GraphLifeError::transaction(e.to_string()))?;
        debug!("implicit transaction opened");
        Ok(())
    }

    /// Commits the open transaction; a no-op when none is open.
    pub fn commit(&self) -> Result<(), GraphLifeError> {
        self.write_open.set(false);
        if !self.features.transactions || !self.in_transaction() {
            return Ok(());
        }
        self.connection()
            .execute("COMMIT", [])
            .map_err(|e| GraphLifeError::transaction(e.to_string()))?;
        debug!("transaction committed");
        Ok(())
    }

    /// Rolls back the open transaction; a no-op when none is open.
    pub fn rollback(&self) -> Result<(), GraphLifeError> {
        self.write_open.set(false);
        if !self.features.transactions || !self.in_transaction() {
            return Ok(());
        }
        self.connection()
            .execute("ROLLBACK", [])
            .map_err(|e| GraphLifeError::transaction(e.to_string()))?;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Management transactions are always explicit, whatever the graph
    /// transaction capability says.
    pub(crate) fn begin_management(&self) -> Result<(), GraphLifeError> {
        if self.in_transaction() {
            return Err(GraphLifeError::transaction(
                "cannot open management: a transaction is already open on this session",
            ));
        }
        self.connection()
            .execute("BEGIN IMMEDIATE", [])
            .map_err(|e| GraphLifeError::transaction(e.to_string()))?;
        self.write_open.set(true);
        Ok(())
    }

    pub(crate) fn end_management(&self, commit: bool) -> Result<(), GraphLifeError> {
        self.write_open.set(false);
        if !self.in_transaction() {
            return Ok(());
        }
        let sql = if commit { "COMMIT" } else { "ROLLBACK" };
        self.connection()
            .execute(sql, [])
            .map_err(|e| GraphLifeError::transaction(e.to_string()))?;
        Ok(())
    }

    /// Ends any open transaction, then closes the connection.
    pub fn close(self) -> Result<(), GraphLifeError> {
        if self.in_transaction() {
            warn!("rolling back transaction left open at close");
            let _ = self.connection().execute("ROLLBACK", []);
        }
        self.conn
            .close()
            .map_err(|(_, e)| GraphLifeError::connection(e.to_string()))
    }

    /// Drops every data and catalog table and recreates an empty layout.
    pub(crate) fn clear(&self) -> Result<(), GraphLifeError> {
        self.write_open.set(false);
        let conn = self.connection();
        if self.in_transaction() {
            conn.execute("ROLLBACK", [])
                .map_err(|e| GraphLifeError::transaction(e.to_string()))?;
        }
        conn.execute("BEGIN IMMEDIATE", [])
            .map_err(|e| GraphLifeError::connection(e.to_string()))?;
        // composite indexes go with their tables
        for table in STORE_TABLES {
            if let Err(e) = conn.execute(&format!("DROP TABLE IF EXISTS {table}"), []) {
                let _ = conn.execute("ROLLBACK", []);
                return Err(GraphLifeError::connection(e.to_string()));
            }
        }
        conn.execute("COMMIT", [])
            .map_err(|e| GraphLifeError::connection(e.to_string()))?;
        ensure_layout(&self.conn)
    }

    pub(crate) fn collect_ids<P>(&self, sql: &str, params: P) -> Result<Vec<i64>, GraphLifeError>
    where
        P: rusqlite::Params,
    {
        let conn = self.connection();
        let mut stmt = conn
            .prepare_cached(sql)
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params, |row| row.get(0))
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(id.map_err(|e| GraphLifeError::query(e.to_string()))?);
        }
        Ok(ids)
    }

    pub(crate) fn count<P>(&self, sql: &str, params: P) -> Result<i64, GraphLifeError>
    where
        P: rusqlite::Params,
    {
        self.connection()
            .query_row(sql, params, |row| row.get(0))
            .optional()
            .map(|opt| opt.unwrap_or(0))
            .map_err(|e| GraphLifeError::query(e.to_string()))
    }
}
