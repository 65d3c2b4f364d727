use std::sync::atomic::{AtomicU64, Ordering};

pub use instrumented::InstrumentedConnection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxMetricsSnapshot {
    pub statement_count: u64,
    pub tx_begin_count: u64,
    pub tx_commit_count: u64,
    pub tx_rollback_count: u64,
}

/// Statement and transaction counters for one store connection.
#[derive(Default)]
pub struct TxMetrics {
    statements: AtomicU64,
    tx_begin: AtomicU64,
    tx_commit: AtomicU64,
    tx_rollback: AtomicU64,
}

impl TxMetrics {
    pub fn snapshot(&self) -> TxMetricsSnapshot {
        TxMetricsSnapshot {
            statement_count: self.statements.load(Ordering::Relaxed),
            tx_begin_count: self.tx_begin.load(Ordering::Relaxed),
            tx_commit_count: self.tx_commit.load(Ordering::Relaxed),
            tx_rollback_count: self.tx_rollback.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.statements.store(0, Ordering::Relaxed);
        self.tx_begin.store(0, Ordering::Relaxed);
        self.tx_commit.store(0, Ordering::Relaxed);
        self.tx_rollback.store(0, Ordering::Relaxed);
    }

    pub fn record_statement(&self, sql: &str) {
        self.statements.fetch_add(1, Ordering::Relaxed);
        let Some(keyword) = leading_keyword(sql) else {
            return;
        };
        if keyword.eq_ignore_ascii_case("BEGIN") {
            self.tx_begin.fetch_add(1, Ordering::Relaxed);
        } else if keyword.eq_ignore_ascii_case("COMMIT") {
            self.tx_commit.fetch_add(1, Ordering::Relaxed);
        } else if keyword.eq_ignore_ascii_case("ROLLBACK") {
            self.tx_rollback.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn leading_keyword(sql: &str) -> Option<&str> {
    let trimmed = sql.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    let end = trimmed
        .find(|c: char| c.is_ascii_whitespace() || c == ';')
        .unwrap_or(trimmed.len());
    Some(&trimmed[..end])
}

mod instrumented {
    use rusqlite::{CachedStatement, Connection};

    use super::TxMetrics;

    #[derive(Copy, Clone)]
    pub struct InstrumentedConnection<'a> {
        conn: &'a Connection,
        metrics: &'a TxMetrics,
    }

    impl<'a> InstrumentedConnection<'a> {
        pub fn new(conn: &'a Connection, metrics: &'a TxMetrics) -> Self {
            Self { conn, metrics }
        }

        pub fn execute<P>(&self, sql: &str, params: P) -> Result<usize, rusqlite::Error>
        where
            P: rusqlite::Params,
        {
            self.metrics.record_statement(sql);
            self.conn.execute(sql, params)
        }

        pub fn execute_batch(&self, sql: &str) -> Result<(), rusqlite::Error> {
            self.metrics.record_statement(sql);
            self.conn.execute_batch(sql)
        }

        pub fn prepare_cached<'b>(
            &'b self,
            sql: &str,
        ) -> Result<InstrumentedCachedStatement<'b>, rusqlite::Error> {
            Ok(InstrumentedCachedStatement {
                stmt: self.conn.prepare_cached(sql)?,
                metrics: self.metrics,
                sql: sql.to_string(),
            })
        }

        pub fn query_row<P, F, R>(&self, sql: &str, params: P, f: F) -> Result<R, rusqlite::Error>
        where
            P: rusqlite::Params,
            F: FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<R>,
        {
            self.metrics.record_statement(sql);
            self.conn.query_row(sql, params, f)
        }

        pub fn last_insert_rowid(&self) -> i64 {
            self.conn.last_insert_rowid()
        }
    }

    pub struct InstrumentedCachedStatement<'conn> {
        stmt: CachedStatement<'conn>,
        metrics: &'conn TxMetrics,
        sql: String,
    }

    impl<'conn> InstrumentedCachedStatement<'conn> {
        pub fn query_map<P, F, T>(
            &mut self,
            params: P,
            f: F,
        ) -> Result<rusqlite::MappedRows<'_, F>, rusqlite::Error>
        where
            P: rusqlite::Params,
            F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
        {
            self.metrics.record_statement(self.sql.as_str());
            self.stmt.query_map(params, f)
        }

        pub fn exists<P>(&mut self, params: P) -> Result<bool, rusqlite::Error>
        where
            P: rusqlite::Params,
        {
            self.metrics.record_statement(self.sql.as_str());
            self.stmt.exists(params)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_keywords_are_counted() {
        let metrics = TxMetrics::default();
        metrics.record_statement("BEGIN IMMEDIATE");
        metrics.record_statement("  commit");
        metrics.record_statement("ROLLBACK;");
        metrics.record_statement("SELECT 1");
        let snap = metrics.snapshot();
        assert_eq!(snap.statement_count, 4);
        assert_eq!(snap.tx_begin_count, 1);
        assert_eq!(snap.tx_commit_count, 1);
        assert_eq!(snap.tx_rollback_count, 1);
        metrics.reset();
        assert_eq!(metrics.snapshot(), TxMetricsSnapshot::default());
    }
}
