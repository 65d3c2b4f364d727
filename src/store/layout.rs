use rusqlite::{Connection, OptionalExtension};

use crate::errors::GraphLifeError;

pub const LAYOUT_VERSION: i64 = 1;

/// Every table owned by the store, in drop order.
pub(crate) const STORE_TABLES: &[&str] = &[
    "graph_edge_properties",
    "graph_edges",
    "graph_vertex_properties",
    "graph_vertices",
    "schema_indexes",
    "schema_edge_labels",
    "schema_vertex_labels",
    "schema_property_keys",
    "graph_meta",
];

pub fn ensure_layout(conn: &Connection) -> Result<(), GraphLifeError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS graph_vertices (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS graph_vertex_properties (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            vertex_id  INTEGER NOT NULL,
            key        TEXT NOT NULL,
            value_type TEXT NOT NULL,
            value
        );
        CREATE TABLE IF NOT EXISTS graph_edges (
            id      INTEGER PRIMARY KEY AUTOINCREMENT,
            from_id INTEGER NOT NULL,
            to_id   INTEGER NOT NULL,
            label   TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS graph_edge_properties (
            edge_id    INTEGER NOT NULL,
            key        TEXT NOT NULL,
            value_type TEXT NOT NULL,
            value,
            PRIMARY KEY (edge_id, key)
        );
        CREATE TABLE IF NOT EXISTS schema_property_keys (
            name        TEXT PRIMARY KEY,
            data_type   TEXT NOT NULL,
            cardinality TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS schema_vertex_labels (
            name TEXT PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS schema_edge_labels (
            name         TEXT PRIMARY KEY,
            multiplicity TEXT NOT NULL,
            signature    TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS schema_indexes (
            name    TEXT PRIMARY KEY,
            element TEXT NOT NULL,
            keys    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_vertices_label ON graph_vertices(label, id);
        CREATE INDEX IF NOT EXISTS idx_vprops_vertex_key ON graph_vertex_properties(vertex_id, key);
        CREATE INDEX IF NOT EXISTS idx_edges_from_label ON graph_edges(from_id, label);
        CREATE INDEX IF NOT EXISTS idx_edges_to_label ON graph_edges(to_id, label);
        CREATE TABLE IF NOT EXISTS graph_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            layout_version INTEGER NOT NULL
        );
        "#,
    )
    .map_err(|e| GraphLifeError::connection(e.to_string()))?;
    ensure_meta(conn)
}

pub fn read_layout_version(conn: &Connection) -> Result<i64, GraphLifeError> {
    conn.query_row(
        "SELECT layout_version FROM graph_meta WHERE id=1",
        [],
        |row| row.get(0),
    )
    .map_err(|e| GraphLifeError::connection(e.to_string()))
}

fn ensure_meta(conn: &Connection) -> Result<(), GraphLifeError> {
    let version: Option<i64> = conn
        .query_row(
            "SELECT layout_version FROM graph_meta WHERE id=1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| GraphLifeError::connection(e.to_string()))?;
    match version {
        Some(existing) if existing > LAYOUT_VERSION => Err(GraphLifeError::connection(format!(
            "store layout version {existing} is newer than supported {LAYOUT_VERSION}"
        ))),
        Some(_) => Ok(()),
        None => {
            conn.execute(
                "INSERT INTO graph_meta(id, layout_version) VALUES(1, ?1)",
                [LAYOUT_VERSION],
            )
            .map_err(|e| GraphLifeError::connection(e.to_string()))?;
            Ok(())
        }
    }
}

/// Name of the partial SQLite index backing one key of a composite index.
pub(crate) fn composite_index_name(index: &str, position: usize) -> String {
    format!("cidx_{index}_{position}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_creates_tables_and_version() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_layout(&conn).unwrap();
        for table in STORE_TABLES {
            let exists = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")
                .unwrap()
                .exists([table])
                .unwrap();
            assert!(exists, "missing table {table}");
        }
        assert_eq!(read_layout_version(&conn).unwrap(), LAYOUT_VERSION);
    }

    #[test]
    fn layout_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_layout(&conn).unwrap();
        ensure_layout(&conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM graph_meta", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn future_layout_version_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE graph_meta(id INTEGER PRIMARY KEY, layout_version INTEGER NOT NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO graph_meta(id, layout_version) VALUES(1, ?1)",
            [LAYOUT_VERSION + 3],
        )
        .unwrap();
        let err = ensure_layout(&conn).expect_err("expected version error");
        assert!(err.is_connection());
        assert!(err.to_string().contains("newer than supported"));
    }
}
