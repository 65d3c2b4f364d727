//! Vertex, edge and property writes plus single-element reads.

use std::collections::BTreeMap;

use rusqlite::{OptionalExtension, params, types::Value as SqlValue};

use crate::errors::GraphLifeError;

use super::{
    GraphStore,
    types::{Cardinality, Edge, Multiplicity, PropertyValue, Vertex},
};

impl GraphStore {
    pub fn add_vertex(
        &self,
        label: &str,
        properties: &[(&str, PropertyValue)],
    ) -> Result<i64, GraphLifeError> {
        if label.trim().is_empty() {
            return Err(GraphLifeError::invalid_input("vertex label must be set"));
        }
        self.ensure_transaction()?;
        self.mark_written();
        if !self.features.auto_schema && !self.has_vertex_label(label)? {
            return Err(GraphLifeError::write(format!(
                "vertex label '{label}' is not declared"
            )));
        }
        self.connection()
            .execute("INSERT INTO graph_vertices(label) VALUES(?1)", params![label])
            .map_err(|e| GraphLifeError::write(e.to_string()))?;
        let id = self.connection().last_insert_rowid();
        for (key, value) in properties {
            self.write_vertex_property(id, key, value)?;
        }
        Ok(id)
    }

    pub fn add_edge(
        &self,
        from_id: i64,
        to_id: i64,
        label: &str,
        properties: &[(&str, PropertyValue)],
    ) -> Result<i64, GraphLifeError> {
        if label.trim().is_empty() {
            return Err(GraphLifeError::invalid_input("edge label must be set"));
        }
        self.ensure_transaction()?;
        self.mark_written();
        if !self.vertex_exists(from_id)? || !self.vertex_exists(to_id)? {
            return Err(GraphLifeError::invalid_input(
                "edge endpoints must reference existing vertices",
            ));
        }
        match self.edge_label(label)? {
            Some(declared) => {
                self.check_multiplicity(from_id, to_id, label, declared.multiplicity)?
            }
            None if !self.features.auto_schema => {
                return Err(GraphLifeError::write(format!(
                    "edge label '{label}' is not declared"
                )));
            }
            None => {}
        }
        self.connection()
            .execute(
                "INSERT INTO graph_edges(from_id, to_id, label) VALUES(?1, ?2, ?3)",
                params![from_id, to_id, label],
            )
            .map_err(|e| GraphLifeError::write(e.to_string()))?;
        let id = self.connection().last_insert_rowid();
        for (key, value) in properties {
            self.check_declared_type(key, value)?;
            let (value_type, column) = value.to_sql()?;
            self.connection()
                .execute(
                    "INSERT OR REPLACE INTO graph_edge_properties(edge_id, key, value_type, value) \
                     VALUES(?1, ?2, ?3, ?4)",
                    params![id, key, value_type, column],
                )
                .map_err(|e| GraphLifeError::write(e.to_string()))?;
        }
        Ok(id)
    }

    /// Assigns `value` under `key` honoring the key's cardinality.
    pub fn set_property(
        &self,
        vertex_id: i64,
        key: &str,
        value: &PropertyValue,
    ) -> Result<(), GraphLifeError> {
        self.ensure_transaction()?;
        self.mark_written();
        if !self.vertex_exists(vertex_id)? {
            return Err(GraphLifeError::not_found(format!("vertex {vertex_id}")));
        }
        self.write_vertex_property(vertex_id, key, value)
    }

    /// Removes the vertex with its properties and every incident edge.
    /// Returns the number of edges removed.
    pub fn drop_vertex(&self, vertex_id: i64) -> Result<usize, GraphLifeError> {
        self.ensure_transaction()?;
        self.mark_written();
        if !self.vertex_exists(vertex_id)? {
            return Err(GraphLifeError::not_found(format!("vertex {vertex_id}")));
        }
        let conn = self.connection();
        conn.execute(
            "DELETE FROM graph_edge_properties WHERE edge_id IN \
             (SELECT id FROM graph_edges WHERE from_id=?1 OR to_id=?1)",
            params![vertex_id],
        )
        .map_err(|e| GraphLifeError::write(e.to_string()))?;
        let edges = conn
            .execute(
                "DELETE FROM graph_edges WHERE from_id=?1 OR to_id=?1",
                params![vertex_id],
            )
            .map_err(|e| GraphLifeError::write(e.to_string()))?;
        conn.execute(
            "DELETE FROM graph_vertex_properties WHERE vertex_id=?1",
            params![vertex_id],
        )
        .map_err(|e| GraphLifeError::write(e.to_string()))?;
        conn.execute("DELETE FROM graph_vertices WHERE id=?1", params![vertex_id])
            .map_err(|e| GraphLifeError::write(e.to_string()))?;
        Ok(edges)
    }

    pub fn vertex(&self, vertex_id: i64) -> Result<Option<Vertex>, GraphLifeError> {
        self.ensure_transaction()?;
        let label: Option<String> = self
            .connection()
            .query_row(
                "SELECT label FROM graph_vertices WHERE id=?1",
                params![vertex_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let Some(label) = label else {
            return Ok(None);
        };

        let conn = self.connection();
        let mut stmt = conn
            .prepare_cached(
                "SELECT key, value_type, value FROM graph_vertex_properties \
                 WHERE vertex_id=?1 ORDER BY key, id",
            )
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params![vertex_id], property_row)
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let mut properties: BTreeMap<String, Vec<PropertyValue>> = BTreeMap::new();
        for row in rows {
            let (key, value_type, column) = row.map_err(|e| GraphLifeError::query(e.to_string()))?;
            properties
                .entry(key)
                .or_default()
                .push(PropertyValue::from_sql(&value_type, column)?);
        }
        Ok(Some(Vertex {
            id: vertex_id,
            label,
            properties,
        }))
    }

    pub fn edge(&self, edge_id: i64) -> Result<Option<Edge>, GraphLifeError> {
        self.ensure_transaction()?;
        let row: Option<(String, i64, i64)> = self
            .connection()
            .query_row(
                "SELECT label, from_id, to_id FROM graph_edges WHERE id=?1",
                params![edge_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let Some((label, from_id, to_id)) = row else {
            return Ok(None);
        };

        let conn = self.connection();
        let mut stmt = conn
            .prepare_cached(
                "SELECT key, value_type, value FROM graph_edge_properties \
                 WHERE edge_id=?1 ORDER BY key",
            )
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params![edge_id], property_row)
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let mut properties = BTreeMap::new();
        for row in rows {
            let (key, value_type, column) = row.map_err(|e| GraphLifeError::query(e.to_string()))?;
            properties.insert(key, PropertyValue::from_sql(&value_type, column)?);
        }
        Ok(Some(Edge {
            id: edge_id,
            label,
            from_id,
            to_id,
            properties,
        }))
    }

    pub fn vertex_count(&self) -> Result<i64, GraphLifeError> {
        self.ensure_transaction()?;
        self.count("SELECT COUNT(*) FROM graph_vertices", [])
    }

    pub fn edge_count(&self) -> Result<i64, GraphLifeError> {
        self.ensure_transaction()?;
        self.count("SELECT COUNT(*) FROM graph_edges", [])
    }

    fn vertex_exists(&self, vertex_id: i64) -> Result<bool, GraphLifeError> {
        let conn = self.connection();
        let mut stmt = conn
            .prepare_cached("SELECT 1 FROM graph_vertices WHERE id=?1")
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        stmt.exists(params![vertex_id])
            .map_err(|e| GraphLifeError::query(e.to_string()))
    }

    fn check_declared_type(
        &self,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Cardinality, GraphLifeError> {
        match self.property_key(key)? {
            Some(declared) => {
                if !declared.data_type.accepts(value) {
                    return Err(GraphLifeError::write(format!(
                        "property '{key}' expects {}, got {}",
                        declared.data_type.as_str(),
                        value.data_type().as_str()
                    )));
                }
                Ok(declared.cardinality)
            }
            None if !self.features.auto_schema => Err(GraphLifeError::write(format!(
                "property key '{key}' is not declared"
            ))),
            None => Ok(Cardinality::Single),
        }
    }

    fn write_vertex_property(
        &self,
        vertex_id: i64,
        key: &str,
        value: &PropertyValue,
    ) -> Result<(), GraphLifeError> {
        if key.trim().is_empty() {
            return Err(GraphLifeError::invalid_input("property key must be set"));
        }
        let cardinality = self.check_declared_type(key, value)?;
        let (value_type, column) = value.to_sql()?;
        let conn = self.connection();
        match cardinality {
            Cardinality::Single => {
                conn.execute(
                    "DELETE FROM graph_vertex_properties WHERE vertex_id=?1 AND key=?2",
                    params![vertex_id, key],
                )
                .map_err(|e| GraphLifeError::write(e.to_string()))?;
            }
            Cardinality::Set => {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT 1 FROM graph_vertex_properties \
                         WHERE vertex_id=?1 AND key=?2 AND value_type=?3 AND value=?4",
                    )
                    .map_err(|e| GraphLifeError::query(e.to_string()))?;
                let present = stmt
                    .exists(params![vertex_id, key, value_type, column])
                    .map_err(|e| GraphLifeError::query(e.to_string()))?;
                if present {
                    return Ok(());
                }
            }
            Cardinality::List => {}
        }
        conn.execute(
            "INSERT INTO graph_vertex_properties(vertex_id, key, value_type, value) \
             VALUES(?1, ?2, ?3, ?4)",
            params![vertex_id, key, value_type, column],
        )
        .map_err(|e| GraphLifeError::write(e.to_string()))?;
        Ok(())
    }

    fn check_multiplicity(
        &self,
        from_id: i64,
        to_id: i64,
        label: &str,
        multiplicity: Multiplicity,
    ) -> Result<(), GraphLifeError> {
        if multiplicity.limits_outgoing() {
            let existing = self.count(
                "SELECT COUNT(*) FROM graph_edges WHERE from_id=?1 AND label=?2",
                params![from_id, label],
            )?;
            if existing > 0 {
                return Err(GraphLifeError::write(format!(
                    "vertex {from_id} already has an outgoing '{label}' edge ({})",
                    multiplicity.as_str()
                )));
            }
        }
        if multiplicity.limits_incoming() {
            let existing = self.count(
                "SELECT COUNT(*) FROM graph_edges WHERE to_id=?1 AND label=?2",
                params![to_id, label],
            )?;
            if existing > 0 {
                return Err(GraphLifeError::write(format!(
                    "vertex {to_id} already has an incoming '{label}' edge ({})",
                    multiplicity.as_str()
                )));
            }
        }
        if multiplicity == Multiplicity::Simple {
            let existing = self.count(
                "SELECT COUNT(*) FROM graph_edges WHERE from_id=?1 AND to_id=?2 AND label=?3",
                params![from_id, to_id, label],
            )?;
            if existing > 0 {
                return Err(GraphLifeError::write(format!(
                    "'{label}' edge {from_id}->{to_id} already exists (simple)"
                )));
            }
        }
        Ok(())
    }
}

fn property_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, SqlValue)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}
