//! Schema catalog: property keys, vertex labels, edge labels and composite
//! indexes. Declarations are only reachable through [`super::Management`].

use rusqlite::{OptionalExtension, params};

use crate::errors::GraphLifeError;

use super::{
    GraphStore,
    layout::composite_index_name,
    types::{
        Cardinality, CompositeIndex, DataType, EdgeLabel, ElementKind, Multiplicity, PropertyKey,
        RelationType,
    },
};

/// Catalog names end up inside generated index names, so they are limited
/// to identifier characters.
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<(), GraphLifeError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(GraphLifeError::invalid_input(format!(
            "{kind} name '{name}' must be an identifier"
        )));
    }
    Ok(())
}

impl GraphStore {
    pub fn property_key(&self, name: &str) -> Result<Option<PropertyKey>, GraphLifeError> {
        self.ensure_transaction()?;
        let row: Option<(String, String)> = self
            .connection()
            .query_row(
                "SELECT data_type, cardinality FROM schema_property_keys WHERE name=?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        match row {
            None => Ok(None),
            Some((data_type, cardinality)) => Ok(Some(PropertyKey {
                name: name.to_string(),
                data_type: DataType::parse(&data_type)?,
                cardinality: Cardinality::parse(&cardinality)?,
            })),
        }
    }

    pub fn has_vertex_label(&self, name: &str) -> Result<bool, GraphLifeError> {
        self.ensure_transaction()?;
        let found = self.count(
            "SELECT COUNT(*) FROM schema_vertex_labels WHERE name=?1",
            params![name],
        )?;
        Ok(found > 0)
    }

    pub fn edge_label(&self, name: &str) -> Result<Option<EdgeLabel>, GraphLifeError> {
        self.ensure_transaction()?;
        let row: Option<(String, String)> = self
            .connection()
            .query_row(
                "SELECT multiplicity, signature FROM schema_edge_labels WHERE name=?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        match row {
            None => Ok(None),
            Some((multiplicity, signature)) => Ok(Some(EdgeLabel {
                name: name.to_string(),
                multiplicity: Multiplicity::parse(&multiplicity)?,
                signature: serde_json::from_str(&signature)
                    .map_err(|e| GraphLifeError::query(e.to_string()))?,
            })),
        }
    }

    /// Every declared property key, vertex label and edge label, in that
    /// order, each group sorted by name.
    pub fn relation_types(&self) -> Result<Vec<RelationType>, GraphLifeError> {
        self.ensure_transaction()?;
        let mut types = Vec::new();

        let conn = self.connection();
        let mut stmt = conn
            .prepare_cached("SELECT name FROM schema_property_keys ORDER BY name")
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let mut key_names = Vec::new();
        for name in rows {
            key_names.push(name.map_err(|e| GraphLifeError::query(e.to_string()))?);
        }
        for name in key_names {
            if let Some(key) = self.property_key(&name)? {
                types.push(RelationType::PropertyKey(key));
            }
        }

        let mut stmt = conn
            .prepare_cached("SELECT name FROM schema_vertex_labels ORDER BY name")
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        for name in rows {
            types.push(RelationType::VertexLabel(
                name.map_err(|e| GraphLifeError::query(e.to_string()))?,
            ));
        }

        let mut stmt = conn
            .prepare_cached("SELECT name FROM schema_edge_labels ORDER BY name")
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let mut label_names = Vec::new();
        for name in rows {
            label_names.push(name.map_err(|e| GraphLifeError::query(e.to_string()))?);
        }
        for name in label_names {
            if let Some(label) = self.edge_label(&name)? {
                types.push(RelationType::EdgeLabel(label));
            }
        }
        Ok(types)
    }

    pub fn has_relation_types(&self) -> Result<bool, GraphLifeError> {
        self.ensure_transaction()?;
        let total = self.count(
            "SELECT (SELECT COUNT(*) FROM schema_property_keys) \
             + (SELECT COUNT(*) FROM schema_vertex_labels) \
             + (SELECT COUNT(*) FROM schema_edge_labels)",
            [],
        )?;
        Ok(total > 0)
    }

    pub fn indexes(&self) -> Result<Vec<CompositeIndex>, GraphLifeError> {
        self.ensure_transaction()?;
        let conn = self.connection();
        let mut stmt = conn
            .prepare_cached("SELECT name, element, keys FROM schema_indexes ORDER BY name")
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let mut indexes = Vec::new();
        for row in rows {
            let (name, element, keys) = row.map_err(|e| GraphLifeError::query(e.to_string()))?;
            indexes.push(CompositeIndex {
                name,
                element: ElementKind::parse(&element)?,
                keys: serde_json::from_str(&keys)
                    .map_err(|e| GraphLifeError::query(e.to_string()))?,
            });
        }
        Ok(indexes)
    }

    pub(crate) fn declare_property_key(&self, key: &PropertyKey) -> Result<(), GraphLifeError> {
        validate_name("property key", &key.name)?;
        if self.property_key(&key.name)?.is_some() {
            return Err(GraphLifeError::schema_conflict(format!(
                "property key '{}' already exists",
                key.name
            )));
        }
        self.connection()
            .execute(
                "INSERT INTO schema_property_keys(name, data_type, cardinality) VALUES(?1, ?2, ?3)",
                params![
                    key.name.as_str(),
                    key.data_type.as_str(),
                    key.cardinality.as_str()
                ],
            )
            .map_err(|e| GraphLifeError::schema_conflict(e.to_string()))?;
        Ok(())
    }

    pub(crate) fn declare_vertex_label(&self, name: &str) -> Result<(), GraphLifeError> {
        validate_name("vertex label", name)?;
        if self.has_vertex_label(name)? {
            return Err(GraphLifeError::schema_conflict(format!(
                "vertex label '{name}' already exists"
            )));
        }
        self.connection()
            .execute(
                "INSERT INTO schema_vertex_labels(name) VALUES(?1)",
                params![name],
            )
            .map_err(|e| GraphLifeError::schema_conflict(e.to_string()))?;
        Ok(())
    }

    pub(crate) fn declare_edge_label(&self, label: &EdgeLabel) -> Result<(), GraphLifeError> {
        validate_name("edge label", &label.name)?;
        if self.edge_label(&label.name)?.is_some() {
            return Err(GraphLifeError::schema_conflict(format!(
                "edge label '{}' already exists",
                label.name
            )));
        }
        for key in &label.signature {
            if self.property_key(key)?.is_none() {
                return Err(GraphLifeError::schema_conflict(format!(
                    "edge label '{}' signature references undeclared key '{key}'",
                    label.name
                )));
            }
        }
        let signature = serde_json::to_string(&label.signature)
            .map_err(|e| GraphLifeError::invalid_input(e.to_string()))?;
        self.connection()
            .execute(
                "INSERT INTO schema_edge_labels(name, multiplicity, signature) VALUES(?1, ?2, ?3)",
                params![label.name.as_str(), label.multiplicity.as_str(), signature],
            )
            .map_err(|e| GraphLifeError::schema_conflict(e.to_string()))?;
        Ok(())
    }

    /// Records the index and backs each key with a partial SQLite index on
    /// the matching property table. Only exact-match lookups use it.
    pub(crate) fn declare_composite_index(
        &self,
        index: &CompositeIndex,
    ) -> Result<(), GraphLifeError> {
        validate_name("index", &index.name)?;
        if index.keys.is_empty() {
            return Err(GraphLifeError::invalid_input(format!(
                "index '{}' needs at least one key",
                index.name
            )));
        }
        let exists = self.count(
            "SELECT COUNT(*) FROM schema_indexes WHERE name=?1",
            params![index.name.as_str()],
        )?;
        if exists > 0 {
            return Err(GraphLifeError::schema_conflict(format!(
                "index '{}' already exists",
                index.name
            )));
        }
        for key in &index.keys {
            if self.property_key(key)?.is_none() {
                return Err(GraphLifeError::schema_conflict(format!(
                    "index '{}' references undeclared key '{key}'",
                    index.name
                )));
            }
        }

        let table = match index.element {
            ElementKind::Vertex => "graph_vertex_properties",
            ElementKind::Edge => "graph_edge_properties",
        };
        for (position, key) in index.keys.iter().enumerate() {
            // key names are validated identifiers, safe to inline
            let sql = format!(
                "CREATE INDEX {} ON {table}(value_type, value) WHERE key = '{key}'",
                composite_index_name(&index.name, position)
            );
            self.connection()
                .execute(&sql, [])
                .map_err(|e| GraphLifeError::schema_conflict(e.to_string()))?;
        }

        let keys = serde_json::to_string(&index.keys)
            .map_err(|e| GraphLifeError::invalid_input(e.to_string()))?;
        self.connection()
            .execute(
                "INSERT INTO schema_indexes(name, element, keys) VALUES(?1, ?2, ?3)",
                params![index.name.as_str(), index.element.as_str(), keys],
            )
            .map_err(|e| GraphLifeError::schema_conflict(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validate_name;

    #[test]
    fn names_must_be_identifiers() {
        assert!(validate_name("index", "nameIndex").is_ok());
        assert!(validate_name("index", "_x1").is_ok());
        assert!(validate_name("index", "").is_err());
        assert!(validate_name("index", "1abc").is_err());
        assert!(validate_name("index", "a'; DROP").is_err());
    }
}
