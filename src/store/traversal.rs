//! Vertex selection and adjacency reads.

use ahash::AHashSet;
use rusqlite::{params, types::Value as SqlValue};

use crate::errors::GraphLifeError;

use super::{
    GraphStore,
    types::{Criterion, Direction, Edge, PropertyValue},
};

impl GraphStore {
    /// Ids of every vertex matching `criterion`, ascending.
    pub fn find_vertices(&self, criterion: &Criterion) -> Result<Vec<i64>, GraphLifeError> {
        self.ensure_transaction()?;
        let mut ids = self.match_criterion(criterion)?;
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    pub fn exists(&self, criterion: &Criterion) -> Result<bool, GraphLifeError> {
        Ok(!self.find_vertices(criterion)?.is_empty())
    }

    /// Edges incident to `vertex_id`, optionally restricted to one label.
    /// A self-loop is reported once for [`Direction::Both`].
    pub fn edges(
        &self,
        vertex_id: i64,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<Edge>, GraphLifeError> {
        self.ensure_transaction()?;
        let endpoint = match direction {
            Direction::Out => "from_id=?1",
            Direction::In => "to_id=?1",
            Direction::Both => "(from_id=?1 OR to_id=?1)",
        };
        let ids = match label {
            Some(label) => self.collect_ids(
                &format!("SELECT id FROM graph_edges WHERE {endpoint} AND label=?2 ORDER BY id"),
                params![vertex_id, label],
            )?,
            None => self.collect_ids(
                &format!("SELECT id FROM graph_edges WHERE {endpoint} ORDER BY id"),
                params![vertex_id],
            )?,
        };
        let mut edges = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(edge) = self.edge(id)? {
                edges.push(edge);
            }
        }
        Ok(edges)
    }

    /// Vertices on the far side of the matching edges, in edge order and
    /// with repeats preserved.
    pub fn neighbors(
        &self,
        vertex_id: i64,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<i64>, GraphLifeError> {
        let edges = self.edges(vertex_id, direction, label)?;
        Ok(edges
            .into_iter()
            .map(|edge| {
                if edge.from_id == vertex_id {
                    edge.to_id
                } else {
                    edge.from_id
                }
            })
            .collect())
    }

    pub fn values(&self, vertex_id: i64, key: &str) -> Result<Vec<PropertyValue>, GraphLifeError> {
        self.ensure_transaction()?;
        let conn = self.connection();
        let mut stmt = conn
            .prepare_cached(
                "SELECT value_type, value FROM graph_vertex_properties \
                 WHERE vertex_id=?1 AND key=?2 ORDER BY id",
            )
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params![vertex_id, key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, SqlValue>(1)?))
            })
            .map_err(|e| GraphLifeError::query(e.to_string()))?;
        let mut values = Vec::new();
        for row in rows {
            let (value_type, column) = row.map_err(|e| GraphLifeError::query(e.to_string()))?;
            values.push(PropertyValue::from_sql(&value_type, column)?);
        }
        Ok(values)
    }

    fn match_criterion(&self, criterion: &Criterion) -> Result<Vec<i64>, GraphLifeError> {
        match criterion {
            Criterion::Label(label) => self.collect_ids(
                "SELECT id FROM graph_vertices WHERE label=?1",
                params![label],
            ),
            Criterion::Has { key, value } => {
                let (value_type, column) = value.to_sql()?;
                // integers and floats compare by value across types
                if value.is_numeric() {
                    self.collect_ids(
                        "SELECT DISTINCT vertex_id FROM graph_vertex_properties \
                         WHERE key=?1 AND value_type IN ('integer','float') AND value=?2",
                        params![key, column],
                    )
                } else {
                    self.collect_ids(
                        "SELECT DISTINCT vertex_id FROM graph_vertex_properties \
                         WHERE key=?1 AND value_type=?2 AND value=?3",
                        params![key, value_type, column],
                    )
                }
            }
            Criterion::Compare { key, op, bound } => {
                if !bound.is_numeric() {
                    return Err(GraphLifeError::invalid_input(format!(
                        "range bound for '{key}' must be numeric, got {}",
                        bound.data_type().as_str()
                    )));
                }
                let (_, column) = bound.to_sql()?;
                self.collect_ids(
                    &format!(
                        "SELECT DISTINCT vertex_id FROM graph_vertex_properties \
                         WHERE key=?1 AND value_type IN ('integer','float') AND value {} ?2",
                        op.as_sql()
                    ),
                    params![key, column],
                )
            }
            Criterion::And(parts) => {
                let Some((first, rest)) = parts.split_first() else {
                    return Err(GraphLifeError::invalid_input("empty conjunction"));
                };
                let mut matched: AHashSet<i64> = self.match_criterion(first)?.into_iter().collect();
                for part in rest {
                    if matched.is_empty() {
                        break;
                    }
                    let next: AHashSet<i64> = self.match_criterion(part)?.into_iter().collect();
                    matched.retain(|id| next.contains(id));
                }
                Ok(matched.into_iter().collect())
            }
        }
    }
}
