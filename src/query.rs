//! Read-only traversals. Each operation runs inside a [`ReadScope`], so the
//! implicit transaction is rolled back on every exit path.

use ahash::AHashSet;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    dataset::{AGE_KEY, DELETE_TARGET, NAME_KEY, UPDATE_TARGET},
    errors::GraphLifeError,
    session::Session,
    store::{
        ReadScope,
        types::{Criterion, Direction, Edge, PropertyValue, Vertex},
    },
};

/// Results of the standard read set run after every lifecycle stage.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReadReport {
    pub jupiter: Option<Vertex>,
    pub hercules_battled_hydra: Option<Edge>,
    pub ages_at_least_5000: Vec<PropertyValue>,
    pub pluto_exists: bool,
    pub jupiter_brothers: Vec<String>,
}

pub struct QueryExecutor<'s> {
    session: &'s Session,
}

impl<'s> QueryExecutor<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Point lookup by exact value. More than one match is logged and the
    /// lowest id wins.
    pub fn lookup(
        &self,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<Option<Vertex>, GraphLifeError> {
        let scope = ReadScope::acquire(self.session.traversal()?);
        let store = scope.store();
        let criterion = Criterion::has(key, value);
        let ids = store.find_vertices(&criterion)?;
        if ids.len() > 1 {
            warn!(criterion = %criterion, matches = ids.len(), "lookup matched several vertices");
        }
        match ids.first() {
            Some(id) => store.vertex(*id),
            None => Ok(None),
        }
    }

    /// First `label` edge leading from a `source` match to a `target` match.
    pub fn edge_between(
        &self,
        source: &Criterion,
        label: &str,
        target: &Criterion,
    ) -> Result<Option<Edge>, GraphLifeError> {
        let scope = ReadScope::acquire(self.session.traversal()?);
        let store = scope.store();
        let targets: AHashSet<i64> = store.find_vertices(target)?.into_iter().collect();
        if targets.is_empty() {
            return Ok(None);
        }
        for source_id in store.find_vertices(source)? {
            let found = store
                .edges(source_id, Direction::Out, Some(label))?
                .into_iter()
                .find(|edge| targets.contains(&edge.to_id));
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Values of `key` on every vertex whose `key` is at least `min`.
    pub fn range_values(
        &self,
        key: &str,
        min: impl Into<PropertyValue>,
    ) -> Result<Vec<PropertyValue>, GraphLifeError> {
        let scope = ReadScope::acquire(self.session.traversal()?);
        let store = scope.store();
        let mut values = Vec::new();
        for id in store.find_vertices(&Criterion::gte(key, min))? {
            values.extend(store.values(id, key)?);
        }
        Ok(values)
    }

    pub fn exists(
        &self,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<bool, GraphLifeError> {
        let scope = ReadScope::acquire(self.session.traversal()?);
        scope.store().exists(&Criterion::has(key, value))
    }

    /// `display_key` values of the vertices reached from `criterion` matches
    /// through `label` edges, without repeats, in first-seen order.
    pub fn neighbor_names(
        &self,
        criterion: &Criterion,
        label: &str,
        direction: Direction,
        display_key: &str,
    ) -> Result<Vec<String>, GraphLifeError> {
        let scope = ReadScope::acquire(self.session.traversal()?);
        let store = scope.store();
        let mut seen = AHashSet::new();
        let mut names = Vec::new();
        for id in store.find_vertices(criterion)? {
            for neighbor in store.neighbors(id, direction, Some(label))? {
                for value in store.values(neighbor, display_key)? {
                    let name = value.to_string();
                    if seen.insert(name.clone()) {
                        names.push(name);
                    }
                }
            }
        }
        Ok(names)
    }

    /// Runs the standard read set and logs each result.
    pub fn snapshot_report(&self) -> Result<ReadReport, GraphLifeError> {
        info!("reading elements");

        let jupiter = self.lookup(NAME_KEY, UPDATE_TARGET)?;
        match &jupiter {
            Some(vertex) => info!(vertex = %to_json(vertex), "lookup"),
            None => warn!("{UPDATE_TARGET} not found"),
        }

        let hercules_battled_hydra = self.edge_between(
            &Criterion::has(NAME_KEY, "hercules"),
            "battled",
            &Criterion::has(NAME_KEY, "hydra"),
        )?;
        match &hercules_battled_hydra {
            Some(edge) => info!(edge = %to_json(edge), "incident edge"),
            None => warn!("hercules battled hydra not found"),
        }

        let ages_at_least_5000 = self.range_values(AGE_KEY, 5000)?;
        info!(values = %to_json(&ages_at_least_5000), "ages >= 5000");

        let pluto_exists = self.exists(NAME_KEY, DELETE_TARGET)?;
        if pluto_exists {
            info!("{DELETE_TARGET} exists");
        } else {
            warn!("{DELETE_TARGET} not found");
        }

        let jupiter_brothers = self.neighbor_names(
            &Criterion::has(NAME_KEY, UPDATE_TARGET),
            "brother",
            Direction::Both,
            NAME_KEY,
        )?;
        info!(brothers = ?jupiter_brothers, "{UPDATE_TARGET}'s brothers");

        Ok(ReadReport {
            jupiter,
            hercules_battled_hydra,
            ages_at_least_5000,
            pluto_exists,
            jupiter_brothers,
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::StoreConfig,
        dataset::{MARKER_NAME, gods_dataset},
        idempotency::MarkerVertex,
        seed::SeedLoader,
    };

    fn seeded() -> Session {
        let session = Session::open(&StoreConfig::in_memory()).unwrap();
        SeedLoader::new(gods_dataset(), MarkerVertex::new(NAME_KEY, MARKER_NAME))
            .load(&session)
            .unwrap();
        session
    }

    #[test]
    fn snapshot_matches_the_seeded_graph() {
        let session = seeded();
        let report = QueryExecutor::new(&session).snapshot_report().unwrap();
        let jupiter = report.jupiter.unwrap();
        assert_eq!(jupiter.label, "god");
        assert_eq!(jupiter.value(AGE_KEY), Some(&PropertyValue::Integer(5000)));
        let battle = report.hercules_battled_hydra.unwrap();
        assert_eq!(battle.properties["time"], PropertyValue::Integer(2));
        assert_eq!(
            report.ages_at_least_5000,
            vec![PropertyValue::Integer(10000), PropertyValue::Integer(5000)]
        );
        assert!(report.pluto_exists);
        assert_eq!(report.jupiter_brothers, vec!["neptune", "pluto"]);
        assert!(!session.traversal().unwrap().in_transaction());
    }

    #[test]
    fn failed_read_still_releases_the_transaction() {
        let session = seeded();
        let err = QueryExecutor::new(&session)
            .range_values(AGE_KEY, "old")
            .unwrap_err();
        assert!(matches!(err, GraphLifeError::InvalidInput(_)));
        assert!(!session.traversal().unwrap().in_transaction());
    }

    #[test]
    fn lookup_of_missing_vertex_is_none() {
        let session = seeded();
        let queries = QueryExecutor::new(&session);
        assert!(queries.lookup(NAME_KEY, "zeus").unwrap().is_none());
        assert!(!queries.exists(NAME_KEY, "zeus").unwrap());
    }
}
