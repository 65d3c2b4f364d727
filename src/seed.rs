use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
    errors::GraphLifeError,
    fault_injection::{FaultPoint, check_fault},
    idempotency::IdempotencyCheck,
    session::Session,
    store::{GraphStore, TransactionGuard, types::PropertyValue},
};

/// A vertex to create, addressed by `handle` when wiring edges.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexSeed {
    pub handle: String,
    pub label: String,
    pub properties: Vec<(String, PropertyValue)>,
}

impl VertexSeed {
    pub fn new(handle: &str, label: &str) -> Self {
        Self {
            handle: handle.to_string(),
            label: label.to_string(),
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((key.to_string(), value.into()));
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeSeed {
    pub from: String,
    pub label: String,
    pub to: String,
    pub properties: Vec<(String, PropertyValue)>,
}

impl EdgeSeed {
    pub fn new(from: &str, label: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            label: label.to_string(),
            to: to.to_string(),
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((key.to_string(), value.into()));
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub vertices: Vec<VertexSeed>,
    pub edges: Vec<EdgeSeed>,
}

impl Dataset {
    /// Handles must be unique and every edge must reference known handles.
    pub fn validate(&self) -> Result<(), GraphLifeError> {
        let mut handles = AHashSet::with_capacity(self.vertices.len());
        for vertex in &self.vertices {
            if !handles.insert(vertex.handle.as_str()) {
                return Err(GraphLifeError::invalid_input(format!(
                    "duplicate vertex handle '{}'",
                    vertex.handle
                )));
            }
        }
        for edge in &self.edges {
            for end in [&edge.from, &edge.to] {
                if !handles.contains(end.as_str()) {
                    return Err(GraphLifeError::invalid_input(format!(
                        "edge '{}' references unknown vertex '{end}'",
                        edge.label
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SeedOutcome {
    Created { vertices: usize, edges: usize },
    AlreadySeeded,
}

pub struct SeedLoader {
    dataset: Dataset,
    check: Box<dyn IdempotencyCheck>,
}

impl SeedLoader {
    pub fn new(dataset: Dataset, check: impl IdempotencyCheck + 'static) -> Self {
        Self {
            dataset,
            check: Box::new(check),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Creates the dataset once, in a single transaction. Any failure rolls
    /// the whole dataset back and is reported as `WriteError`.
    pub fn load(&self, session: &Session) -> Result<SeedOutcome, GraphLifeError> {
        let store = session.traversal()?;
        self.dataset.validate().map_err(GraphLifeError::into_write)?;

        let guard = TransactionGuard::begin(store).map_err(GraphLifeError::into_write)?;
        if self
            .check
            .is_initialized(store)
            .map_err(GraphLifeError::into_write)?
        {
            info!(check = %self.check.describe(), "dataset already present");
            return Ok(SeedOutcome::AlreadySeeded);
        }

        info!(
            vertices = self.dataset.vertices.len(),
            edges = self.dataset.edges.len(),
            "creating elements"
        );
        let (vertices, edges) = match self.create_all(store) {
            Ok(counts) => counts,
            Err(err) => {
                error!(error = %err, "seeding failed; rolling back");
                return Err(err.into_write());
            }
        };
        guard.commit().map_err(GraphLifeError::into_write)?;
        Ok(SeedOutcome::Created { vertices, edges })
    }

    fn create_all(&self, store: &GraphStore) -> Result<(usize, usize), GraphLifeError> {
        let geoshape = store.features().geoshape;
        let encode = |value: &PropertyValue| {
            if geoshape {
                value.clone()
            } else {
                value.clone().without_geoshape()
            }
        };

        let mut ids: AHashMap<&str, i64> = AHashMap::with_capacity(self.dataset.vertices.len());
        for vertex in &self.dataset.vertices {
            let properties: Vec<(&str, PropertyValue)> = vertex
                .properties
                .iter()
                .map(|(key, value)| (key.as_str(), encode(value)))
                .collect();
            let id = store.add_vertex(&vertex.label, &properties)?;
            debug!(handle = %vertex.handle, id, "vertex created");
            ids.insert(vertex.handle.as_str(), id);
        }

        check_fault(FaultPoint::SeedAfterVertices)?;

        for edge in &self.dataset.edges {
            let from = lookup(&ids, &edge.from)?;
            let to = lookup(&ids, &edge.to)?;
            let properties: Vec<(&str, PropertyValue)> = edge
                .properties
                .iter()
                .map(|(key, value)| (key.as_str(), encode(value)))
                .collect();
            store.add_edge(from, to, &edge.label, &properties)?;
        }

        check_fault(FaultPoint::SeedBeforeCommit)?;
        Ok((self.dataset.vertices.len(), self.dataset.edges.len()))
    }
}

fn lookup(ids: &AHashMap<&str, i64>, handle: &str) -> Result<i64, GraphLifeError> {
    ids.get(handle)
        .copied()
        .ok_or_else(|| GraphLifeError::invalid_input(format!("unknown vertex handle '{handle}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::StoreConfig,
        dataset::{GODS_EDGE_COUNT, GODS_VERTEX_COUNT, MARKER_NAME, NAME_KEY, gods_dataset},
        idempotency::MarkerVertex,
    };

    fn gods_loader() -> SeedLoader {
        SeedLoader::new(gods_dataset(), MarkerVertex::new(NAME_KEY, MARKER_NAME))
    }

    #[test]
    fn seeding_twice_creates_the_dataset_once() {
        let session = Session::open(&StoreConfig::in_memory()).unwrap();
        let loader = gods_loader();
        assert_eq!(
            loader.load(&session).unwrap(),
            SeedOutcome::Created {
                vertices: GODS_VERTEX_COUNT,
                edges: GODS_EDGE_COUNT
            }
        );
        assert_eq!(loader.load(&session).unwrap(), SeedOutcome::AlreadySeeded);

        let store = session.traversal().unwrap();
        assert!(!store.in_transaction());
        assert_eq!(store.vertex_count().unwrap(), GODS_VERTEX_COUNT as i64);
        assert_eq!(store.edge_count().unwrap(), GODS_EDGE_COUNT as i64);
        store.rollback().unwrap();
    }

    #[test]
    fn dangling_edge_is_rejected_before_writing() {
        let session = Session::open(&StoreConfig::in_memory()).unwrap();
        let dataset = Dataset {
            vertices: vec![VertexSeed::new("a", "god")],
            edges: vec![EdgeSeed::new("a", "brother", "b")],
        };
        let err = SeedLoader::new(dataset, MarkerVertex::new("name", "a"))
            .load(&session)
            .unwrap_err();
        assert!(matches!(err, GraphLifeError::WriteError(_)));
        let store = session.traversal().unwrap();
        assert_eq!(store.vertex_count().unwrap(), 0);
        store.rollback().unwrap();
    }

    #[test]
    fn geo_values_fall_back_to_float_pairs() {
        let mut config = StoreConfig::in_memory();
        config.geoshape = false;
        let session = Session::open(&config).unwrap();
        gods_loader().load(&session).unwrap();

        let store = session.traversal().unwrap();
        let hercules = store
            .find_vertices(&crate::store::types::Criterion::has(NAME_KEY, "hercules"))
            .unwrap()[0];
        let battles = store
            .edges(hercules, crate::store::types::Direction::Out, Some("battled"))
            .unwrap();
        assert_eq!(battles.len(), 3);
        for battle in battles {
            assert!(matches!(
                battle.properties["place"],
                PropertyValue::FloatPair(_)
            ));
        }
        store.rollback().unwrap();
    }
}
