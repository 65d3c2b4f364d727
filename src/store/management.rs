use tracing::warn;

use crate::errors::GraphLifeError;

use super::{
    GraphStore,
    types::{CompositeIndex, EdgeLabel, PropertyKey},
};

/// Schema-management handle. Holds its own transaction from creation until
/// `commit` or `rollback`; dropping it unfinished rolls back.
pub struct Management<'a> {
    store: &'a GraphStore,
    finished: bool,
}

impl<'a> Management<'a> {
    pub fn open(store: &'a GraphStore) -> Result<Self, GraphLifeError> {
        store.begin_management()?;
        Ok(Self {
            store,
            finished: false,
        })
    }

    pub fn store(&self) -> &'a GraphStore {
        self.store
    }

    pub fn make_property_key(&self, key: &PropertyKey) -> Result<(), GraphLifeError> {
        self.store.declare_property_key(key)
    }

    pub fn make_vertex_label(&self, name: &str) -> Result<(), GraphLifeError> {
        self.store.declare_vertex_label(name)
    }

    pub fn make_edge_label(&self, label: &EdgeLabel) -> Result<(), GraphLifeError> {
        self.store.declare_edge_label(label)
    }

    pub fn build_composite_index(&self, index: &CompositeIndex) -> Result<(), GraphLifeError> {
        self.store.declare_composite_index(index)
    }

    pub fn commit(mut self) -> Result<(), GraphLifeError> {
        self.finished = true;
        self.store.end_management(true)
    }

    pub fn rollback(mut self) -> Result<(), GraphLifeError> {
        self.finished = true;
        self.store.end_management(false)
    }
}

impl Drop for Management<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.store.end_management(false) {
                warn!(error = %err, "failed to roll back abandoned management transaction");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{DataType, ElementKind, Multiplicity};

    #[test]
    fn committed_declarations_are_visible() {
        let store = GraphStore::open_in_memory().unwrap();
        let mgmt = Management::open(&store).unwrap();
        mgmt.make_property_key(&PropertyKey::new("reason", DataType::String))
            .unwrap();
        mgmt.make_edge_label(&EdgeLabel::new("lives").with_signature(&["reason"]))
            .unwrap();
        mgmt.commit().unwrap();

        let label = store.edge_label("lives").unwrap().unwrap();
        assert_eq!(label.signature, vec!["reason".to_string()]);
        assert_eq!(label.multiplicity, Multiplicity::Multi);
        store.rollback().unwrap();
    }

    #[test]
    fn dropped_handle_rolls_back() {
        let store = GraphStore::open_in_memory().unwrap();
        {
            let mgmt = Management::open(&store).unwrap();
            mgmt.make_vertex_label("titan").unwrap();
        }
        assert!(!store.in_transaction());
        assert!(!store.has_vertex_label("titan").unwrap());
        store.rollback().unwrap();
    }

    #[test]
    fn signature_must_reference_declared_keys() {
        let store = GraphStore::open_in_memory().unwrap();
        let mgmt = Management::open(&store).unwrap();
        let err = mgmt
            .make_edge_label(&EdgeLabel::new("lives").with_signature(&["reason"]))
            .unwrap_err();
        assert!(matches!(err, GraphLifeError::SchemaConflict(_)));
    }

    #[test]
    fn index_over_undeclared_key_is_rejected() {
        let store = GraphStore::open_in_memory().unwrap();
        let mgmt = Management::open(&store).unwrap();
        let err = mgmt
            .build_composite_index(&CompositeIndex::new(
                "nameIndex",
                ElementKind::Vertex,
                &["name"],
            ))
            .unwrap_err();
        assert!(matches!(err, GraphLifeError::SchemaConflict(_)));
        mgmt.rollback().unwrap();
    }

    #[test]
    fn management_refuses_to_nest_inside_open_transaction() {
        let store = GraphStore::open_in_memory().unwrap();
        store.vertex_count().unwrap();
        assert!(Management::open(&store).is_err());
        store.rollback().unwrap();
        assert!(Management::open(&store).is_ok());
    }
}
