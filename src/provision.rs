use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
    errors::GraphLifeError,
    fault_injection::{FaultPoint, check_fault},
    idempotency::{AnyRelationType, IdempotencyCheck},
    session::Session,
    store::{
        Management,
        types::{CompositeIndex, DataType, EdgeLabel, PropertyKey},
    },
};

/// Declarations applied in order: keys, vertex labels, edge labels, indexes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchemaPlan {
    pub property_keys: Vec<PropertyKey>,
    pub vertex_labels: Vec<String>,
    pub edge_labels: Vec<EdgeLabel>,
    pub indexes: Vec<CompositeIndex>,
}

impl SchemaPlan {
    pub fn relation_type_count(&self) -> usize {
        self.property_keys.len() + self.vertex_labels.len() + self.edge_labels.len()
    }

    /// Geo keys fall back to the plain pair type on stores without native
    /// geo support.
    pub fn for_geoshape(mut self, geoshape: bool) -> Self {
        if !geoshape {
            for key in &mut self.property_keys {
                if key.data_type == DataType::GeoPoint {
                    key.data_type = DataType::FloatPair;
                }
            }
        }
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ProvisionOutcome {
    Created,
    AlreadyProvisioned,
}

pub struct SchemaProvisioner {
    plan: SchemaPlan,
    check: Box<dyn IdempotencyCheck>,
}

impl SchemaProvisioner {
    pub fn new(plan: SchemaPlan) -> Self {
        Self {
            plan,
            check: Box::new(AnyRelationType),
        }
    }

    pub fn with_check(mut self, check: impl IdempotencyCheck + 'static) -> Self {
        self.check = Box::new(check);
        self
    }

    pub fn plan(&self) -> &SchemaPlan {
        &self.plan
    }

    /// Declares the plan exactly once. Every failure rolls back the whole
    /// management transaction and is reported as `SchemaConflict`, except a
    /// closed session which stays a `ConnectionError`.
    pub fn provision(&self, session: &Session) -> Result<ProvisionOutcome, GraphLifeError> {
        let mgmt = session.management().map_err(|e| {
            if e.is_connection() {
                e
            } else {
                e.into_schema_conflict()
            }
        })?;

        match self.check.is_initialized(mgmt.store()) {
            Ok(true) => {
                info!(check = %self.check.describe(), "schema already provisioned");
                mgmt.rollback()?;
                return Ok(ProvisionOutcome::AlreadyProvisioned);
            }
            Ok(false) => {}
            Err(err) => {
                error!(error = %err, "schema probe failed");
                return Err(err.into_schema_conflict());
            }
        }

        let plan = self
            .plan
            .clone()
            .for_geoshape(mgmt.store().features().geoshape);
        // dropping `mgmt` on the error path rolls everything back
        declare_all(&mgmt, &plan).map_err(|err| {
            error!(error = %err, "schema declaration failed; rolled back");
            err.into_schema_conflict()
        })?;
        mgmt.commit().map_err(GraphLifeError::into_schema_conflict)?;
        info!(
            property_keys = plan.property_keys.len(),
            vertex_labels = plan.vertex_labels.len(),
            edge_labels = plan.edge_labels.len(),
            indexes = plan.indexes.len(),
            "schema provisioned"
        );
        Ok(ProvisionOutcome::Created)
    }
}

fn declare_all(mgmt: &Management<'_>, plan: &SchemaPlan) -> Result<(), GraphLifeError> {
    for key in &plan.property_keys {
        debug!(key = %key.name, data_type = key.data_type.as_str(), "declaring property key");
        mgmt.make_property_key(key)?;
    }
    for label in &plan.vertex_labels {
        debug!(label = %label, "declaring vertex label");
        mgmt.make_vertex_label(label)?;
    }
    for label in &plan.edge_labels {
        debug!(
            label = %label.name,
            multiplicity = label.multiplicity.as_str(),
            "declaring edge label"
        );
        mgmt.make_edge_label(label)?;
    }
    for index in &plan.indexes {
        debug!(index = %index.name, "building composite index");
        mgmt.build_composite_index(index)?;
    }
    check_fault(FaultPoint::ProvisionBeforeCommit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::StoreConfig,
        dataset::gods_schema,
        idempotency::AllRelationTypes,
        store::types::{ElementKind, RelationType},
    };

    #[test]
    fn provisioning_twice_keeps_the_same_relation_types() {
        let session = Session::open(&StoreConfig::in_memory()).unwrap();
        let provisioner = SchemaProvisioner::new(gods_schema());
        assert_eq!(
            provisioner.provision(&session).unwrap(),
            ProvisionOutcome::Created
        );
        let store = session.traversal().unwrap();
        let first = store.relation_types().unwrap();
        store.rollback().unwrap();

        assert_eq!(
            provisioner.provision(&session).unwrap(),
            ProvisionOutcome::AlreadyProvisioned
        );
        assert_eq!(store.relation_types().unwrap(), first);
        assert_eq!(first.len(), provisioner.plan().relation_type_count());
        store.rollback().unwrap();
    }

    #[test]
    fn geo_keys_degrade_without_geoshape() {
        let mut config = StoreConfig::in_memory();
        config.geoshape = false;
        let session = Session::open(&config).unwrap();
        SchemaProvisioner::new(gods_schema())
            .provision(&session)
            .unwrap();
        let store = session.traversal().unwrap();
        let place = store.property_key("place").unwrap().unwrap();
        assert_eq!(place.data_type, DataType::FloatPair);
        store.rollback().unwrap();
    }

    #[test]
    fn failing_plan_leaves_no_partial_schema() {
        let session = Session::open(&StoreConfig::in_memory()).unwrap();
        let plan = SchemaPlan {
            property_keys: vec![PropertyKey::new("name", DataType::String)],
            vertex_labels: vec!["god".into()],
            edge_labels: vec![],
            indexes: vec![CompositeIndex::new("byAge", ElementKind::Vertex, &["age"])],
        };
        let err = SchemaProvisioner::new(plan).provision(&session).unwrap_err();
        assert!(matches!(err, GraphLifeError::SchemaConflict(_)));
        let store = session.traversal().unwrap();
        assert!(store.relation_types().unwrap().is_empty());
        store.rollback().unwrap();
    }

    #[test]
    fn stricter_check_completes_a_partial_schema_only_when_missing() {
        let session = Session::open(&StoreConfig::in_memory()).unwrap();
        let mgmt = session.management().unwrap();
        mgmt.make_vertex_label("god").unwrap();
        mgmt.commit().unwrap();

        // the default probe is fooled by the stray label
        let lenient = SchemaProvisioner::new(gods_schema());
        assert_eq!(
            lenient.provision(&session).unwrap(),
            ProvisionOutcome::AlreadyProvisioned
        );

        let strict = SchemaProvisioner::new(gods_schema())
            .with_check(AllRelationTypes::new(["name", "god", "battled"]));
        let err = strict.provision(&session).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        let store = session.traversal().unwrap();
        assert_eq!(
            store.relation_types().unwrap(),
            vec![RelationType::VertexLabel("god".into())]
        );
        store.rollback().unwrap();
    }
}
