use graphlife::{
    AllRelationTypes, ProvisionOutcome, SchemaProvisioner, Session, StoreConfig,
    dataset::gods_schema,
    store::types::{DataType, ElementKind, Multiplicity, RelationType},
};

fn names(session: &Session) -> Vec<String> {
    let store = session.traversal().unwrap();
    let names = store
        .relation_types()
        .unwrap()
        .iter()
        .map(|t| t.name().to_string())
        .collect();
    store.rollback().unwrap();
    names
}

#[test]
fn provisioning_is_idempotent() {
    let session = Session::open(&StoreConfig::in_memory()).unwrap();
    let provisioner = SchemaProvisioner::new(gods_schema());

    assert_eq!(provisioner.provision(&session).unwrap(), ProvisionOutcome::Created);
    let once = names(&session);
    assert_eq!(
        provisioner.provision(&session).unwrap(),
        ProvisionOutcome::AlreadyProvisioned
    );
    assert_eq!(names(&session), once);
    assert_eq!(once.len(), 17);
}

#[test]
fn declared_schema_matches_the_plan() {
    let session = Session::open(&StoreConfig::in_memory()).unwrap();
    SchemaProvisioner::new(gods_schema())
        .provision(&session)
        .unwrap();
    let store = session.traversal().unwrap();

    assert_eq!(
        store.property_key("place").unwrap().unwrap().data_type,
        DataType::GeoPoint
    );
    let father = store.edge_label("father").unwrap().unwrap();
    assert_eq!(father.multiplicity, Multiplicity::Many2One);
    let lives = store.edge_label("lives").unwrap().unwrap();
    assert_eq!(lives.signature, vec!["reason".to_string()]);

    let indexes = store.indexes().unwrap();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].name, "nameIndex");
    assert_eq!(indexes[0].element, ElementKind::Vertex);

    let types = store.relation_types().unwrap();
    assert!(types.contains(&RelationType::VertexLabel("monster".into())));
    store.rollback().unwrap();
}

#[test]
fn provisioning_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::at_path(dir.path().join("schema.db"));

    let mut session = Session::open(&config).unwrap();
    SchemaProvisioner::new(gods_schema())
        .provision(&session)
        .unwrap();
    session.close().unwrap();

    let mut session = Session::open(&config).unwrap();
    let strict = SchemaProvisioner::new(gods_schema())
        .with_check(AllRelationTypes::new(["name", "titan", "battled"]));
    assert_eq!(
        strict.provision(&session).unwrap(),
        ProvisionOutcome::AlreadyProvisioned
    );
    session.close().unwrap();
}

#[test]
fn provisioning_a_closed_session_is_a_connection_error() {
    let mut session = Session::open(&StoreConfig::in_memory()).unwrap();
    session.close().unwrap();
    let err = SchemaProvisioner::new(gods_schema())
        .provision(&session)
        .unwrap_err();
    assert!(err.is_connection());
}
