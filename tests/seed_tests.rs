use graphlife::{
    Dataset, EdgeSeed, GraphLifeError, MarkerVertex, SchemaProvisioner, SeedLoader, SeedOutcome,
    Session, StoreConfig, VertexSeed,
    dataset::{GODS_EDGE_COUNT, GODS_VERTEX_COUNT, MARKER_NAME, NAME_KEY, gods_dataset, gods_schema},
    store::types::{Criterion, Direction, GeoPoint, PropertyValue},
};

fn gods_loader() -> SeedLoader {
    SeedLoader::new(gods_dataset(), MarkerVertex::new(NAME_KEY, MARKER_NAME))
}

fn counts(session: &Session) -> (i64, i64) {
    let store = session.traversal().unwrap();
    let counts = (store.vertex_count().unwrap(), store.edge_count().unwrap());
    store.rollback().unwrap();
    counts
}

#[test]
fn seeding_is_idempotent_after_provisioning() {
    let session = Session::open(&StoreConfig::in_memory()).unwrap();
    SchemaProvisioner::new(gods_schema())
        .provision(&session)
        .unwrap();

    let loader = gods_loader();
    loader.load(&session).unwrap();
    let first = counts(&session);
    assert_eq!(first, (GODS_VERTEX_COUNT as i64, GODS_EDGE_COUNT as i64));

    assert_eq!(loader.load(&session).unwrap(), SeedOutcome::AlreadySeeded);
    assert_eq!(counts(&session), first);

    let store = session.traversal().unwrap();
    assert_eq!(
        store
            .find_vertices(&Criterion::has(NAME_KEY, MARKER_NAME))
            .unwrap()
            .len(),
        1
    );
    store.rollback().unwrap();
}

#[test]
fn native_geo_points_are_kept_with_geoshape() {
    let session = Session::open(&StoreConfig::in_memory()).unwrap();
    SchemaProvisioner::new(gods_schema())
        .provision(&session)
        .unwrap();
    gods_loader().load(&session).unwrap();

    let store = session.traversal().unwrap();
    let hercules = store
        .find_vertices(&Criterion::has(NAME_KEY, "hercules"))
        .unwrap()[0];
    let places: Vec<PropertyValue> = store
        .edges(hercules, Direction::Out, Some("battled"))
        .unwrap()
        .into_iter()
        .map(|edge| edge.properties["place"].clone())
        .collect();
    assert_eq!(
        places,
        vec![
            PropertyValue::GeoPoint(GeoPoint::new(38.1, 23.7)),
            PropertyValue::GeoPoint(GeoPoint::new(37.7, 23.9)),
            PropertyValue::GeoPoint(GeoPoint::new(39.0, 22.0)),
        ]
    );
    store.rollback().unwrap();
}

#[test]
fn multiplicity_violation_rolls_back_the_whole_seed() {
    let session = Session::open(&StoreConfig::in_memory()).unwrap();
    SchemaProvisioner::new(gods_schema())
        .provision(&session)
        .unwrap();

    let dataset = Dataset {
        vertices: vec![
            VertexSeed::new("hercules", "demigod").property(NAME_KEY, "hercules"),
            VertexSeed::new("jupiter", "god").property(NAME_KEY, "jupiter"),
            VertexSeed::new("amphitryon", "human").property(NAME_KEY, "amphitryon"),
        ],
        edges: vec![
            EdgeSeed::new("hercules", "father", "jupiter"),
            EdgeSeed::new("hercules", "father", "amphitryon"),
        ],
    };
    let err = SeedLoader::new(dataset, MarkerVertex::new(NAME_KEY, "hercules"))
        .load(&session)
        .unwrap_err();
    assert!(matches!(err, GraphLifeError::WriteError(_)));
    assert_eq!(counts(&session), (0, 0));
}

#[test]
fn type_mismatch_rolls_back_the_whole_seed() {
    let session = Session::open(&StoreConfig::in_memory()).unwrap();
    SchemaProvisioner::new(gods_schema())
        .provision(&session)
        .unwrap();
    let dataset = Dataset {
        vertices: vec![
            VertexSeed::new("a", "god").property(NAME_KEY, "a"),
            VertexSeed::new("b", "god").property("age", "ancient"),
        ],
        edges: vec![],
    };
    assert!(
        SeedLoader::new(dataset, MarkerVertex::new(NAME_KEY, "a"))
            .load(&session)
            .is_err()
    );
    assert_eq!(counts(&session), (0, 0));
}
