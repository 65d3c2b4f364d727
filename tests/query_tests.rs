use graphlife::{
    MarkerVertex, QueryExecutor, SchemaProvisioner, SeedLoader, Session, StoreConfig,
    dataset::{AGE_KEY, MARKER_NAME, NAME_KEY, gods_dataset, gods_schema},
    store::types::{CompareOp, Criterion, Direction, PropertyValue},
};

fn seeded() -> Session {
    let session = Session::open(&StoreConfig::in_memory()).unwrap();
    SchemaProvisioner::new(gods_schema())
        .provision(&session)
        .unwrap();
    SeedLoader::new(gods_dataset(), MarkerVertex::new(NAME_KEY, MARKER_NAME))
        .load(&session)
        .unwrap();
    session
}

#[test]
fn range_query_returns_exactly_the_matching_subset() {
    let session = seeded();
    let queries = QueryExecutor::new(&session);
    let all_ages = [10000, 5000, 4500, 30, 45, 4000];

    for bound in [0, 30, 31, 4000, 4500, 4501, 5000, 10000, 10001] {
        let mut got: Vec<i64> = queries
            .range_values(AGE_KEY, bound)
            .unwrap()
            .iter()
            .filter_map(PropertyValue::as_i64)
            .collect();
        got.sort_unstable();
        let mut expected: Vec<i64> = all_ages.iter().copied().filter(|a| *a >= bound).collect();
        expected.sort_unstable();
        assert_eq!(got, expected, "bound {bound}");
    }
}

#[test]
fn reads_never_leave_a_transaction_open() {
    let session = seeded();
    let store = session.traversal().unwrap();
    store.reset_metrics();

    let queries = QueryExecutor::new(&session);
    queries.snapshot_report().unwrap();
    assert!(queries.lookup(NAME_KEY, "nobody").unwrap().is_none());
    assert!(queries.range_values(AGE_KEY, "text").is_err());

    assert!(!store.in_transaction());
    let metrics = store.metrics_snapshot();
    assert_eq!(metrics.tx_begin_count, metrics.tx_rollback_count);
    assert_eq!(metrics.tx_commit_count, 0);
}

#[test]
fn edge_lookup_follows_label_and_target() {
    let session = seeded();
    let queries = QueryExecutor::new(&session);
    let edge = queries
        .edge_between(
            &Criterion::has(NAME_KEY, "hercules"),
            "battled",
            &Criterion::has(NAME_KEY, "cerberus"),
        )
        .unwrap()
        .unwrap();
    assert_eq!(edge.properties["time"], PropertyValue::Integer(12));

    assert!(
        queries
            .edge_between(
                &Criterion::has(NAME_KEY, "hercules"),
                "father",
                &Criterion::has(NAME_KEY, "hydra"),
            )
            .unwrap()
            .is_none()
    );
}

#[test]
fn neighbor_names_are_deduplicated() {
    let session = seeded();
    let queries = QueryExecutor::new(&session);
    let brothers = queries
        .neighbor_names(
            &Criterion::has(NAME_KEY, "pluto"),
            "brother",
            Direction::Both,
            NAME_KEY,
        )
        .unwrap();
    assert_eq!(brothers, vec!["jupiter", "neptune"]);

    let residents = queries
        .neighbor_names(
            &Criterion::has(NAME_KEY, "tartarus"),
            "lives",
            Direction::In,
            NAME_KEY,
        )
        .unwrap();
    assert_eq!(residents, vec!["pluto", "cerberus"]);
}

#[test]
fn combined_criteria_narrow_the_match() {
    let session = seeded();
    let store = session.traversal().unwrap();
    let old_gods = store
        .find_vertices(
            &Criterion::label("god").and(Criterion::compare(AGE_KEY, CompareOp::Gt, 4000)),
        )
        .unwrap();
    assert_eq!(old_gods.len(), 2);
    store.rollback().unwrap();
}
