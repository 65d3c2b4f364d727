use graphlife::{GraphLifeError, Session, StoreConfig};
use tempfile::tempdir;

#[test]
fn session_reopens_a_file_store_with_its_data() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gods.db");

    let mut session = Session::open(&StoreConfig::at_path(&path)).unwrap();
    let store = session.traversal().unwrap();
    store.add_vertex("titan", &[("name", "saturn".into())]).unwrap();
    store.commit().unwrap();
    session.close().unwrap();

    let mut session = Session::open(&StoreConfig::at_path(&path)).unwrap();
    let store = session.traversal().unwrap();
    assert_eq!(store.vertex_count().unwrap(), 1);
    session.close().unwrap();
}

#[test]
fn uncommitted_writes_are_lost_at_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gods.db");

    let mut session = Session::open(&StoreConfig::at_path(&path)).unwrap();
    session.traversal().unwrap().add_vertex("god", &[]).unwrap();
    session.close().unwrap();

    let session = Session::open(&StoreConfig::at_path(&path)).unwrap();
    let store = session.traversal().unwrap();
    assert_eq!(store.vertex_count().unwrap(), 0);
    store.rollback().unwrap();
}

#[test]
fn missing_store_without_create_is_a_connection_error() {
    let dir = tempdir().unwrap();
    let mut config = StoreConfig::at_path(dir.path().join("absent.db"));
    config.create_if_missing = false;
    let err = Session::open(&config).err().unwrap();
    assert!(matches!(err, GraphLifeError::ConnectionError(_)));
}

#[test]
fn invalid_pragma_is_a_connection_error() {
    let mut config = StoreConfig::in_memory();
    config
        .pragmas
        .insert("journal_mode".into(), "wal; DROP".into());
    let err = Session::open(&config).err().unwrap();
    assert!(err.is_connection());
}

#[test]
fn configured_pragmas_are_applied() {
    let mut config = StoreConfig::in_memory();
    config.pragmas.insert("cache_size".into(), "-4000".into());
    let mut session = Session::open(&config).unwrap();
    assert!(session.is_open());
    session.close().unwrap();
}

#[test]
fn close_on_never_opened_handles_is_a_noop() {
    let mut session = Session::open(&StoreConfig::in_memory()).unwrap();
    session.close().unwrap();
    session.close().unwrap();
    assert!(session.drop_store().unwrap_err().is_connection());
}
