use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{error, info};

use crate::{
    dataset::TIMESTAMP_KEY,
    errors::GraphLifeError,
    fault_injection::{FaultPoint, check_fault},
    session::Session,
    store::{
        TransactionGuard,
        types::{Criterion, PropertyValue},
    },
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub vertices: usize,
    pub edges: usize,
}

/// Updates and deletes, each in its own transaction. Matching nothing is a
/// successful no-op.
pub struct CrudExecutor<'s> {
    session: &'s Session,
}

impl<'s> CrudExecutor<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Assigns `key = value` on every vertex matching `criterion`; returns
    /// the number of vertices updated.
    pub fn update(
        &self,
        criterion: &Criterion,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<usize, GraphLifeError> {
        let value = value.into();
        let store = self.session.traversal()?;
        let result = TransactionGuard::begin(store).and_then(|guard| {
            guard.execute(|store| {
                let ids = store.find_vertices(criterion)?;
                for id in &ids {
                    store.set_property(*id, key, &value)?;
                }
                check_fault(FaultPoint::UpdateBeforeCommit)?;
                Ok(ids.len())
            })
        });
        match result {
            Ok(updated) => {
                info!(criterion = %criterion, key, value = %value, updated, "vertices updated");
                Ok(updated)
            }
            Err(err) => {
                error!(criterion = %criterion, key, error = %err, "update rolled back");
                Err(err.into_write())
            }
        }
    }

    /// Drops every vertex matching `criterion` together with its incident
    /// edges.
    pub fn delete(&self, criterion: &Criterion) -> Result<DeleteOutcome, GraphLifeError> {
        let store = self.session.traversal()?;
        let result = TransactionGuard::begin(store).and_then(|guard| {
            guard.execute(|store| {
                let mut outcome = DeleteOutcome::default();
                for id in store.find_vertices(criterion)? {
                    outcome.edges += store.drop_vertex(id)?;
                    outcome.vertices += 1;
                }
                check_fault(FaultPoint::DeleteBeforeCommit)?;
                Ok(outcome)
            })
        });
        match result {
            Ok(outcome) => {
                info!(
                    criterion = %criterion,
                    vertices = outcome.vertices,
                    edges = outcome.edges,
                    "vertices deleted"
                );
                Ok(outcome)
            }
            Err(err) => {
                error!(criterion = %criterion, error = %err, "delete rolled back");
                Err(err.into_write())
            }
        }
    }

    /// Stamps matching vertices with the current epoch milliseconds under
    /// `ts`.
    pub fn touch_timestamp(&self, criterion: &Criterion) -> Result<i64, GraphLifeError> {
        let ts = epoch_millis();
        self.update(criterion, TIMESTAMP_KEY, ts)?;
        Ok(ts)
    }
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    fn session_with_pair() -> (Session, i64, i64) {
        let session = Session::open(&StoreConfig::in_memory()).unwrap();
        let store = session.traversal().unwrap();
        let a = store.add_vertex("god", &[("name", "a".into())]).unwrap();
        let b = store.add_vertex("god", &[("name", "b".into())]).unwrap();
        store.add_edge(a, b, "brother", &[]).unwrap();
        store.add_edge(b, a, "brother", &[]).unwrap();
        store.commit().unwrap();
        (session, a, b)
    }

    #[test]
    fn update_commits_and_is_readable() {
        let (session, a, _) = session_with_pair();
        let crud = CrudExecutor::new(&session);
        let ts = crud.touch_timestamp(&Criterion::has("name", "a")).unwrap();
        let store = session.traversal().unwrap();
        assert!(!store.in_transaction());
        assert_eq!(store.values(a, "ts").unwrap(), vec![PropertyValue::Integer(ts)]);
        store.rollback().unwrap();
    }

    #[test]
    fn zero_matches_are_not_errors() {
        let (session, ..) = session_with_pair();
        let crud = CrudExecutor::new(&session);
        assert_eq!(crud.update(&Criterion::has("name", "zeus"), "ts", 1).unwrap(), 0);
        assert_eq!(
            crud.delete(&Criterion::has("name", "zeus")).unwrap(),
            DeleteOutcome::default()
        );
        let store = session.traversal().unwrap();
        assert_eq!(store.vertex_count().unwrap(), 2);
        assert_eq!(store.edge_count().unwrap(), 2);
        store.rollback().unwrap();
    }

    #[test]
    fn delete_cascades_and_reports_counts() {
        let (session, a, _) = session_with_pair();
        let outcome = CrudExecutor::new(&session)
            .delete(&Criterion::has("name", "a"))
            .unwrap();
        assert_eq!(outcome, DeleteOutcome { vertices: 1, edges: 2 });
        let store = session.traversal().unwrap();
        assert!(store.vertex(a).unwrap().is_none());
        assert_eq!(store.edge_count().unwrap(), 0);
        store.rollback().unwrap();
    }

    #[test]
    fn failed_update_is_a_write_error_and_leaves_no_transaction() {
        let (session, a, _) = session_with_pair();
        let store = session.traversal().unwrap();
        let mgmt = session.management().unwrap();
        mgmt.make_property_key(&crate::store::types::PropertyKey::new(
            "age",
            crate::store::types::DataType::Integer,
        ))
        .unwrap();
        mgmt.commit().unwrap();

        let err = CrudExecutor::new(&session)
            .update(&Criterion::label("god"), "age", "old")
            .unwrap_err();
        assert!(matches!(err, GraphLifeError::WriteError(_)));
        assert!(!store.in_transaction());
        assert!(store.values(a, "age").unwrap().is_empty());
        store.rollback().unwrap();
    }
}
