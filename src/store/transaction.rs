use tracing::warn;

use crate::errors::GraphLifeError;

use super::GraphStore;

/// Write transaction that rolls back on drop unless committed. Never joins a
/// write transaction that is already open on the store.
pub struct TransactionGuard<'a> {
    store: &'a GraphStore,
    committed: bool,
}

impl<'a> TransactionGuard<'a> {
    pub fn begin(store: &'a GraphStore) -> Result<Self, GraphLifeError> {
        store.begin_write()?;
        Ok(Self {
            store,
            committed: false,
        })
    }

    pub fn store(&self) -> &'a GraphStore {
        self.store
    }

    pub fn commit(mut self) -> Result<(), GraphLifeError> {
        if self.store.features().transactions && !self.store.in_transaction() {
            return Err(GraphLifeError::transaction(
                "transaction ended before commit; its writes are lost",
            ));
        }
        self.store.commit()?;
        self.committed = true;
        Ok(())
    }

    /// Runs `f` inside the transaction; commits on `Ok`, rolls back otherwise.
    pub fn execute<T, F>(self, f: F) -> Result<T, GraphLifeError>
    where
        F: FnOnce(&GraphStore) -> Result<T, GraphLifeError>,
    {
        let value = f(self.store)?;
        self.commit()?;
        Ok(value)
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(err) = self.store.rollback() {
                warn!(error = %err, "rollback of abandoned transaction failed");
            }
        }
    }
}

/// Read scope: the transaction the reads run in is rolled back when the
/// scope ends, on every exit path. Inside an open write the scope reads the
/// pending state and leaves the write alone.
pub struct ReadScope<'a> {
    store: &'a GraphStore,
    nested: bool,
}

impl<'a> ReadScope<'a> {
    pub fn acquire(store: &'a GraphStore) -> Self {
        Self {
            store,
            nested: store.has_open_write(),
        }
    }

    pub fn store(&self) -> &'a GraphStore {
        self.store
    }
}

impl Drop for ReadScope<'_> {
    fn drop(&mut self) {
        if self.nested {
            return;
        }
        if let Err(err) = self.store.rollback() {
            warn!(error = %err, "failed to release read transaction");
        }
    }
}
