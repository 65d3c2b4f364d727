use tracing::{info, warn};

use crate::{
    config::StoreConfig,
    errors::GraphLifeError,
    store::{GraphStore, Management},
};

/// Owns the store connection for one run.
pub struct Session {
    store: Option<GraphStore>,
}

impl Session {
    pub fn open(config: &StoreConfig) -> Result<Self, GraphLifeError> {
        let store = GraphStore::open(config).map_err(|e| match e {
            GraphLifeError::ConnectionError(_) => e,
            other => GraphLifeError::connection(other.to_string()),
        })?;
        info!(location = store.location(), "store session opened");
        Ok(Self { store: Some(store) })
    }

    pub fn is_open(&self) -> bool {
        self.store.is_some()
    }

    pub fn store(&self) -> Result<&GraphStore, GraphLifeError> {
        self.store
            .as_ref()
            .ok_or_else(|| GraphLifeError::connection("session is closed"))
    }

    /// Opens a schema-management transaction.
    pub fn management(&self) -> Result<Management<'_>, GraphLifeError> {
        Management::open(self.store()?)
    }

    pub fn traversal(&self) -> Result<&GraphStore, GraphLifeError> {
        self.store()
    }

    /// Releases the traversal handle's open transaction, then the connection.
    /// Closing a closed session only logs.
    pub fn close(&mut self) -> Result<(), GraphLifeError> {
        let Some(store) = self.store.take() else {
            info!("close on a session that is not open; nothing to do");
            return Ok(());
        };
        if let Err(err) = store.rollback() {
            warn!(error = %err, "failed to end traversal transaction before close");
        }
        let location = store.location().to_string();
        store.close()?;
        info!(location = %location, "store session closed");
        Ok(())
    }

    /// Destroys all data and schema. The session stays open on the empty store.
    pub fn drop_store(&mut self) -> Result<(), GraphLifeError> {
        let store = self.store()?;
        store.clear()?;
        warn!(location = store.location(), "store dropped");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.store.is_some() {
            if let Err(err) = self.close() {
                warn!(error = %err, "failed to close session on drop");
            }
        }
    }
}
