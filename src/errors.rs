use thiserror::Error;

/// Error type for graph store and lifecycle operations.
#[derive(Debug, Error)]
pub enum GraphLifeError {
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("schema conflict: {0}")]
    SchemaConflict(String),
    #[error("write error: {0}")]
    WriteError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("transaction error: {0}")]
    TransactionError(String),
    #[error("fault injected: {0}")]
    FaultInjected(String),
}

impl GraphLifeError {
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        GraphLifeError::ConnectionError(msg.into())
    }

    pub fn schema_conflict<T: Into<String>>(msg: T) -> Self {
        GraphLifeError::SchemaConflict(msg.into())
    }

    pub fn write<T: Into<String>>(msg: T) -> Self {
        GraphLifeError::WriteError(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        GraphLifeError::QueryError(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        GraphLifeError::NotFound(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        GraphLifeError::InvalidInput(msg.into())
    }

    pub fn transaction<T: Into<String>>(msg: T) -> Self {
        GraphLifeError::TransactionError(msg.into())
    }

    pub fn fault_injection<T: Into<String>>(msg: T) -> Self {
        GraphLifeError::FaultInjected(msg.into())
    }

    /// Re-labels any failure raised inside a write path as a `WriteError`,
    /// keeping the original message.
    pub fn into_write(self) -> Self {
        match self {
            GraphLifeError::WriteError(_) => self,
            other => GraphLifeError::WriteError(other.to_string()),
        }
    }

    /// Re-labels any failure raised during schema declaration as a
    /// `SchemaConflict`, keeping the original message.
    pub fn into_schema_conflict(self) -> Self {
        match self {
            GraphLifeError::SchemaConflict(_) => self,
            other => GraphLifeError::SchemaConflict(other.to_string()),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, GraphLifeError::ConnectionError(_))
    }
}
