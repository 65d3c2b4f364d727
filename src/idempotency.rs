//! Probes that decide whether an initialization step already ran.
//!
//! These are existence heuristics, not migration versioning. A partial or
//! concurrent earlier run can leave a store that satisfies the probe without
//! holding the full schema or dataset; swap in a stricter check (for example
//! [`AllRelationTypes`]) where that matters.

use crate::{
    errors::GraphLifeError,
    store::{GraphStore, types::Criterion, types::PropertyValue},
};

pub trait IdempotencyCheck {
    fn describe(&self) -> String;

    /// Runs inside whatever transaction the caller holds; never ends it.
    fn is_initialized(&self, store: &GraphStore) -> Result<bool, GraphLifeError>;
}

/// Initialized as soon as any property key, vertex label or edge label exists.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyRelationType;

impl IdempotencyCheck for AnyRelationType {
    fn describe(&self) -> String {
        "any relation type".to_string()
    }

    fn is_initialized(&self, store: &GraphStore) -> Result<bool, GraphLifeError> {
        store.has_relation_types()
    }
}

/// Initialized only when every named relation type exists.
#[derive(Clone, Debug)]
pub struct AllRelationTypes {
    pub names: Vec<String>,
}

impl AllRelationTypes {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl IdempotencyCheck for AllRelationTypes {
    fn describe(&self) -> String {
        format!("all of {} relation types", self.names.len())
    }

    fn is_initialized(&self, store: &GraphStore) -> Result<bool, GraphLifeError> {
        let existing = store.relation_types()?;
        Ok(self
            .names
            .iter()
            .all(|name| existing.iter().any(|t| t.name() == name)))
    }
}

/// Initialized when a vertex carries `key = value`.
#[derive(Clone, Debug)]
pub struct MarkerVertex {
    pub key: String,
    pub value: PropertyValue,
}

impl MarkerVertex {
    pub fn new(key: &str, value: impl Into<PropertyValue>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

impl IdempotencyCheck for MarkerVertex {
    fn describe(&self) -> String {
        format!("marker vertex {}={}", self.key, self.value)
    }

    fn is_initialized(&self, store: &GraphStore) -> Result<bool, GraphLifeError> {
        store.exists(&Criterion::has(&self.key, self.value.clone()))
    }
}
