//! Idempotent lifecycle runner for an embedded SQLite property graph:
//! schema provisioning, one-time seeding, transactional updates and deletes,
//! and paced read cycles.
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod config;
pub mod crud;
pub mod dataset;
pub mod errors;
pub mod fault_injection;
pub mod idempotency;
pub mod integrity;
pub mod lifecycle;
pub mod pacing;
pub mod provision;
pub mod query;
pub mod seed;
pub mod session;
pub mod store;

pub use crate::config::{AppConfig, ConfigError, RunConfig, StoreConfig};
pub use crate::crud::{CrudExecutor, DeleteOutcome};
pub use crate::errors::GraphLifeError;
pub use crate::idempotency::{AllRelationTypes, AnyRelationType, IdempotencyCheck, MarkerVertex};
pub use crate::integrity::{IntegrityReport, check_integrity};
pub use crate::lifecycle::{LifecycleController, LifecycleState, RunReport};
pub use crate::pacing::{NoPacing, Pacer, RandomPacer};
pub use crate::provision::{ProvisionOutcome, SchemaPlan, SchemaProvisioner};
pub use crate::query::{QueryExecutor, ReadReport};
pub use crate::seed::{Dataset, EdgeSeed, SeedLoader, SeedOutcome, VertexSeed};
pub use crate::session::Session;
pub use crate::store::{GraphStore, Management, ReadScope, StoreFeatures, TransactionGuard};
