//! Run sequencing: open, provision, seed, paced read/update cycles, delete,
//! close.
//!
//! Only a failure to open the store is returned to the caller. Schema, seed,
//! update and delete failures are logged and the run moves on; a failed read
//! stops the sequence early but the session is still closed.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    config::{AppConfig, StoreConfig},
    crud::{CrudExecutor, DeleteOutcome},
    dataset::{DELETE_TARGET, MARKER_NAME, NAME_KEY, UPDATE_TARGET, gods_dataset, gods_schema},
    errors::GraphLifeError,
    idempotency::MarkerVertex,
    integrity::{IntegrityReport, check_integrity},
    pacing::{NoPacing, Pacer, RandomPacer},
    provision::{ProvisionOutcome, SchemaPlan, SchemaProvisioner},
    query::{QueryExecutor, ReadReport},
    seed::{Dataset, SeedLoader, SeedOutcome},
    session::Session,
    store::types::Criterion,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Closed,
    Opening,
    SchemaReady,
    Seeded,
    Cycling,
    Draining,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle: usize,
    /// Timestamp written, when the update committed.
    pub timestamp: Option<i64>,
    pub read: Option<ReadReport>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub states: Vec<LifecycleState>,
    pub provision: Option<ProvisionOutcome>,
    pub seed: Option<SeedOutcome>,
    pub initial_read: Option<ReadReport>,
    pub cycles: Vec<CycleReport>,
    pub deleted: Option<DeleteOutcome>,
    pub final_read: Option<ReadReport>,
    pub integrity: Option<IntegrityReport>,
    pub errors: Vec<String>,
    /// False when a read failure cut the sequence short.
    pub completed: bool,
}

impl RunReport {
    fn enter(&mut self, state: LifecycleState) {
        info!(state = ?state, "lifecycle transition");
        self.states.push(state);
    }

    fn record(&mut self, stage: &str, err: &GraphLifeError) {
        error!(stage, error = %err, "stage failed");
        self.errors.push(format!("{stage}: {err}"));
    }
}

pub struct LifecycleController {
    store: StoreConfig,
    cycles: usize,
    pacer: Box<dyn Pacer>,
    schema: SchemaPlan,
    dataset: Dataset,
    marker: MarkerVertex,
}

impl LifecycleController {
    pub fn new(store: StoreConfig) -> Self {
        Self {
            store,
            cycles: 3,
            pacer: Box::new(RandomPacer::default()),
            schema: gods_schema(),
            dataset: gods_dataset(),
            marker: MarkerVertex::new(NAME_KEY, MARKER_NAME),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.store.clone())
            .with_cycles(config.run.cycles)
            .with_pacer(RandomPacer::from_config(&config.run))
    }

    pub fn with_cycles(mut self, cycles: usize) -> Self {
        self.cycles = cycles;
        self
    }

    pub fn with_pacer(mut self, pacer: impl Pacer + 'static) -> Self {
        self.pacer = Box::new(pacer);
        self
    }

    pub fn without_pacing(self) -> Self {
        self.with_pacer(NoPacing)
    }

    pub fn with_schema(mut self, schema: SchemaPlan) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_dataset(mut self, dataset: Dataset, marker: MarkerVertex) -> Self {
        self.dataset = dataset;
        self.marker = marker;
        self
    }

    pub fn run(&mut self) -> Result<RunReport, GraphLifeError> {
        let mut report = RunReport {
            states: vec![LifecycleState::Closed],
            ..RunReport::default()
        };
        report.enter(LifecycleState::Opening);
        let mut session = Session::open(&self.store)?;

        let completed = self.drive(&session, &mut report);
        report.completed = completed;

        if let Ok(store) = session.store() {
            match check_integrity(store) {
                Ok(integrity) => {
                    if integrity.has_issues() {
                        warn!(?integrity, "integrity check found issues");
                    }
                    report.integrity = Some(integrity);
                }
                Err(err) => report.record("integrity", &err),
            }
        }

        if let Err(err) = session.close() {
            report.record("close", &err);
        }
        report.enter(LifecycleState::Closed);
        Ok(report)
    }

    /// Returns false when a read failure ended the run early.
    fn drive(&mut self, session: &Session, report: &mut RunReport) -> bool {
        let provisioner = SchemaProvisioner::new(self.schema.clone());
        match provisioner.provision(session) {
            Ok(outcome) => report.provision = Some(outcome),
            Err(err) => report.record("provision", &err),
        }
        report.enter(LifecycleState::SchemaReady);

        let loader = SeedLoader::new(self.dataset.clone(), self.marker.clone());
        match loader.load(session) {
            Ok(outcome) => report.seed = Some(outcome),
            Err(err) => report.record("seed", &err),
        }
        report.enter(LifecycleState::Seeded);

        let queries = QueryExecutor::new(session);
        let crud = CrudExecutor::new(session);
        let update_target = Criterion::has(NAME_KEY, UPDATE_TARGET);

        self.pacer.pause();
        match queries.snapshot_report() {
            Ok(read) => report.initial_read = Some(read),
            Err(err) => {
                report.record("read", &err);
                return false;
            }
        }

        report.enter(LifecycleState::Cycling);
        for cycle in 1..=self.cycles {
            self.pacer.pause();
            let timestamp = match crud.touch_timestamp(&update_target) {
                Ok(ts) => Some(ts),
                Err(err) => {
                    report.record("update", &err);
                    None
                }
            };
            let read = match queries.snapshot_report() {
                Ok(read) => read,
                Err(err) => {
                    report.record("read", &err);
                    report.cycles.push(CycleReport {
                        cycle,
                        timestamp,
                        read: None,
                    });
                    return false;
                }
            };
            report.cycles.push(CycleReport {
                cycle,
                timestamp,
                read: Some(read),
            });
        }

        report.enter(LifecycleState::Draining);
        match crud.delete(&Criterion::has(NAME_KEY, DELETE_TARGET)) {
            Ok(outcome) => report.deleted = Some(outcome),
            Err(err) => report.record("delete", &err),
        }
        match queries.snapshot_report() {
            Ok(read) => report.final_read = Some(read),
            Err(err) => {
                report.record("read", &err);
                return false;
            }
        }
        true
    }

    /// Reset path: open, destroy all data and schema, close. Never
    /// provisions or seeds.
    pub fn run_drop(&self) -> Result<(), GraphLifeError> {
        let mut session = Session::open(&self.store)?;
        let dropped = session.drop_store();
        let closed = session.close();
        dropped?;
        closed
    }
}
