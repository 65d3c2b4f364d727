use std::{collections::HashMap, sync::OnceLock};

use parking_lot::Mutex;

use crate::errors::GraphLifeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    ProvisionBeforeCommit,
    SeedAfterVertices,
    SeedBeforeCommit,
    UpdateBeforeCommit,
    DeleteBeforeCommit,
}

struct FaultEntry {
    remaining: usize,
}

fn registry() -> &'static Mutex<HashMap<FaultPoint, FaultEntry>> {
    static REGISTRY: OnceLock<Mutex<HashMap<FaultPoint, FaultEntry>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn reset_faults() {
    registry().lock().clear();
}

/// Arms `point` so that the next `failures` passes through it return
/// `FaultInjected`.
pub fn configure_fault(point: FaultPoint, failures: usize) {
    let mut guard = registry().lock();
    if failures == 0 {
        guard.remove(&point);
    } else {
        guard.insert(
            point,
            FaultEntry {
                remaining: failures,
            },
        );
    }
}

pub(crate) fn check_fault(point: FaultPoint) -> Result<(), GraphLifeError> {
    let mut guard = registry().lock();
    let Some(entry) = guard.get_mut(&point) else {
        return Ok(());
    };
    if entry.remaining == 0 {
        return Ok(());
    }
    entry.remaining -= 1;
    if entry.remaining == 0 {
        guard.remove(&point);
    }
    Err(GraphLifeError::fault_injection(format!("{point:?}")))
}
