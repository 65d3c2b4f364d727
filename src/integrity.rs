//! Structural checks over the stored graph: dangling edges, orphaned
//! property rows, multiplicity breaches.

use std::fmt;

use serde::Serialize;

use crate::{
    errors::GraphLifeError,
    store::{GraphStore, ReadScope, types::Multiplicity},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub total_vertices: i64,
    pub total_edges: i64,
    pub orphan_edges: i64,
    pub orphan_vertex_properties: i64,
    pub orphan_edge_properties: i64,
    pub multiplicity_violations: i64,
}

impl IntegrityReport {
    pub fn has_issues(&self) -> bool {
        self.orphan_edges > 0
            || self.orphan_vertex_properties > 0
            || self.orphan_edge_properties > 0
            || self.multiplicity_violations > 0
    }
}

#[derive(Debug)]
pub struct IntegrityError {
    pub report: IntegrityReport,
    /// Set when the checks could not run at all.
    pub source: Option<GraphLifeError>,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(err) = &self.source {
            return write!(f, "integrity check failed: {err}");
        }
        write!(
            f,
            "integrity violations: {} orphan edges, {} orphan properties, {} multiplicity breaches",
            self.report.orphan_edges,
            self.report.orphan_vertex_properties + self.report.orphan_edge_properties,
            self.report.multiplicity_violations
        )
    }
}

impl std::error::Error for IntegrityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err as &dyn std::error::Error)
    }
}

/// Runs every check inside its own read scope.
pub fn check_integrity(store: &GraphStore) -> Result<IntegrityReport, GraphLifeError> {
    let scope = ReadScope::acquire(store);
    let store = scope.store();
    store.ensure_transaction()?;

    let mut report = IntegrityReport {
        total_vertices: store.count("SELECT COUNT(*) FROM graph_vertices", [])?,
        total_edges: store.count("SELECT COUNT(*) FROM graph_edges", [])?,
        ..IntegrityReport::default()
    };
    report.orphan_edges = store.count(
        "SELECT COUNT(*) FROM graph_edges e \
         LEFT JOIN graph_vertices src ON src.id = e.from_id \
         LEFT JOIN graph_vertices dst ON dst.id = e.to_id \
         WHERE src.id IS NULL OR dst.id IS NULL",
        [],
    )?;
    report.orphan_vertex_properties = store.count(
        "SELECT COUNT(*) FROM graph_vertex_properties p \
         LEFT JOIN graph_vertices v ON v.id = p.vertex_id WHERE v.id IS NULL",
        [],
    )?;
    report.orphan_edge_properties = store.count(
        "SELECT COUNT(*) FROM graph_edge_properties p \
         LEFT JOIN graph_edges e ON e.id = p.edge_id WHERE e.id IS NULL",
        [],
    )?;
    report.multiplicity_violations = multiplicity_violations(store)?;
    Ok(report)
}

pub fn check_integrity_strict(store: &GraphStore) -> Result<(), IntegrityError> {
    let report = check_integrity(store).map_err(|err| IntegrityError {
        report: IntegrityReport::default(),
        source: Some(err),
    })?;
    if report.has_issues() {
        Err(IntegrityError {
            report,
            source: None,
        })
    } else {
        Ok(())
    }
}

fn multiplicity_violations(store: &GraphStore) -> Result<i64, GraphLifeError> {
    let mut total = 0;
    for multiplicity in [
        Multiplicity::Many2One,
        Multiplicity::One2Many,
        Multiplicity::One2One,
        Multiplicity::Simple,
    ] {
        let group_by = match multiplicity {
            Multiplicity::Many2One => "e.from_id",
            Multiplicity::One2Many => "e.to_id",
            Multiplicity::Simple => "e.from_id, e.to_id",
            // one2one is counted from both ends
            _ => "e.from_id",
        };
        let sql = format!(
            "SELECT COALESCE(SUM(cnt - 1), 0) FROM ( \
                 SELECT COUNT(*) AS cnt FROM graph_edges e \
                 JOIN schema_edge_labels l ON l.name = e.label \
                 WHERE l.multiplicity = ?1 \
                 GROUP BY e.label, {group_by} HAVING cnt > 1)"
        );
        total += store.count(&sql, [multiplicity.as_str()])?;
        if multiplicity == Multiplicity::One2One {
            total += store.count(
                "SELECT COALESCE(SUM(cnt - 1), 0) FROM ( \
                     SELECT COUNT(*) AS cnt FROM graph_edges e \
                     JOIN schema_edge_labels l ON l.name = e.label \
                     WHERE l.multiplicity = ?1 \
                     GROUP BY e.label, e.to_id HAVING cnt > 1)",
                [multiplicity.as_str()],
            )?;
        }
    }
    Ok(total)
}
