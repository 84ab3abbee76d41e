//! Read-only check that every link on a record is mirrored on the other side.
//!
//! A dual update that Zendesk applied to only one ticket leaves a one-way
//! link. [`check_symmetry`] never writes; [`repair_one_way`] is run only when
//! an operator asks for it.

use serde::Serialize;

use crate::error::Result;
use crate::gateway::RecordGateway;
use crate::link::{RecordId, add_member, encode};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymmetryReport {
    pub source: RecordId,
    /// Links on the source, in field order
    pub linked: Vec<RecordId>,
    /// Linked records whose own field does not point back at the source
    pub one_way: Vec<RecordId>,
    /// Linked ids the platform did not return
    pub missing: Vec<RecordId>,
}

impl SymmetryReport {
    pub fn is_symmetric(&self) -> bool {
        self.one_way.is_empty() && self.missing.is_empty()
    }
}

/// Fetch `source` and all of its linked records and compare both sides.
pub async fn check_symmetry<G: RecordGateway>(
    gateway: &G,
    field_id: u64,
    source: RecordId,
) -> Result<SymmetryReport> {
    let record = gateway.fetch_record(source).await?;
    let linked = record.links(field_id).ids();

    let others = gateway.fetch_records_by_ids(&linked).await?;

    let mut one_way = Vec::new();
    let mut missing = Vec::new();
    for id in &linked {
        match others.iter().find(|r| r.id == *id) {
            Some(other) if other.links(field_id).contains(source) => {}
            Some(_) => one_way.push(*id),
            None => missing.push(*id),
        }
    }

    if !one_way.is_empty() {
        tracing::warn!(source, ?one_way, "asymmetric links found");
    }

    Ok(SymmetryReport {
        source,
        linked,
        one_way,
        missing,
    })
}

/// Add the missing back-link on every one-way record in `report`.
///
/// Each record is re-read first so links added since the check are kept.
/// Returns the ids that were written.
pub async fn repair_one_way<G: RecordGateway>(
    gateway: &G,
    field_id: u64,
    report: &SymmetryReport,
) -> Result<Vec<RecordId>> {
    if report.one_way.is_empty() {
        return Ok(Vec::new());
    }

    let others = gateway.fetch_records_by_ids(&report.one_way).await?;
    let mut repaired = Vec::new();
    for other in others {
        let links = other.links(field_id);
        if links.contains(report.source) {
            continue;
        }
        let value = encode(&add_member(&links, report.source));
        gateway.update_link_field(other.id, &value).await?;
        tracing::info!(source = report.source, target_id = other.id, %value, "restored back-link");
        repaired.push(other.id);
    }
    repaired.sort_unstable();
    Ok(repaired)
}
