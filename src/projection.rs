//! In-memory mirror of the current record's links.
//!
//! The projection owns the link set and resolved records shown to the user.
//! It changes only after the sync engine reports a persisted transaction, so
//! a failed update never leaves the display ahead of Zendesk.

use std::collections::HashSet;

use crate::error::Result;
use crate::gateway::{Record, RecordGateway};
use crate::link::{LinkSet, RecordId, decode};
use crate::sync::{LinkOperation, SyncEngine, SyncReport};

/// Maximum number of similar tickets offered for linking
pub const SIMILAR_LIMIT: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct LinkProjection {
    source: Option<Record>,
    links: LinkSet,
    resolved: Vec<Record>,
}

impl LinkProjection {
    /// Seed from the host-provided record and its raw linked field value.
    pub fn new(source: Option<Record>, raw_field: &str) -> Self {
        Self {
            source,
            links: decode(raw_field),
            resolved: Vec::new(),
        }
    }

    pub fn from_record(record: Record, field_id: u64) -> Self {
        let links = record.links(field_id);
        Self {
            source: Some(record),
            links,
            resolved: Vec::new(),
        }
    }

    pub fn source(&self) -> Option<&Record> {
        self.source.as_ref()
    }

    pub fn source_id(&self) -> Option<RecordId> {
        self.source.as_ref().map(|r| r.id)
    }

    pub fn links(&self) -> &LinkSet {
        &self.links
    }

    /// Linked records, in link order
    pub fn resolved(&self) -> &[Record] {
        &self.resolved
    }

    /// The source and everything already linked to it
    pub fn exclusions(&self) -> HashSet<RecordId> {
        self.source_id()
            .into_iter()
            .chain(self.links.iter().map(|tag| tag.id()))
            .collect()
    }

    /// Drop records that cannot be offered as new links.
    pub fn filter_candidates(&self, records: Vec<Record>) -> Vec<Record> {
        let excluded = self.exclusions();
        records
            .into_iter()
            .filter(|r| !excluded.contains(&r.id))
            .collect()
    }

    fn resolved_matches_links(&self) -> bool {
        self.resolved.len() == self.links.len()
            && self.resolved.iter().all(|r| self.links.contains(r.id))
    }

    /// Resolve linked ids into records with one batch fetch.
    ///
    /// No request is made when the link set is empty or every linked record
    /// is already resolved. On failure the resolved list is cleared.
    pub async fn refresh_resolved<G: RecordGateway>(&mut self, gateway: &G) -> Result<()> {
        if self.links.is_empty() {
            self.resolved.clear();
            return Ok(());
        }
        if self.resolved_matches_links() {
            return Ok(());
        }

        let ids = self.links.ids();
        match gateway.fetch_records_by_ids(&ids).await {
            Ok(mut records) => {
                records.retain(|r| self.links.contains(r.id));
                records.sort_by_key(|r| ids.iter().position(|id| *id == r.id));
                self.resolved = records;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("error fetching linked tickets: {e}");
                self.resolved.clear();
                Err(e)
            }
        }
    }

    /// Tickets with a similar subject that are not yet linked.
    pub async fn similar_candidates<G: RecordGateway>(&self, gateway: &G) -> Result<Vec<Record>> {
        let subject = match self.source.as_ref().map(Record::subject) {
            Some(s) if !s.trim().is_empty() => s,
            _ => return Ok(Vec::new()),
        };

        // Ask for enough extra results to cover the ones filtered out below.
        let page_size = (SIMILAR_LIMIT + self.exclusions().len()) as u32;
        let page = gateway.search_by_text_paged(subject, page_size).await?;

        let mut candidates = self.filter_candidates(page.results);
        candidates.truncate(SIMILAR_LIMIT);
        Ok(candidates)
    }

    /// Link `target` to the source and mirror the result.
    pub async fn link<G: RecordGateway>(
        &mut self,
        engine: &SyncEngine<G>,
        target: Record,
        comment: Option<String>,
    ) -> Result<SyncReport> {
        let op = LinkOperation::link(self.source_id(), target.id, comment);
        let report = engine.execute(&op, &self.links).await?;

        self.links = report.source_links.clone();
        if !self.resolved.iter().any(|r| r.id == target.id) {
            self.resolved.push(target);
        }
        Ok(report)
    }

    /// Link by id alone, for callers that have not read the target.
    ///
    /// The engine's own read of the target fills the resolved list. When
    /// that read fell back, the link is still made and the record is left
    /// for the next [`refresh_resolved`](Self::refresh_resolved).
    pub async fn link_id<G: RecordGateway>(
        &mut self,
        engine: &SyncEngine<G>,
        target_id: RecordId,
        comment: Option<String>,
    ) -> Result<SyncReport> {
        let op = LinkOperation::link(self.source_id(), target_id, comment);
        let report = engine.execute(&op, &self.links).await?;

        self.links = report.source_links.clone();
        if let Some(target) = &report.target_record
            && !self.resolved.iter().any(|r| r.id == target_id)
        {
            self.resolved.push(target.clone());
        }
        Ok(report)
    }

    /// Unlink `target_id` from the source and mirror the result.
    pub async fn unlink<G: RecordGateway>(
        &mut self,
        engine: &SyncEngine<G>,
        target_id: RecordId,
    ) -> Result<SyncReport> {
        let op = LinkOperation::unlink(self.source_id(), target_id);
        let report = engine.execute(&op, &self.links).await?;

        self.links = report.source_links.clone();
        self.resolved.retain(|r| r.id != target_id);
        Ok(report)
    }
}
