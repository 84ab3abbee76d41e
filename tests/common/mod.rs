#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::Barrier;

use tether::gateway::{JobStatus, Record, RecordGateway, SearchPage, UpdateAck};
use tether::{RecordId, Result, TetherError};

pub const FIELD_ID: u64 = 12345;

/// One request seen by [`MockGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch(RecordId),
    FetchMany(Vec<RecordId>),
    Search(String),
    SearchPaged(String, u32),
    UpdatePair {
        source: RecordId,
        source_value: String,
        target: RecordId,
        target_value: String,
    },
    UpdateOne(RecordId, String),
    Comment(RecordId, String),
}

/// In-memory gateway that records every call and applies writes to its
/// own record table.
#[derive(Default)]
pub struct MockGateway {
    records: Mutex<HashMap<RecordId, Record>>,
    search_results: Mutex<Vec<Record>>,
    missing: Mutex<HashSet<RecordId>>,
    transient_failures: Mutex<HashMap<RecordId, u32>>,
    fail_updates: Mutex<bool>,
    fail_batch_fetch: Mutex<bool>,
    fail_comments_on: Mutex<HashSet<RecordId>>,
    queue_updates: Mutex<bool>,
    comment_barrier: Option<Arc<Barrier>>,
    calls: Mutex<Vec<Call>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, id: RecordId, subject: &str, link_field: &str) -> Self {
        self.insert(Record::new(id, subject).with_field(FIELD_ID, link_field));
        self
    }

    pub fn insert(&self, record: Record) {
        self.records.lock().unwrap().insert(record.id, record);
    }

    /// Fetches of `id` fail with `RecordNotFound`
    pub fn missing(self, id: RecordId) -> Self {
        self.missing.lock().unwrap().insert(id);
        self
    }

    /// The next `times` fetches of `id` fail with a 503
    pub fn flaky(self, id: RecordId, times: u32) -> Self {
        self.transient_failures.lock().unwrap().insert(id, times);
        self
    }

    pub fn failing_updates(self) -> Self {
        *self.fail_updates.lock().unwrap() = true;
        self
    }

    pub fn failing_batch_fetch(self) -> Self {
        *self.fail_batch_fetch.lock().unwrap() = true;
        self
    }

    pub fn failing_comments_on(self, id: RecordId) -> Self {
        self.fail_comments_on.lock().unwrap().insert(id);
        self
    }

    /// Pair updates are acknowledged as a queued background job
    pub fn queued_updates(self) -> Self {
        *self.queue_updates.lock().unwrap() = true;
        self
    }

    /// Each audit comment waits until the other one has been sent too, so
    /// comments posted one after the other never complete.
    pub fn comments_meet_at_barrier(mut self) -> Self {
        self.comment_barrier = Some(Arc::new(Barrier::new(2)));
        self
    }

    pub fn with_search_results(self, results: Vec<Record>) -> Self {
        *self.search_results.lock().unwrap() = results;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, id: RecordId) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == Call::Fetch(id))
            .count()
    }

    pub fn pair_updates(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::UpdatePair { .. }))
            .collect()
    }

    pub fn comments(&self) -> Vec<(RecordId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Comment(id, text) => Some((id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn comment_on(&self, id: RecordId) -> Option<String> {
        self.comments()
            .into_iter()
            .find(|(on, _)| *on == id)
            .map(|(_, text)| text)
    }

    /// Current stored value of the linked field
    pub fn field_of(&self, id: RecordId) -> String {
        self.records
            .lock()
            .unwrap()
            .get(&id)
            .map(|r| r.link_field(FIELD_ID).to_string())
            .unwrap_or_default()
    }

    fn record_call(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn write_field(&self, id: RecordId, value: &str) {
        let mut records = self.records.lock().unwrap();
        let record = records
            .remove(&id)
            .unwrap_or_else(|| Record::new(id, format!("Ticket {id}")));
        records.insert(id, record.with_field(FIELD_ID, value));
    }
}

fn unavailable() -> TetherError {
    TetherError::Api {
        status: 503,
        message: "Service Unavailable".to_string(),
    }
}

impl RecordGateway for MockGateway {
    async fn fetch_record(&self, id: RecordId) -> Result<Record> {
        self.record_call(Call::Fetch(id));

        if let Some(remaining) = self.transient_failures.lock().unwrap().get_mut(&id)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(unavailable());
        }
        if self.missing.lock().unwrap().contains(&id) {
            return Err(TetherError::RecordNotFound(id));
        }

        self.records
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(TetherError::RecordNotFound(id))
    }

    async fn fetch_records_by_ids(&self, ids: &[RecordId]) -> Result<Vec<Record>> {
        self.record_call(Call::FetchMany(ids.to_vec()));
        if *self.fail_batch_fetch.lock().unwrap() {
            return Err(unavailable());
        }

        // Reverse order: callers must not rely on request order
        let records = self.records.lock().unwrap();
        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| records.get(id).cloned())
            .collect())
    }

    async fn search_by_text(&self, query: &str) -> Result<SearchPage> {
        self.record_call(Call::Search(query.to_string()));
        let results = self.search_results.lock().unwrap().clone();
        Ok(SearchPage {
            count: Some(results.len() as u64),
            results,
            next_page: None,
            previous_page: None,
        })
    }

    async fn search_by_text_paged(&self, query: &str, page_size: u32) -> Result<SearchPage> {
        self.record_call(Call::SearchPaged(query.to_string(), page_size));
        let mut results = self.search_results.lock().unwrap().clone();
        let has_more = results.len() > page_size as usize;
        results.truncate(page_size as usize);
        Ok(SearchPage {
            results,
            count: None,
            next_page: has_more
                .then(|| "https://example.zendesk.com/api/v2/search/export.json?page%5Bafter%5D=c1".to_string()),
            previous_page: None,
        })
    }

    async fn update_link_fields_for_pair(
        &self,
        source_id: RecordId,
        source_value: &str,
        target_id: RecordId,
        target_value: &str,
    ) -> Result<UpdateAck> {
        self.record_call(Call::UpdatePair {
            source: source_id,
            source_value: source_value.to_string(),
            target: target_id,
            target_value: target_value.to_string(),
        });
        if *self.fail_updates.lock().unwrap() {
            return Err(TetherError::Api {
                status: 422,
                message: "Record validation errors".to_string(),
            });
        }

        self.write_field(source_id, source_value);
        self.write_field(target_id, target_value);

        let job = self.queue_updates.lock().unwrap().then(|| JobStatus {
            id: "job-1".to_string(),
            status: Some("queued".to_string()),
            url: None,
        });
        Ok(UpdateAck { job })
    }

    async fn update_link_field(&self, id: RecordId, value: &str) -> Result<UpdateAck> {
        self.record_call(Call::UpdateOne(id, value.to_string()));
        self.write_field(id, value);
        Ok(UpdateAck::default())
    }

    async fn append_audit_comment(&self, id: RecordId, text: &str) -> Result<UpdateAck> {
        self.record_call(Call::Comment(id, text.to_string()));
        if let Some(barrier) = &self.comment_barrier {
            barrier.wait().await;
        }
        if self.fail_comments_on.lock().unwrap().contains(&id) {
            return Err(unavailable());
        }
        Ok(UpdateAck::default())
    }
}
