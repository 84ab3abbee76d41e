//! Remote record access.
//!
//! Calls go straight to the platform with no local caching and no retries;
//! retry and fallback decisions belong to the caller.

pub mod types;
pub mod zendesk;

pub use types::{CustomField, JobStatus, Record, RecordStatus, SearchPage, UpdateAck};
pub use zendesk::ZendeskGateway;

use std::future::Future;

use crate::error::Result;
use crate::link::RecordId;

/// Default page size for [`RecordGateway::search_by_text_paged`]
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Common interface for the ticketing platform
pub trait RecordGateway: Send + Sync {
    /// Fetch one record. Fails with `RecordNotFound` for unknown ids.
    fn fetch_record(&self, id: RecordId) -> impl Future<Output = Result<Record>> + Send;

    /// Fetch several records, batched as the platform allows (100 ids per
    /// request on Zendesk). The platform may return a subset, in any order.
    fn fetch_records_by_ids(
        &self,
        ids: &[RecordId],
    ) -> impl Future<Output = Result<Vec<Record>>> + Send;

    /// Free-text ticket search
    fn search_by_text(&self, query: &str) -> impl Future<Output = Result<SearchPage>> + Send;

    /// Free-text ticket search asking the platform for at most `page_size`
    /// results. Only the first page is returned.
    fn search_by_text_paged(
        &self,
        query: &str,
        page_size: u32,
    ) -> impl Future<Output = Result<SearchPage>> + Send;

    /// Write the linked field of two records in one batched request.
    fn update_link_fields_for_pair(
        &self,
        source_id: RecordId,
        source_value: &str,
        target_id: RecordId,
        target_value: &str,
    ) -> impl Future<Output = Result<UpdateAck>> + Send;

    /// Write the linked field of a single record.
    fn update_link_field(
        &self,
        id: RecordId,
        value: &str,
    ) -> impl Future<Output = Result<UpdateAck>> + Send;

    /// Append an internal (non-public) comment.
    fn append_audit_comment(
        &self,
        id: RecordId,
        text: &str,
    ) -> impl Future<Output = Result<UpdateAck>> + Send;
}
