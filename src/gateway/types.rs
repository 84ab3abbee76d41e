//! Zendesk ticket data as returned by the REST API.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::link::{LinkSet, RecordId, decode};

/// A Zendesk ticket, reduced to the fields tether reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
}

impl Record {
    pub fn new(id: RecordId, subject: impl Into<String>) -> Self {
        Self {
            id,
            subject: Some(subject.into()),
            description: None,
            status: RecordStatus::default(),
            priority: None,
            created_at: None,
            updated_at: None,
            custom_fields: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    /// Set a string custom field, replacing any existing entry for `field_id`.
    pub fn with_field(mut self, field_id: u64, value: impl Into<String>) -> Self {
        self.custom_fields.retain(|f| f.id != field_id);
        self.custom_fields.push(CustomField {
            id: field_id,
            value: serde_json::Value::String(value.into()),
        });
        self
    }

    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }

    /// Raw value of the linked-tickets field. Missing, null and non-string
    /// values all read as "".
    pub fn link_field(&self, field_id: u64) -> &str {
        self.custom_fields
            .iter()
            .find(|f| f.id == field_id)
            .and_then(|f| f.value.as_str())
            .unwrap_or("")
    }

    pub fn links(&self, field_id: u64) -> LinkSet {
        decode(self.link_field(field_id))
    }
}

/// One entry of a ticket's `custom_fields` array. Zendesk returns strings,
/// arrays (multi-select) or null depending on the field type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: u64,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Ticket status. Values Zendesk adds later are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordStatus {
    #[default]
    New,
    Open,
    Pending,
    Hold,
    Solved,
    Closed,
    Other(String),
}

impl RecordStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RecordStatus::New => "new",
            RecordStatus::Open => "open",
            RecordStatus::Pending => "pending",
            RecordStatus::Hold => "hold",
            RecordStatus::Solved => "solved",
            RecordStatus::Closed => "closed",
            RecordStatus::Other(s) => s,
        }
    }
}

impl From<String> for RecordStatus {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "new" => RecordStatus::New,
            "open" => RecordStatus::Open,
            "pending" => RecordStatus::Pending,
            "hold" | "on-hold" => RecordStatus::Hold,
            "solved" => RecordStatus::Solved,
            "closed" => RecordStatus::Closed,
            _ => RecordStatus::Other(s),
        }
    }
}

impl From<RecordStatus> for String {
    fn from(status: RecordStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First page of a search. Cursors are exposed but never followed.
///
/// `search.json` returns offset cursors as `next_page`/`previous_page`;
/// `search/export.json` returns them under `links.next`/`links.prev` with
/// `meta.has_more`. Both shapes land in the same two fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SearchPageWire")]
pub struct SearchPage {
    pub results: Vec<Record>,
    pub count: Option<u64>,
    pub next_page: Option<String>,
    pub previous_page: Option<String>,
}

#[derive(Deserialize)]
struct SearchPageWire {
    #[serde(default)]
    results: Vec<Record>,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    next_page: Option<String>,
    #[serde(default)]
    previous_page: Option<String>,
    #[serde(default)]
    meta: Option<ExportMeta>,
    #[serde(default)]
    links: Option<ExportLinks>,
}

#[derive(Deserialize)]
struct ExportMeta {
    #[serde(default)]
    has_more: Option<bool>,
}

#[derive(Deserialize)]
struct ExportLinks {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    prev: Option<String>,
}

impl From<SearchPageWire> for SearchPage {
    fn from(wire: SearchPageWire) -> Self {
        let has_more = wire.meta.and_then(|m| m.has_more).unwrap_or(true);
        let (next, prev) = match wire.links {
            Some(links) => (links.next.filter(|_| has_more), links.prev),
            None => (None, None),
        };
        Self {
            results: wire.results,
            count: wire.count,
            next_page: wire.next_page.or(next),
            previous_page: wire.previous_page.or(prev),
        }
    }
}

/// Background job Zendesk queues for bulk updates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Acknowledgement of an accepted write.
///
/// `job` is set when Zendesk queued the write instead of applying it inline
/// (bulk updates), in which case both sides land when the job runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAck {
    #[serde(default, rename = "job_status")]
    pub job: Option<JobStatus>,
}
