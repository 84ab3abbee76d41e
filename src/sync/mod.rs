//! Link synchronization.
//!
//! One link or unlink transaction runs through these phases:
//!
//! ```text
//! Idle -> Reading -> Computing -> Persisting -> Annotating -> Done
//!            \-> FailedReadFallback -/
//! ```
//!
//! - A missing source id fails with `SourceUnavailable` before any request.
//! - A failed target read is absorbed: the target is treated as having no
//!   links and the transaction continues.
//! - A failed dual update fails the transaction with `PersistFailed`.
//! - Audit comments go out concurrently after the update; their failure is
//!   reported in the [`SyncReport`] and never undoes the update.

mod symmetry;

pub use symmetry::{SymmetryReport, check_symmetry, repair_one_way};

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::{Result, TetherError};
use crate::gateway::{Record, RecordGateway, UpdateAck};
use crate::link::{LinkSet, RecordId, add_member, encode, remove_member};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Link,
    Unlink,
}

impl LinkKind {
    /// Past tense used in audit comments
    pub fn verb(&self) -> &'static str {
        match self {
            LinkKind::Link => "Linked",
            LinkKind::Unlink => "Unlinked",
        }
    }

    pub fn progressive(&self) -> &'static str {
        match self {
            LinkKind::Link => "linking",
            LinkKind::Unlink => "unlinking",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKind::Link => write!(f, "link"),
            LinkKind::Unlink => write!(f, "unlink"),
        }
    }
}

/// A single requested link change. Lives for one [`SyncEngine::execute`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOperation {
    /// Current record; `None` when the host has not provided one yet
    pub source: Option<RecordId>,
    pub target: RecordId,
    pub kind: LinkKind,
    /// Free text appended to link audit comments
    pub comment: Option<String>,
}

impl LinkOperation {
    pub fn link(source: Option<RecordId>, target: RecordId, comment: Option<String>) -> Self {
        Self {
            source,
            target,
            kind: LinkKind::Link,
            comment,
        }
    }

    pub fn unlink(source: Option<RecordId>, target: RecordId) -> Self {
        Self {
            source,
            target,
            kind: LinkKind::Unlink,
            comment: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Reading,
    FailedReadFallback,
    Computing,
    Persisting,
    Annotating,
    Done,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Reading => "reading",
            SyncPhase::FailedReadFallback => "failed_read_fallback",
            SyncPhase::Computing => "computing",
            SyncPhase::Persisting => "persisting",
            SyncPhase::Annotating => "annotating",
            SyncPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// How hard to try reading the target record before falling back to an
/// empty link set. Only transient errors are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl ReadPolicy {
    /// Single attempt, no retry
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Where the target's pre-transaction link set came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRead {
    Fetched,
    /// The read failed and an empty set was assumed
    Fallback { error: String },
}

/// Outcome of a persisted transaction.
#[derive(Debug)]
pub struct SyncReport {
    pub kind: LinkKind,
    pub source: RecordId,
    pub target: RecordId,
    /// Source link set as written
    pub source_links: LinkSet,
    /// Target link set as written
    pub target_links: LinkSet,
    pub target_read: TargetRead,
    /// The target as read before the update; `None` after a fallback
    pub target_record: Option<Record>,
    pub ack: UpdateAck,
    /// Set when one or both audit comments failed
    pub annotation_error: Option<TetherError>,
    /// Phases visited, in order
    pub trail: Vec<SyncPhase>,
}

impl SyncReport {
    pub fn fully_annotated(&self) -> bool {
        self.annotation_error.is_none()
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self.target_read, TargetRead::Fallback { .. })
    }
}

/// Audit comment text written on a record about `other`.
pub fn audit_comment(kind: LinkKind, other: RecordId, comment: Option<&str>) -> String {
    let mut text = format!("{} ticket #{}.", kind.verb(), other);
    if kind == LinkKind::Link
        && let Some(comment) = comment.map(str::trim).filter(|c| !c.is_empty())
    {
        text.push_str("\n\nComment: ");
        text.push_str(comment);
    }
    text
}

/// Runs link transactions against a [`RecordGateway`].
///
/// The engine holds no per-transaction state; callers must not run two
/// transactions for the same record pair at once.
pub struct SyncEngine<G> {
    gateway: G,
    field_id: u64,
    read_policy: ReadPolicy,
}

impl<G: RecordGateway> SyncEngine<G> {
    pub fn new(gateway: G, field_id: u64) -> Self {
        Self {
            gateway,
            field_id,
            read_policy: ReadPolicy::default(),
        }
    }

    pub fn with_read_policy(mut self, read_policy: ReadPolicy) -> Self {
        self.read_policy = read_policy;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn field_id(&self) -> u64 {
        self.field_id
    }

    /// Run one transaction. `source_links` is the caller's mirrored link set
    /// for the source record.
    pub async fn execute(&self, op: &LinkOperation, source_links: &LinkSet) -> Result<SyncReport> {
        let mut trail = vec![SyncPhase::Idle];

        let Some(source) = op.source else {
            tracing::error!(target_id = op.target, kind = %op.kind, "current ticket id not available");
            return Err(TetherError::SourceUnavailable);
        };
        if source == op.target {
            return Err(TetherError::SelfLink(source));
        }

        trail.push(SyncPhase::Reading);
        tracing::debug!(source, target_id = op.target, kind = %op.kind, "reading target links");
        let (current_target, target_read, target_record) = match self.read_target(op.target).await {
            Ok(record) => (record.links(self.field_id), TargetRead::Fetched, Some(record)),
            Err(e) => {
                tracing::warn!(
                    target_id = op.target,
                    "error fetching target ticket linked field, assuming no links: {e}"
                );
                trail.push(SyncPhase::FailedReadFallback);
                (
                    LinkSet::new(),
                    TargetRead::Fallback {
                        error: e.to_string(),
                    },
                    None,
                )
            }
        };

        trail.push(SyncPhase::Computing);
        let (source_links, target_links) = match op.kind {
            LinkKind::Link => (
                add_member(source_links, op.target),
                add_member(&current_target, source),
            ),
            LinkKind::Unlink => (
                remove_member(source_links, op.target),
                remove_member(&current_target, source),
            ),
        };

        trail.push(SyncPhase::Persisting);
        let source_value = encode(&source_links);
        let target_value = encode(&target_links);
        tracing::debug!(source, %source_value, target_id = op.target, %target_value, "updating linked fields");
        let ack = self
            .gateway
            .update_link_fields_for_pair(source, &source_value, op.target, &target_value)
            .await
            .map_err(|e| {
                tracing::error!(source, target_id = op.target, "error {} ticket: {e}", op.kind.progressive());
                TetherError::PersistFailed {
                    kind: op.kind,
                    target: op.target,
                    source: Box::new(e),
                }
            })?;
        if let Some(job) = &ack.job {
            tracing::info!(job_id = %job.id, "linked field update queued");
        }

        trail.push(SyncPhase::Annotating);
        let annotation_error = self.annotate(source, op).await.err();

        trail.push(SyncPhase::Done);
        tracing::info!(source, target_id = op.target, kind = %op.kind, "successfully {} ticket", op.kind.verb().to_lowercase());

        Ok(SyncReport {
            kind: op.kind,
            source,
            target: op.target,
            source_links,
            target_links,
            target_read,
            target_record,
            ack,
            annotation_error,
            trail,
        })
    }

    async fn read_target(&self, target: RecordId) -> Result<Record> {
        let mut attempt = 0;
        loop {
            match self.gateway.fetch_record(target).await {
                Ok(record) => return Ok(record),
                Err(e) if e.is_transient() && attempt < self.read_policy.retries => {
                    attempt += 1;
                    tracing::debug!(target_id = target, attempt, "retrying target read: {e}");
                    tokio::time::sleep(self.read_policy.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Post both audit comments concurrently and wait for both.
    async fn annotate(&self, source: RecordId, op: &LinkOperation) -> Result<()> {
        let comment = op.comment.as_deref();
        let on_source = audit_comment(op.kind, op.target, comment);
        let on_target = audit_comment(op.kind, source, comment);

        let (source_result, target_result) = futures::future::join(
            self.gateway.append_audit_comment(source, &on_source),
            self.gateway.append_audit_comment(op.target, &on_target),
        )
        .await;

        let failures: Vec<String> = [(source, source_result), (op.target, target_result)]
            .into_iter()
            .filter_map(|(id, result)| result.err().map(|e| format!("#{id}: {e}")))
            .collect();

        if failures.is_empty() {
            return Ok(());
        }

        let error = TetherError::AnnotationFailed(failures.join("; "));
        tracing::warn!("{error}");
        Err(error)
    }
}
