//! Linked-ticket field representation.
//!
//! A record's links live in one custom field as a comma-separated list of
//! `link:<id>` tokens. [`codec`] converts between that text and a [`LinkSet`];
//! [`set`] holds the membership type and the pure add/remove operations.

pub mod codec;
pub mod set;

pub use codec::{decode, decode_tokens, encode};
pub use set::{LinkSet, LinkTag, add_member, remove_member};

/// Zendesk ticket identifier
pub type RecordId = u64;

/// Parse a user-supplied ticket identifier such as `123` or `#123`.
pub fn parse_record_id(s: &str) -> crate::error::Result<RecordId> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    match digits.parse::<RecordId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(crate::error::TetherError::InvalidRecordId(s.to_string())),
    }
}
