//! Custom field text <-> [`LinkSet`].
//!
//! Decoding is lenient: tokens that are not `link:<positive integer>` are
//! dropped without error. Encoding joins tags with `,` in set order, and the
//! empty set encodes to the empty string.

use super::set::{LinkSet, LinkTag};

/// Decode a raw field value such as `"link:123, link:456"`.
pub fn decode(raw: &str) -> LinkSet {
    decode_tokens(raw.split(','))
}

/// Decode an already-split token list, as handed over by the host panel.
pub fn decode_tokens<'a, I>(tokens: I) -> LinkSet
where
    I: IntoIterator<Item = &'a str>,
{
    tokens
        .into_iter()
        .filter_map(|token| LinkTag::parse(token.trim()))
        .map(|tag| tag.id())
        .collect()
}

/// Encode a set back into the field representation.
pub fn encode(set: &LinkSet) -> String {
    set.iter()
        .map(LinkTag::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
