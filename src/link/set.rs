use std::collections::HashSet;
use std::fmt;

use super::RecordId;

/// One `link:<id>` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkTag(RecordId);

impl LinkTag {
    pub const PREFIX: &'static str = "link:";

    pub fn new(id: RecordId) -> Self {
        LinkTag(id)
    }

    pub fn id(&self) -> RecordId {
        self.0
    }

    /// Parse a single trimmed token. Returns `None` for anything that is not
    /// `link:` followed by a positive base-10 integer.
    pub fn parse(token: &str) -> Option<Self> {
        let digits = token.strip_prefix(Self::PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match digits.parse::<RecordId>() {
            Ok(id) if id > 0 => Some(LinkTag(id)),
            _ => None,
        }
    }
}

impl fmt::Display for LinkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

/// Ordered, duplicate-free set of link tags.
///
/// Order is insertion order so the encoded field value stays stable across
/// edits; `ids` mirrors `tags` for membership checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    tags: Vec<LinkTag>,
    ids: HashSet<RecordId>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkTag> {
        self.tags.iter()
    }

    /// Identifiers in field order
    pub fn ids(&self) -> Vec<RecordId> {
        self.tags.iter().map(LinkTag::id).collect()
    }

    /// Append if absent; returns whether the set changed.
    fn push(&mut self, id: RecordId) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        self.tags.push(LinkTag::new(id));
        true
    }
}

impl FromIterator<RecordId> for LinkSet {
    fn from_iter<I: IntoIterator<Item = RecordId>>(iter: I) -> Self {
        let mut set = LinkSet::new();
        for id in iter {
            set.push(id);
        }
        set
    }
}

impl fmt::Display for LinkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::encode(self))
    }
}

/// The set with `id` appended, or an unchanged copy if it is already a member.
pub fn add_member(set: &LinkSet, id: RecordId) -> LinkSet {
    let mut next = set.clone();
    next.push(id);
    next
}

/// The set without `id`. Removing a non-member is a no-op.
pub fn remove_member(set: &LinkSet, id: RecordId) -> LinkSet {
    if !set.contains(id) {
        return set.clone();
    }
    set.tags
        .iter()
        .map(LinkTag::id)
        .filter(|&member| member != id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(ids: &[RecordId]) -> LinkSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_tag_parse() {
        assert_eq!(LinkTag::parse("link:123"), Some(LinkTag::new(123)));
        assert_eq!(LinkTag::parse("link:"), None);
        assert_eq!(LinkTag::parse("link:0"), None);
        assert_eq!(LinkTag::parse("link:-4"), None);
        assert_eq!(LinkTag::parse("link:12abc"), None);
        assert_eq!(LinkTag::parse("link: 12"), None);
        assert_eq!(LinkTag::parse("LINK:12"), None);
        assert_eq!(LinkTag::parse("12"), None);
        assert_eq!(LinkTag::parse("link:99999999999999999999999"), None);
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(LinkTag::new(456).to_string(), "link:456");
    }

    #[test]
    fn test_from_iter_drops_duplicates_keeping_first() {
        let set = set_of(&[3, 1, 3, 2, 1]);
        assert_eq!(set.ids(), vec![3, 1, 2]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_add_member_appends() {
        let set = set_of(&[100, 200]);
        let next = add_member(&set, 1);
        assert_eq!(next.ids(), vec![100, 200, 1]);
        assert_eq!(set.ids(), vec![100, 200], "input is not mutated");
    }

    #[test]
    fn test_add_member_is_idempotent() {
        let set = set_of(&[5, 6]);
        let once = add_member(&set, 6);
        assert_eq!(once, set);
        let twice = add_member(&add_member(&set, 9), 9);
        assert_eq!(twice, add_member(&set, 9));
    }

    #[test]
    fn test_remove_member() {
        let set = set_of(&[1, 2, 3]);
        assert_eq!(remove_member(&set, 2).ids(), vec![1, 3]);
        assert_eq!(remove_member(&set, 42), set);
        assert!(remove_member(&set_of(&[7]), 7).is_empty());
    }

    #[test]
    fn test_add_then_remove_restores_original_order() {
        let cases: [&[RecordId]; 4] = [&[], &[1], &[9, 4, 7], &[10, 20, 30, 40]];
        for ids in cases {
            let set = set_of(ids);
            let id = 555;
            assert!(!set.contains(id));
            assert_eq!(remove_member(&add_member(&set, id), id), set);
        }
    }

    #[test]
    fn test_membership_tracks_tags() {
        let set = remove_member(&add_member(&set_of(&[1, 2]), 3), 1);
        assert!(!set.contains(1));
        assert!(set.contains(2));
        assert!(set.contains(3));
    }
}
