//! The merged view of one post, rebuilt on every load or refresh.

use std::collections::HashSet;

use porch_common::models::{Event, Kind, Profile};
use porch_relay::ContentId;
use serde::Serialize;

use crate::content::ParsedBody;

/// Network tallies for a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReactionCounts {
    pub likes: usize,
    pub reposts: usize,
    pub zaps: usize,
    pub replies: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentSnapshot {
    pub content_id: ContentId,
    pub event: Event,
    /// `None` when the author has no profile or it could not be fetched.
    pub author_profile: Option<Profile>,
    /// Network tallies, with the current identity's own like counted exactly once.
    pub reaction_counts: ReactionCounts,
    pub parsed_body: ParsedBody,
    pub is_author_verified: bool,
    /// Replies to the post, newest first.
    pub network_replies: Vec<Event>,
    pub is_liked_by_current_identity: bool,
    pub is_saved: bool,
    /// The current identity's own replies, newest first.
    pub current_identity_replies: Vec<Event>,
}

impl ContentSnapshot {
    /// Relays to publish follow-up events to.
    pub fn relay_hints(&self) -> &[String] {
        &self.content_id.relays
    }
}

/// Distinct authors of liking reactions (`-` is a dislike and doesn't count).
pub(crate) fn like_authors(reactions: &[Event]) -> HashSet<String> {
    reactions
        .iter()
        .filter(|e| e.is_like())
        .map(|e| e.pubkey.to_lowercase())
        .collect()
}

/// Distinct authors of reposts.
pub(crate) fn repost_count(reposts: &[Event]) -> usize {
    reposts
        .iter()
        .filter(|e| e.kind == Kind::REPOST)
        .map(|e| e.pubkey.to_lowercase())
        .collect::<HashSet<_>>()
        .len()
}

/// Distinct zap receipts.
pub(crate) fn zap_count(receipts: &[Event]) -> usize {
    receipts
        .iter()
        .filter(|e| e.kind == Kind::ZAP_RECEIPT)
        .map(|e| e.id.to_lowercase())
        .collect::<HashSet<_>>()
        .len()
}

/// Newest first, one entry per id.
pub(crate) fn dedupe_newest_first(events: impl IntoIterator<Item = Event>) -> Vec<Event> {
    let mut seen = HashSet::new();
    let mut out: Vec<Event> = events
        .into_iter()
        .filter(|e| seen.insert(e.id.to_lowercase()))
        .collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, pubkey: &str, kind: Kind, content: &str, created_at: i64) -> Event {
        Event {
            id: id.into(),
            pubkey: pubkey.into(),
            created_at,
            kind,
            tags: vec![],
            content: content.into(),
            sig: String::new(),
        }
    }

    #[test]
    fn likes_count_distinct_authors_without_dislikes() {
        let reactions = vec![
            event("1", "alice", Kind::REACTION, "+", 1),
            event("2", "alice", Kind::REACTION, "🤙", 2),
            event("3", "bob", Kind::REACTION, "-", 3),
            event("4", "carol", Kind::REACTION, "", 4),
        ];
        let authors = like_authors(&reactions);
        assert_eq!(authors.len(), 2);
        assert!(authors.contains("alice") && authors.contains("carol"));
    }

    #[test]
    fn reposts_and_zaps() {
        let events = vec![
            event("1", "a", Kind::REPOST, "", 1),
            event("2", "a", Kind::REPOST, "", 2),
            event("3", "b", Kind::REPOST, "", 3),
        ];
        assert_eq!(repost_count(&events), 2);

        let zaps = vec![event("z1", "lnurl", Kind::ZAP_RECEIPT, "", 1), event("z2", "lnurl", Kind::ZAP_RECEIPT, "", 1)];
        assert_eq!(zap_count(&zaps), 2);
    }

    #[test]
    fn dedupe_orders_newest_first() {
        let out = dedupe_newest_first(vec![
            event("a", "x", Kind::TEXT_NOTE, "old", 1),
            event("b", "x", Kind::TEXT_NOTE, "new", 5),
            event("A", "x", Kind::TEXT_NOTE, "dup", 9),
        ]);
        assert_eq!(out.iter().map(|e| e.content.as_str()).collect::<Vec<_>>(), ["new", "old"]);
    }
}
