//! Event model: the unit of content on the network.
//!
//! Posts, reactions, reposts, replies, profile metadata and zap receipts are all
//! events, told apart by [`Kind`]. Ids, keys and signatures travel as lowercase hex.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Numeric event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(pub u32);

impl Kind {
    /// Profile metadata (JSON content).
    pub const METADATA: Kind = Kind(0);
    /// Short text note; a reply when it carries an `e` tag.
    pub const TEXT_NOTE: Kind = Kind(1);
    pub const REPOST: Kind = Kind(6);
    /// Reaction; `+` (or an emoji) is a like, `-` a dislike.
    pub const REACTION: Kind = Kind(7);
    pub const ZAP_RECEIPT: Kind = Kind(9735);
}

/// A signed event as it travels between relays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// SHA-256 of the canonical serialization, hex.
    pub id: String,
    /// Author x-only public key, hex.
    pub pubkey: String,
    /// Unix seconds.
    pub created_at: i64,
    pub kind: Kind,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    /// Schnorr signature over `id`, hex.
    pub sig: String,
}

impl Event {
    /// Values of every tag named `name` (the element right after the name).
    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |t| t.first().map(String::as_str) == Some(name))
            .filter_map(|t| t.get(1).map(String::as_str))
    }

    /// Whether this event points at `event_id` through an `e` tag.
    pub fn references(&self, event_id: &str) -> bool {
        self.tag_values("e").any(|v| v.eq_ignore_ascii_case(event_id))
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created_at, 0).single()
    }

    /// A reaction counts as a like unless it is an explicit dislike.
    pub fn is_like(&self) -> bool {
        self.kind == Kind::REACTION && self.content.trim() != "-"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: Kind, tags: Vec<Vec<String>>, content: &str) -> Event {
        Event {
            id: "00".repeat(32),
            pubkey: "11".repeat(32),
            created_at: 1_700_000_000,
            kind,
            tags,
            content: content.into(),
            sig: "22".repeat(64),
        }
    }

    #[test]
    fn references_matches_e_tags_only() {
        let target = "ab".repeat(32);
        let ev = event(
            Kind::TEXT_NOTE,
            vec![
                vec!["p".into(), target.clone()],
                vec!["e".into(), target.to_uppercase(), "".into(), "root".into()],
            ],
            "hi",
        );
        assert!(ev.references(&target));
        assert!(!ev.references(&"cd".repeat(32)));
        assert_eq!(ev.tag_values("p").count(), 1);
    }

    #[test]
    fn dislike_is_not_a_like() {
        assert!(event(Kind::REACTION, vec![], "+").is_like());
        assert!(event(Kind::REACTION, vec![], "🔥").is_like());
        assert!(!event(Kind::REACTION, vec![], "-").is_like());
        assert!(!event(Kind::TEXT_NOTE, vec![], "+").is_like());
    }

    #[test]
    fn kind_serializes_as_number() {
        let json = serde_json::to_value(event(Kind::REACTION, vec![], "+")).unwrap();
        assert_eq!(json["kind"], 7);
        assert!(event(Kind::METADATA, vec![], "{}").created_at_utc().is_some());
    }
}
