//! Builders for the events porch publishes: reactions and replies.

use porch_common::models::{Event, Kind};

use crate::signatures::UnsignedEvent;

// ── Reaction ──────────────────────────────────────────────────────────────────

/// A reaction to `target`. Content defaults to `+` (a like).
#[derive(Debug, Clone)]
pub struct ReactionBuilder<'a> {
    target: &'a Event,
    content: String,
    relay_hint: Option<String>,
}

impl<'a> ReactionBuilder<'a> {
    pub fn new(target: &'a Event) -> Self {
        Self { target, content: "+".into(), relay_hint: None }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn relay_hint(mut self, relay: Option<&str>) -> Self {
        self.relay_hint = relay.map(str::to_owned);
        self
    }

    pub fn build(self) -> UnsignedEvent {
        let mut e_tag = vec!["e".to_owned(), self.target.id.clone()];
        if let Some(relay) = self.relay_hint {
            e_tag.push(relay);
        }
        let tags = vec![
            e_tag,
            vec!["p".to_owned(), self.target.pubkey.clone()],
            vec!["k".to_owned(), self.target.kind.0.to_string()],
        ];
        UnsignedEvent::new(Kind::REACTION, tags, self.content)
    }
}

// ── Reply ─────────────────────────────────────────────────────────────────────

/// A text note replying to `target`, with marked `e` tags.
///
/// Replying to a top-level note marks it `root`. Replying to a reply keeps the
/// thread's root and marks the target as `reply`.
#[derive(Debug, Clone)]
pub struct ReplyBuilder<'a> {
    target: &'a Event,
    text: String,
    relay_hint: Option<String>,
}

impl<'a> ReplyBuilder<'a> {
    pub fn new(target: &'a Event, text: impl Into<String>) -> Self {
        Self { target, text: text.into(), relay_hint: None }
    }

    pub fn relay_hint(mut self, relay: Option<&str>) -> Self {
        self.relay_hint = relay.map(str::to_owned);
        self
    }

    pub fn build(self) -> UnsignedEvent {
        let relay = self.relay_hint.unwrap_or_default();
        let root = self
            .target
            .tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some("e") && t.get(3).map(String::as_str) == Some("root"))
            .and_then(|t| t.get(1).cloned());

        let mut tags = match root {
            Some(root_id) => vec![
                vec!["e".to_owned(), root_id, relay.clone(), "root".to_owned()],
                vec!["e".to_owned(), self.target.id.clone(), relay, "reply".to_owned()],
            ],
            None => vec![vec!["e".to_owned(), self.target.id.clone(), relay, "root".to_owned()]],
        };

        tags.push(vec!["p".to_owned(), self.target.pubkey.clone()]);
        for p in self.target.tag_values("p") {
            if !tags.iter().any(|t| t[0] == "p" && t[1] == p) {
                tags.push(vec!["p".to_owned(), p.to_owned()]);
            }
        }

        UnsignedEvent::new(Kind::TEXT_NOTE, tags, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::verify;
    use porch_common::Keypair;

    fn post(author: &Keypair) -> Event {
        UnsignedEvent::new(Kind::TEXT_NOTE, vec![], "gm").sign(&author.secret).unwrap()
    }

    #[test]
    fn reaction_points_at_target() {
        let author = Keypair::generate();
        let target = post(&author);
        let reactor = Keypair::generate();

        let like = ReactionBuilder::new(&target).build().sign(&reactor.secret).unwrap();
        assert_eq!(like.kind, Kind::REACTION);
        assert!(like.is_like());
        assert!(like.references(&target.id));
        assert_eq!(like.tag_values("p").next(), Some(author.public.to_hex().as_str()));
        assert!(verify(&like));
    }

    #[test]
    fn reply_to_top_level_note_marks_root() {
        let author = Keypair::generate();
        let target = post(&author);

        let reply = ReplyBuilder::new(&target, "hi")
            .relay_hint(Some("wss://relay.example"))
            .build()
            .sign(&Keypair::generate().secret)
            .unwrap();
        assert_eq!(reply.tags[0], vec!["e", target.id.as_str(), "wss://relay.example", "root"]);
        assert!(reply.references(&target.id));
        assert_eq!(reply.content, "hi");
    }

    #[test]
    fn reply_to_reply_keeps_thread_root() {
        let root_author = Keypair::generate();
        let root = post(&root_author);
        let first = ReplyBuilder::new(&root, "one").build().sign(&Keypair::generate().secret).unwrap();
        let second = ReplyBuilder::new(&first, "two").build().sign(&Keypair::generate().secret).unwrap();

        assert_eq!(second.tags[0][1], root.id);
        assert_eq!(second.tags[0][3], "root");
        assert_eq!(second.tags[1][1], first.id);
        assert_eq!(second.tags[1][3], "reply");
        // Both authors are notified.
        assert_eq!(second.tag_values("p").count(), 2);
    }
}
