//! In-process relay.
//!
//! Holds events in memory and answers filters exactly like a remote relay would,
//! with switches for the failures a real network produces: a query kind that
//! errors, a lookup that errors or is slow, and a publish that errors.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use porch_common::models::{Event, Kind};
use tracing::debug;

use crate::{client::RelayClient, error::RelayError, signatures, types::Filter};

const RELAY_NAME: &str = "memory";

#[derive(Debug, Default)]
pub struct MemoryRelay {
    events: Mutex<Vec<Event>>,
    failing_kinds: Mutex<HashSet<Kind>>,
    fetch_delays: Mutex<HashMap<String, Duration>>,
    fetch_failing: AtomicBool,
    publish_failing: AtomicBool,
    published: AtomicUsize,
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an event as if some other client had published it.
    pub fn insert(&self, event: Event) {
        let mut events = locked(&self.events);
        if !events.iter().any(|e| e.id == event.id) {
            events.push(event);
        }
    }

    pub fn events(&self) -> Vec<Event> {
        locked(&self.events).clone()
    }

    /// Number of events accepted through [`RelayClient::publish`].
    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }

    /// Make any query that asks for `kind` fail.
    pub fn set_kind_failing(&self, kind: Kind, failing: bool) {
        let mut kinds = locked(&self.failing_kinds);
        if failing {
            kinds.insert(kind);
        } else {
            kinds.remove(&kind);
        }
    }

    /// Make lookups by id fail.
    pub fn set_fetch_failing(&self, failing: bool) {
        self.fetch_failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_publish_failing(&self, failing: bool) {
        self.publish_failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every lookup of `id` by `delay`.
    pub fn set_fetch_delay(&self, id: &str, delay: Duration) {
        locked(&self.fetch_delays).insert(id.to_owned(), delay);
    }

    fn unavailable(message: &str) -> RelayError {
        RelayError::Connection { relay: RELAY_NAME.into(), message: message.into() }
    }
}

#[async_trait]
impl RelayClient for MemoryRelay {
    async fn query_matching(
        &self,
        filter: &Filter,
        _relay_hints: &[String],
    ) -> Result<Vec<Event>, RelayError> {
        if let Some(kinds) = &filter.kinds {
            let failing = locked(&self.failing_kinds);
            if kinds.iter().any(|k| failing.contains(k)) {
                return Err(Self::unavailable("query failed"));
            }
        }
        if filter.ids.is_some() && self.fetch_failing.load(Ordering::SeqCst) {
            return Err(Self::unavailable("lookup failed"));
        }

        let mut matched: Vec<Event> =
            locked(&self.events).iter().filter(|e| filter.matches(e)).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        debug!("Memory relay matched {} event(s)", matched.len());
        Ok(matched)
    }

    async fn publish(&self, event: &Event, _relay_hints: &[String]) -> Result<bool, RelayError> {
        if self.publish_failing.load(Ordering::SeqCst) {
            return Err(Self::unavailable("publish failed"));
        }
        if !signatures::verify(event) {
            debug!("Memory relay rejected event {} with a bad signature", event.id);
            return Ok(false);
        }
        self.insert(event.clone());
        self.published.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn fetch_by_id(&self, id: &str, relay_hints: &[String]) -> Result<Option<Event>, RelayError> {
        let delay = locked(&self.fetch_delays).get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let events = self.query_matching(&Filter::new().id(id).limit(1), relay_hints).await?;
        Ok(events.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::UnsignedEvent;
    use porch_common::Keypair;

    fn note(kp: &Keypair, text: &str) -> Event {
        UnsignedEvent::new(Kind::TEXT_NOTE, vec![], text).sign(&kp.secret).unwrap()
    }

    #[tokio::test]
    async fn publish_then_fetch() {
        let relay = MemoryRelay::new();
        let kp = Keypair::generate();
        let ev = note(&kp, "gm");

        assert!(relay.publish(&ev, &[]).await.unwrap());
        assert_eq!(relay.fetch_by_id(&ev.id, &[]).await.unwrap(), Some(ev.clone()));
        assert_eq!(relay.fetch_by_id(&"00".repeat(32), &[]).await.unwrap(), None);
        assert_eq!(relay.published_count(), 1);
    }

    #[tokio::test]
    async fn rejects_forged_events() {
        let relay = MemoryRelay::new();
        let mut ev = note(&Keypair::generate(), "gm");
        ev.content = "forged".into();
        assert!(!relay.publish(&ev, &[]).await.unwrap());
        assert!(relay.events().is_empty());
    }

    #[tokio::test]
    async fn failure_switches() {
        let relay = MemoryRelay::new();
        let ev = note(&Keypair::generate(), "gm");
        relay.insert(ev.clone());

        relay.set_kind_failing(Kind::REACTION, true);
        assert!(relay.query_matching(&Filter::new().kind(Kind::REACTION), &[]).await.is_err());
        assert!(relay.query_matching(&Filter::new().kind(Kind::TEXT_NOTE), &[]).await.is_ok());

        relay.set_fetch_failing(true);
        assert!(relay.fetch_by_id(&ev.id, &[]).await.is_err());

        relay.set_publish_failing(true);
        assert!(relay.publish(&ev, &[]).await.is_err());
    }

    #[tokio::test]
    async fn queries_are_newest_first_and_limited() {
        let relay = MemoryRelay::new();
        let kp = Keypair::generate();
        for (i, text) in ["a", "b", "c"].into_iter().enumerate() {
            let mut unsigned = UnsignedEvent::new(Kind::TEXT_NOTE, vec![], text);
            unsigned.created_at = 1_000 + i as i64;
            relay.insert(unsigned.sign(&kp.secret).unwrap());
        }
        let got = relay.query_matching(&Filter::new().author(kp.public.to_hex()).limit(2), &[]).await.unwrap();
        assert_eq!(got.iter().map(|e| e.content.as_str()).collect::<Vec<_>>(), ["c", "b"]);
    }
}
