//! WebSocket relay pool.
//!
//! Every operation opens a short-lived connection to each target relay in
//! parallel, bounded by a per-relay timeout:
//!
//! - **query**: `REQ` one subscription, collect `EVENT`s until `EOSE` (or
//!   `CLOSED`), then `CLOSE`. Events whose id or signature don't check out are
//!   dropped. Results from all relays are merged and de-duplicated by id.
//! - **publish**: send `EVENT`, wait for the matching `OK`. Success means at
//!   least one relay accepted.
//!
//! Relay hints are tried before the configured relays.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt, future::join_all};
use porch_common::{config::RelaysConfig, models::Event};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use crate::{
    client::RelayClient,
    error::RelayError,
    signatures,
    types::{Filter, RelayMessage, close_message, event_message, req_message},
};

#[derive(Debug, Clone)]
pub struct WsRelayPool {
    relays: Vec<String>,
    timeout: Duration,
}

impl WsRelayPool {
    pub fn new(relays: Vec<String>, timeout: Duration) -> Self {
        Self { relays, timeout }
    }

    pub fn from_config(config: &RelaysConfig) -> Self {
        Self::new(config.urls.clone(), Duration::from_secs(config.timeout_secs))
    }

    /// Hints first, then configured relays. Invalid and duplicate URLs are dropped.
    pub fn targets(&self, relay_hints: &[String]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for raw in relay_hints.iter().chain(self.relays.iter()) {
            match normalize_relay_url(raw) {
                Ok(url) if !out.contains(&url) => out.push(url),
                Ok(_) => {}
                Err(e) => debug!("Skipping relay: {e}"),
            }
        }
        out
    }

    async fn query_one(&self, relay: &str, filter: &Filter) -> Result<Vec<Event>, RelayError> {
        timeout(self.timeout, query_relay(relay, filter))
            .await
            .map_err(|_| RelayError::Timeout(relay.to_owned()))?
    }

    async fn publish_one(&self, relay: &str, event: &Event) -> Result<bool, RelayError> {
        timeout(self.timeout, publish_to_relay(relay, event))
            .await
            .map_err(|_| RelayError::Timeout(relay.to_owned()))?
    }
}

#[async_trait]
impl RelayClient for WsRelayPool {
    async fn query_matching(
        &self,
        filter: &Filter,
        relay_hints: &[String],
    ) -> Result<Vec<Event>, RelayError> {
        let targets = self.targets(relay_hints);
        if targets.is_empty() {
            return Err(RelayError::NoRelays);
        }

        let results = join_all(targets.iter().map(|r| self.query_one(r, filter))).await;

        let mut merged: HashMap<String, Event> = HashMap::new();
        let mut answered = 0usize;
        for (relay, result) in targets.iter().zip(results) {
            match result {
                Ok(events) => {
                    answered += 1;
                    for event in events {
                        merged.entry(event.id.to_lowercase()).or_insert(event);
                    }
                }
                Err(e) => warn!("Query against {relay} failed: {e}"),
            }
        }
        if answered == 0 {
            return Err(RelayError::AllRelaysFailed);
        }

        let mut events: Vec<Event> = merged.into_values().collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = filter.limit {
            events.truncate(limit);
        }
        debug!("Query matched {} event(s) across {answered} relay(s)", events.len());
        Ok(events)
    }

    async fn publish(&self, event: &Event, relay_hints: &[String]) -> Result<bool, RelayError> {
        let targets = self.targets(relay_hints);
        if targets.is_empty() {
            return Err(RelayError::NoRelays);
        }

        let results = join_all(targets.iter().map(|r| self.publish_one(r, event))).await;

        let mut accepted = 0usize;
        let mut answered = 0usize;
        for (relay, result) in targets.iter().zip(results) {
            match result {
                Ok(true) => {
                    answered += 1;
                    accepted += 1;
                }
                Ok(false) => {
                    answered += 1;
                    debug!("{relay} refused event {}", event.id);
                }
                Err(e) => warn!("Publish to {relay} failed: {e}"),
            }
        }
        if answered == 0 {
            return Err(RelayError::AllRelaysFailed);
        }
        debug!("Event {} accepted by {accepted}/{} relay(s)", event.id, targets.len());
        Ok(accepted > 0)
    }
}

// ─── Per-relay conversations ─────────────────────────────────────────────────

async fn query_relay(relay: &str, filter: &Filter) -> Result<Vec<Event>, RelayError> {
    let (ws, _) = connect_async(relay)
        .await
        .map_err(|e| RelayError::Connection { relay: relay.to_owned(), message: e.to_string() })?;
    let (mut sink, mut stream) = ws.split();

    let sub_id = uuid::Uuid::new_v4().simple().to_string();
    sink.send(Message::Text(req_message(&sub_id, filter).into())).await?;

    let mut events = Vec::new();
    while let Some(msg) = stream.next().await {
        let text = match msg? {
            Message::Text(t) => t.as_str().to_owned(),
            Message::Close(_) => break,
            _ => continue,
        };
        match RelayMessage::from_json(relay, &text) {
            Ok(RelayMessage::Event { subscription_id, event }) if subscription_id == sub_id => {
                if signatures::verify(&event) && filter.matches(&event) {
                    events.push(*event);
                } else {
                    debug!("Dropping invalid event {} from {relay}", event.id);
                }
            }
            Ok(RelayMessage::EndOfStoredEvents(id)) if id == sub_id => break,
            Ok(RelayMessage::Closed { subscription_id, message }) if subscription_id == sub_id => {
                debug!("{relay} closed subscription: {message}");
                break;
            }
            Ok(RelayMessage::Notice(notice)) => debug!("{relay} notice: {notice}"),
            Ok(_) => {}
            Err(e) => debug!("Ignoring frame from {relay}: {e}"),
        }
    }

    // Best effort; the relay may already be gone.
    let _ = sink.send(Message::Text(close_message(&sub_id).into())).await;
    let _ = sink.close().await;
    Ok(events)
}

async fn publish_to_relay(relay: &str, event: &Event) -> Result<bool, RelayError> {
    let (ws, _) = connect_async(relay)
        .await
        .map_err(|e| RelayError::Connection { relay: relay.to_owned(), message: e.to_string() })?;
    let (mut sink, mut stream) = ws.split();

    sink.send(Message::Text(event_message(event).into())).await?;

    let mut accepted = None;
    while let Some(msg) = stream.next().await {
        let text = match msg? {
            Message::Text(t) => t.as_str().to_owned(),
            Message::Close(_) => break,
            _ => continue,
        };
        match RelayMessage::from_json(relay, &text) {
            Ok(RelayMessage::Ok { event_id, accepted: ok, message }) if event_id.eq_ignore_ascii_case(&event.id) => {
                if !ok {
                    debug!("{relay} rejected {event_id}: {message}");
                }
                accepted = Some(ok);
                break;
            }
            Ok(RelayMessage::Notice(notice)) => debug!("{relay} notice: {notice}"),
            Ok(_) => {}
            Err(e) => debug!("Ignoring frame from {relay}: {e}"),
        }
    }

    let _ = sink.close().await;
    accepted.ok_or_else(|| RelayError::Protocol {
        relay: relay.to_owned(),
        message: "connection closed before OK".into(),
    })
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn normalize_relay_url(raw: &str) -> Result<String, RelayError> {
    let url = url::Url::parse(raw.trim()).map_err(|_| RelayError::InvalidRelayUrl(raw.to_owned()))?;
    if !matches!(url.scheme(), "ws" | "wss") || url.host_str().is_none() {
        return Err(RelayError::InvalidRelayUrl(raw.to_owned()));
    }
    Ok(url.as_str().trim_end_matches('/').to_owned())
}
