//! Wire types: subscription filters and the relay message envelopes.
//!
//! Client → relay:
//!
//! ```text
//! ["REQ",   <sub_id>, <filter>]
//! ["EVENT", <event>]
//! ["CLOSE", <sub_id>]
//! ```
//!
//! Relay → client:
//!
//! ```text
//! ["EVENT",  <sub_id>, <event>]
//! ["EOSE",   <sub_id>]
//! ["OK",     <event_id>, <accepted>, <message>]
//! ["CLOSED", <sub_id>, <message>]
//! ["NOTICE", <message>]
//! ```

use porch_common::models::{Event, Kind};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::RelayError;

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Subscription filter. Every present field must match; within a field any value may.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<Kind>>,
    /// Events referenced through `e` tags.
    #[serde(rename = "#e", skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,
    /// Keys referenced through `p` tags.
    #[serde(rename = "#p", skip_serializing_if = "Option::is_none")]
    pub pubkeys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.ids.get_or_insert_with(Vec::new).push(id.into());
        self
    }

    pub fn author(mut self, pubkey: impl Into<String>) -> Self {
        self.authors.get_or_insert_with(Vec::new).push(pubkey.into());
        self
    }

    pub fn kind(mut self, kind: Kind) -> Self {
        self.kinds.get_or_insert_with(Vec::new).push(kind);
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = Kind>) -> Self {
        self.kinds.get_or_insert_with(Vec::new).extend(kinds);
        self
    }

    pub fn event(mut self, event_id: impl Into<String>) -> Self {
        self.events.get_or_insert_with(Vec::new).push(event_id.into());
        self
    }

    pub fn pubkey(mut self, pubkey: impl Into<String>) -> Self {
        self.pubkeys.get_or_insert_with(Vec::new).push(pubkey.into());
        self
    }

    pub fn since(mut self, since: i64) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `event` satisfies this filter (ignoring `limit`).
    pub fn matches(&self, event: &Event) -> bool {
        fn any_eq(values: &Option<Vec<String>>, candidate: &str) -> bool {
            values
                .as_ref()
                .is_none_or(|vs| vs.iter().any(|v| v.eq_ignore_ascii_case(candidate)))
        }

        any_eq(&self.ids, &event.id)
            && any_eq(&self.authors, &event.pubkey)
            && self.kinds.as_ref().is_none_or(|ks| ks.contains(&event.kind))
            && self.events.as_ref().is_none_or(|ids| ids.iter().any(|id| event.references(id)))
            && self.pubkeys.as_ref().is_none_or(|pks| {
                event.tag_values("p").any(|p| pks.iter().any(|pk| pk.eq_ignore_ascii_case(p)))
            })
            && self.since.is_none_or(|since| event.created_at >= since)
    }
}

// ─── Client messages ─────────────────────────────────────────────────────────

pub fn req_message(subscription_id: &str, filter: &Filter) -> String {
    json!(["REQ", subscription_id, filter]).to_string()
}

pub fn event_message(event: &Event) -> String {
    json!(["EVENT", event]).to_string()
}

pub fn close_message(subscription_id: &str) -> String {
    json!(["CLOSE", subscription_id]).to_string()
}

// ─── Relay messages ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum RelayMessage {
    Event { subscription_id: String, event: Box<Event> },
    EndOfStoredEvents(String),
    Ok { event_id: String, accepted: bool, message: String },
    Closed { subscription_id: String, message: String },
    Notice(String),
}

impl RelayMessage {
    /// Parse one text frame. `relay` is only used to label errors.
    pub fn from_json(relay: &str, text: &str) -> Result<Self, RelayError> {
        let protocol = |message: &str| RelayError::Protocol {
            relay: relay.to_owned(),
            message: message.to_owned(),
        };

        let value: Value = serde_json::from_str(text)?;
        let parts = value.as_array().ok_or_else(|| protocol("frame is not an array"))?;
        let str_at = |i: usize| parts.get(i).and_then(Value::as_str).map(str::to_owned);

        match parts.first().and_then(Value::as_str) {
            Some("EVENT") => {
                let subscription_id = str_at(1).ok_or_else(|| protocol("EVENT without subscription"))?;
                let raw = parts.get(2).cloned().ok_or_else(|| protocol("EVENT without payload"))?;
                let event: Event = serde_json::from_value(raw)?;
                Ok(Self::Event { subscription_id, event: Box::new(event) })
            }
            Some("EOSE") => Ok(Self::EndOfStoredEvents(
                str_at(1).ok_or_else(|| protocol("EOSE without subscription"))?,
            )),
            Some("OK") => Ok(Self::Ok {
                event_id: str_at(1).ok_or_else(|| protocol("OK without event id"))?,
                accepted: parts
                    .get(2)
                    .and_then(Value::as_bool)
                    .ok_or_else(|| protocol("OK without status"))?,
                message: str_at(3).unwrap_or_default(),
            }),
            Some("CLOSED") => Ok(Self::Closed {
                subscription_id: str_at(1).ok_or_else(|| protocol("CLOSED without subscription"))?,
                message: str_at(2).unwrap_or_default(),
            }),
            Some("NOTICE") => Ok(Self::Notice(str_at(1).unwrap_or_default())),
            Some(other) => Err(protocol(&format!("unknown message type '{other}'"))),
            None => Err(protocol("empty frame")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_to(target: &str) -> Event {
        Event {
            id: "01".repeat(32),
            pubkey: "aa".repeat(32),
            created_at: 100,
            kind: Kind::TEXT_NOTE,
            tags: vec![vec!["e".into(), target.into()], vec!["p".into(), "bb".repeat(32)]],
            content: "nice".into(),
            sig: String::new(),
        }
    }

    #[test]
    fn filter_serializes_tag_queries() {
        let filter = Filter::new().kinds([Kind::REACTION, Kind::REPOST]).event("ff".repeat(32));
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["kinds"], json!([7, 6]));
        assert_eq!(json["#e"][0], "ff".repeat(32));
        assert!(json.get("ids").is_none());
    }

    #[test]
    fn filter_matching() {
        let target = "cd".repeat(32);
        let ev = reply_to(&target);

        assert!(Filter::new().matches(&ev));
        assert!(Filter::new().kind(Kind::TEXT_NOTE).event(&target).matches(&ev));
        assert!(Filter::new().author("AA".repeat(32)).matches(&ev));
        assert!(Filter::new().pubkey("bb".repeat(32)).matches(&ev));
        assert!(!Filter::new().kind(Kind::REACTION).matches(&ev));
        assert!(!Filter::new().event("ee".repeat(32)).matches(&ev));
        assert!(!Filter::new().since(101).matches(&ev));
    }

    #[test]
    fn parses_relay_messages() {
        let ok = RelayMessage::from_json("r", r#"["OK","abc",true,""]"#).unwrap();
        assert_eq!(ok, RelayMessage::Ok { event_id: "abc".into(), accepted: true, message: String::new() });

        let eose = RelayMessage::from_json("r", r#"["EOSE","sub1"]"#).unwrap();
        assert_eq!(eose, RelayMessage::EndOfStoredEvents("sub1".into()));

        let ev = serde_json::to_string(&reply_to("x")).unwrap();
        let msg = RelayMessage::from_json("r", &format!(r#"["EVENT","sub1",{ev}]"#)).unwrap();
        assert!(matches!(msg, RelayMessage::Event { ref subscription_id, .. } if subscription_id == "sub1"));

        assert!(RelayMessage::from_json("r", r#"{"not":"array"}"#).is_err());
        assert!(RelayMessage::from_json("r", r#"["AUTH","challenge"]"#).is_err());
    }

    #[test]
    fn client_messages_are_json_arrays() {
        let req = req_message("s", &Filter::new().limit(1));
        assert_eq!(req, r#"["REQ","s",{"limit":1}]"#);
        assert_eq!(close_message("s"), r#"["CLOSE","s"]"#);
    }
}
