//! Author profile metadata, parsed from a kind-0 event's JSON content.

use serde::{Deserialize, Serialize};

use super::event::{Event, Kind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub about: Option<String>,
    pub picture: Option<String>,
    pub banner: Option<String>,
    pub website: Option<String>,
    /// Domain-identity claim, `name@domain` (or a bare domain for `_@domain`).
    pub nip05: Option<String>,
    /// Lightning address.
    pub lud16: Option<String>,
}

impl Profile {
    /// Parse the content of a metadata event. Returns `None` for other kinds or bad JSON.
    pub fn from_event(event: &Event) -> Option<Self> {
        if event.kind != Kind::METADATA {
            return None;
        }
        match serde_json::from_str(&event.content) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::debug!("Unparseable profile metadata {}: {e}", event.id);
                None
            }
        }
    }

    /// Best human label: display name, then name, then nothing.
    pub fn label(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.name.as_deref().filter(|s| !s.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(content: &str) -> Event {
        Event {
            id: "aa".repeat(32),
            pubkey: "bb".repeat(32),
            created_at: 0,
            kind: Kind::METADATA,
            tags: vec![],
            content: content.into(),
            sig: String::new(),
        }
    }

    #[test]
    fn parses_known_fields_and_ignores_extra() {
        let p = Profile::from_event(&metadata(
            r#"{"name":"alice","nip05":"alice@example.com","unknown":1}"#,
        ))
        .unwrap();
        assert_eq!(p.name.as_deref(), Some("alice"));
        assert_eq!(p.nip05.as_deref(), Some("alice@example.com"));
        assert_eq!(p.label(), Some("alice"));
    }

    #[test]
    fn bad_json_yields_none() {
        assert!(Profile::from_event(&metadata("not json")).is_none());
    }
}
