//! Event ids and signatures.
//!
//! The id of an event is the SHA-256 of its canonical serialization, a compact
//! JSON array with no extra whitespace:
//!
//! ```json
//! [0, "<pubkey hex>", <created_at>, <kind>, <tags>, "<content>"]
//! ```
//!
//! The signature is BIP-340 Schnorr over those 32 id bytes.

use porch_common::{
    SecretKey,
    models::{Event, Kind},
};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::error::RelayError;

/// An event before it has an id and signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedEvent {
    pub created_at: i64,
    pub kind: Kind,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

impl UnsignedEvent {
    /// Stamp with the current time.
    pub fn new(kind: Kind, tags: Vec<Vec<String>>, content: impl Into<String>) -> Self {
        Self { created_at: chrono::Utc::now().timestamp(), kind, tags, content: content.into() }
    }

    /// Sign as the owner of `secret`.
    pub fn sign(self, secret: &SecretKey) -> Result<Event, RelayError> {
        let pubkey = secret.public_key().to_hex();
        let id = compute_id(&pubkey, self.created_at, self.kind, &self.tags, &self.content);
        let sig = secret.sign_digest(&id).map_err(|e| RelayError::Signing(e.to_string()))?;

        Ok(Event {
            id: hex::encode(id),
            pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig: hex::encode(sig),
        })
    }
}

/// SHA-256 of the canonical serialization.
pub fn compute_id(
    pubkey_hex: &str,
    created_at: i64,
    kind: Kind,
    tags: &[Vec<String>],
    content: &str,
) -> [u8; 32] {
    let canonical = json!([0, pubkey_hex, created_at, kind.0, tags, content]).to_string();
    Sha256::digest(canonical.as_bytes()).into()
}

/// Check that `event.id` matches its contents and `event.sig` is valid for `event.pubkey`.
pub fn verify(event: &Event) -> bool {
    let expected = compute_id(&event.pubkey, event.created_at, event.kind, &event.tags, &event.content);
    if !hex::encode(expected).eq_ignore_ascii_case(&event.id) {
        return false;
    }
    let Ok(pubkey) = porch_common::PublicKey::from_hex(&event.pubkey) else {
        return false;
    };
    let Ok(sig) = hex::decode(&event.sig) else {
        return false;
    };
    pubkey.verify_digest(&expected, &sig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use porch_common::Keypair;

    #[test]
    fn signed_events_verify() {
        let kp = Keypair::generate();
        let event = UnsignedEvent::new(Kind::TEXT_NOTE, vec![], "hello").sign(&kp.secret).unwrap();

        assert_eq!(event.pubkey, kp.public.to_hex());
        assert_eq!(event.id.len(), 64);
        assert_eq!(event.sig.len(), 128);
        assert!(verify(&event));
    }

    #[test]
    fn tampering_breaks_verification() {
        let kp = Keypair::generate();
        let event = UnsignedEvent::new(Kind::TEXT_NOTE, vec![], "hello").sign(&kp.secret).unwrap();

        let edited = Event { content: "hello!".into(), ..event.clone() };
        assert!(!verify(&edited));

        let other = Keypair::generate().public.to_hex();
        let reassigned = Event { pubkey: other, ..event };
        assert!(!verify(&reassigned));
    }

    #[test]
    fn id_escapes_content_like_compact_json() {
        let a = compute_id(&"aa".repeat(32), 1, Kind::TEXT_NOTE, &[], "line\n\"quoted\"");
        let b = compute_id(&"aa".repeat(32), 1, Kind::TEXT_NOTE, &[], "line\\n\"quoted\"");
        assert_ne!(a, b);

        let canonical = json!([0, "aa", 1, 1, Vec::<Vec<String>>::new(), "a\nb"]).to_string();
        assert_eq!(canonical, r#"[0,"aa",1,1,[],"a\nb"]"#);
    }
}
