//! Human-readable identifiers (bech32).
//!
//! | Prefix   | Payload                                              |
//! |----------|------------------------------------------------------|
//! | `note`   | 32-byte event id                                     |
//! | `nevent` | TLV: 0 = event id, 1 = relay (repeatable), 2 = author, 3 = kind (u32 BE) |
//! | `npub`   | 32-byte public key                                   |
//! | `nsec`   | 32-byte secret key                                   |
//!
//! [`ContentId::parse`] digs a content identifier out of whatever a person
//! pasted: a bare `note1…`/`nevent1…`, one behind a `nostr:` scheme or inside a
//! URL, or a raw 64-character hex id.

use std::sync::LazyLock;

use bech32::{Bech32, Hrp};
use porch_common::{PorchError, PublicKey, SecretKey, models::Kind};
use regex::Regex;
use thiserror::Error;
use zeroize::Zeroizing;

const HRP_NOTE: Hrp = Hrp::parse_unchecked("note");
const HRP_NEVENT: Hrp = Hrp::parse_unchecked("nevent");
const HRP_NPUB: Hrp = Hrp::parse_unchecked("npub");
const HRP_NSEC: Hrp = Hrp::parse_unchecked("nsec");

const TLV_SPECIAL: u8 = 0;
const TLV_RELAY: u8 = 1;
const TLV_AUTHOR: u8 = 2;
const TLV_KIND: u8 = 3;

static BECH32_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:nostr:)?((?:note|nevent)1[02-9ac-hj-np-z]+)\b").expect("valid regex")
});
static RAW_HEX_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9a-fA-F]{64})\b").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("bech32 decode failed: {0}")]
    Bech32(String),

    #[error("expected '{expected}' identifier, got '{actual}'")]
    WrongPrefix { expected: &'static str, actual: String },

    #[error("malformed payload: {0}")]
    Payload(String),
}

impl From<IdentifierError> for PorchError {
    fn from(e: IdentifierError) -> Self {
        PorchError::InvalidIdentifier(e.to_string())
    }
}

// ─── Content identifiers ─────────────────────────────────────────────────────

/// A decoded pointer to one event, with optional hints for finding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentId {
    /// Lowercase hex event id.
    pub id: String,
    pub relays: Vec<String>,
    pub author: Option<PublicKey>,
    pub kind: Option<Kind>,
}

impl ContentId {
    /// A bare id with no hints. `id` must be 64 hex characters.
    pub fn from_hex(id: &str) -> Result<Self, IdentifierError> {
        let bytes = hex::decode(id.trim()).map_err(|e| IdentifierError::Payload(e.to_string()))?;
        let id = bytes_32(&bytes)?;
        Ok(Self { id: hex::encode(id), relays: Vec::new(), author: None, kind: None })
    }

    /// Strictly decode a `note1…` or `nevent1…` string (a `nostr:` scheme is allowed).
    pub fn decode(text: &str) -> Result<Self, IdentifierError> {
        let text = text.trim();
        let text = strip_scheme(text);
        let (hrp, data) = bech32::decode(text).map_err(|e| IdentifierError::Bech32(e.to_string()))?;

        match hrp.to_lowercase().as_str() {
            "note" => Ok(Self {
                id: hex::encode(bytes_32(&data)?),
                relays: Vec::new(),
                author: None,
                kind: None,
            }),
            "nevent" => decode_nevent_tlv(&data),
            other => Err(IdentifierError::WrongPrefix { expected: "note or nevent", actual: other.to_owned() }),
        }
    }

    /// Recover an identifier from free-form text. Returns `None` when nothing usable is found.
    pub fn parse(text: &str) -> Option<Self> {
        for caps in BECH32_CONTENT.captures_iter(text) {
            if let Ok(id) = Self::decode(&caps[1]) {
                return Some(id);
            }
        }
        RAW_HEX_ID
            .captures(text)
            .and_then(|caps| Self::from_hex(&caps[1]).ok())
    }

    /// `note1…` encoding of the id alone.
    pub fn to_note(&self) -> Result<String, IdentifierError> {
        let bytes = hex::decode(&self.id).map_err(|e| IdentifierError::Payload(e.to_string()))?;
        encode(HRP_NOTE, &bytes)
    }

    /// `nevent1…` encoding, carrying relays, author and kind when present.
    pub fn to_nevent(&self) -> Result<String, IdentifierError> {
        let id = hex::decode(&self.id).map_err(|e| IdentifierError::Payload(e.to_string()))?;
        let mut tlv = Vec::with_capacity(64);
        push_tlv(&mut tlv, TLV_SPECIAL, &id)?;
        for relay in &self.relays {
            push_tlv(&mut tlv, TLV_RELAY, relay.as_bytes())?;
        }
        if let Some(author) = &self.author {
            push_tlv(&mut tlv, TLV_AUTHOR, &author.to_bytes())?;
        }
        if let Some(kind) = self.kind {
            push_tlv(&mut tlv, TLV_KIND, &kind.0.to_be_bytes())?;
        }
        encode(HRP_NEVENT, &tlv)
    }

    /// The shortest faithful encoding: `note1…` without hints, `nevent1…` with them.
    pub fn encoded(&self) -> Result<String, IdentifierError> {
        if self.relays.is_empty() && self.author.is_none() && self.kind.is_none() {
            self.to_note()
        } else {
            self.to_nevent()
        }
    }
}

impl std::str::FromStr for ContentId {
    type Err = PorchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| PorchError::InvalidIdentifier(s.trim().to_owned()))
    }
}

fn decode_nevent_tlv(data: &[u8]) -> Result<ContentId, IdentifierError> {
    let mut id = None;
    let mut relays = Vec::new();
    let mut author = None;
    let mut kind = None;

    let mut rest = data;
    while !rest.is_empty() {
        let [t, l, tail @ ..] = rest else {
            return Err(IdentifierError::Payload("truncated TLV header".into()));
        };
        let len = usize::from(*l);
        if tail.len() < len {
            return Err(IdentifierError::Payload("truncated TLV value".into()));
        }
        let (value, next) = tail.split_at(len);
        match *t {
            TLV_SPECIAL => id = Some(hex::encode(bytes_32(value)?)),
            TLV_RELAY => {
                let relay = std::str::from_utf8(value)
                    .map_err(|_| IdentifierError::Payload("relay is not UTF-8".into()))?;
                relays.push(relay.to_owned());
            }
            TLV_AUTHOR => {
                author = Some(
                    PublicKey::try_from(value).map_err(|e| IdentifierError::Payload(e.to_string()))?,
                )
            }
            TLV_KIND => {
                let bytes: [u8; 4] = value
                    .try_into()
                    .map_err(|_| IdentifierError::Payload("kind must be 4 bytes".into()))?;
                kind = Some(Kind(u32::from_be_bytes(bytes)));
            }
            // Unknown TLV types are skipped.
            _ => {}
        }
        rest = next;
    }

    let id = id.ok_or_else(|| IdentifierError::Payload("nevent without event id".into()))?;
    Ok(ContentId { id, relays, author, kind })
}

// ─── Keys ────────────────────────────────────────────────────────────────────

pub fn encode_npub(key: &PublicKey) -> Result<String, IdentifierError> {
    encode(HRP_NPUB, &key.to_bytes())
}

pub fn decode_npub(text: &str) -> Result<PublicKey, IdentifierError> {
    let bytes = decode_expecting(text, HRP_NPUB, "npub")?;
    PublicKey::try_from(bytes.as_slice()).map_err(|e| IdentifierError::Payload(e.to_string()))
}

pub fn encode_nsec(key: &SecretKey) -> Result<Zeroizing<String>, IdentifierError> {
    encode(HRP_NSEC, &key.to_bytes()[..]).map(Zeroizing::new)
}

pub fn decode_nsec(text: &str) -> Result<SecretKey, IdentifierError> {
    let bytes = Zeroizing::new(decode_expecting(text, HRP_NSEC, "nsec")?);
    SecretKey::from_bytes(&bytes).map_err(|e| IdentifierError::Payload(e.to_string()))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn strip_scheme(text: &str) -> &str {
    match text.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("nostr:") => &text[6..],
        _ => text,
    }
}

fn encode(hrp: Hrp, data: &[u8]) -> Result<String, IdentifierError> {
    bech32::encode::<Bech32>(hrp, data).map_err(|e| IdentifierError::Bech32(e.to_string()))
}

fn decode_expecting(text: &str, hrp: Hrp, name: &'static str) -> Result<Vec<u8>, IdentifierError> {
    let (found, data) =
        bech32::decode(strip_scheme(text.trim())).map_err(|e| IdentifierError::Bech32(e.to_string()))?;
    if found.to_lowercase() != hrp.to_lowercase() {
        return Err(IdentifierError::WrongPrefix { expected: name, actual: found.to_lowercase() });
    }
    Ok(data)
}

fn bytes_32(bytes: &[u8]) -> Result<[u8; 32], IdentifierError> {
    bytes
        .try_into()
        .map_err(|_| IdentifierError::Payload(format!("expected 32 bytes, got {}", bytes.len())))
}

fn push_tlv(out: &mut Vec<u8>, t: u8, value: &[u8]) -> Result<(), IdentifierError> {
    let len = u8::try_from(value.len())
        .map_err(|_| IdentifierError::Payload("TLV value longer than 255 bytes".into()))?;
    out.push(t);
    out.push(len);
    out.extend_from_slice(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use porch_common::Keypair;

    const ID: &str = "d94a3f4dd87b9a3b0bed183b32e916fa29c8020107845d1752d72697fe5309a5";

    #[test]
    fn note_encodes_and_decodes() {
        let content = ContentId::from_hex(ID).unwrap();
        let note = content.to_note().unwrap();
        assert!(note.starts_with("note1"));
        assert_eq!(ContentId::decode(&note).unwrap(), content);
        assert_eq!(content.encoded().unwrap(), note);
    }

    #[test]
    fn nevent_carries_hints() {
        let author = Keypair::generate().public;
        let content = ContentId {
            id: ID.into(),
            relays: vec!["wss://relay.example".into(), "wss://nos.lol".into()],
            author: Some(author),
            kind: Some(Kind::TEXT_NOTE),
        };
        let nevent = content.encoded().unwrap();
        assert!(nevent.starts_with("nevent1"));
        assert_eq!(ContentId::decode(&nevent).unwrap(), content);
    }

    #[test]
    fn parse_recovers_identifiers_from_pasted_text() {
        let note = ContentId::from_hex(ID).unwrap().to_note().unwrap();

        let from_url = ContentId::parse(&format!("https://njump.me/{note}?ref=x")).unwrap();
        assert_eq!(from_url.id, ID);

        let with_scheme = ContentId::parse(&format!("  nostr:{note}\n")).unwrap();
        assert_eq!(with_scheme.id, ID);
    }

    #[test]
    fn raw_hex_falls_back_and_re_encodes_to_note() {
        let parsed = ContentId::parse(ID).unwrap();
        assert_eq!(parsed.id, ID);
        assert!(parsed.encoded().unwrap().starts_with("note1"));

        let upper = ContentId::parse(&ID.to_uppercase()).unwrap();
        assert_eq!(upper.id, ID);
    }

    #[test]
    fn parse_rejects_everything_else() {
        assert!(ContentId::parse("hello world").is_none());
        assert!(ContentId::parse("note1qqqqqq").is_none());
        assert!(ContentId::parse(&ID[..63]).is_none());
        assert!("not an id".parse::<ContentId>().is_err());
    }

    #[test]
    fn wrong_prefix_is_not_content() {
        let npub = encode_npub(&Keypair::generate().public).unwrap();
        assert!(matches!(ContentId::decode(&npub), Err(IdentifierError::WrongPrefix { .. })));
        assert!(ContentId::parse(&npub).is_none());
    }

    #[test]
    fn key_encodings() {
        let kp = Keypair::generate();
        let npub = encode_npub(&kp.public).unwrap();
        assert!(npub.starts_with("npub1"));
        assert_eq!(decode_npub(&npub).unwrap(), kp.public);

        let nsec = encode_nsec(&kp.secret).unwrap();
        assert!(nsec.starts_with("nsec1"));
        assert_eq!(decode_nsec(&nsec).unwrap(), kp.secret);
        assert!(decode_npub(&nsec).is_err());
    }

    #[test]
    fn truncated_nevent_is_rejected() {
        let bad = encode(HRP_NEVENT, &[TLV_SPECIAL, 32, 1, 2, 3]).unwrap();
        assert!(matches!(ContentId::decode(&bad), Err(IdentifierError::Payload(_))));
    }
}
