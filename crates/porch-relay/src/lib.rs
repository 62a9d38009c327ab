//! # porch-relay
//!
//! Everything porch needs from the network.
//!
//! ## Key concepts
//!
//! - **Relay client** (`client.rs`): the `RelayClient` trait with three
//!   operations: `fetch_by_id`, `query_matching` and `publish`. Two
//!   implementations: `WsRelayPool` (`websocket.rs`) speaks to real relays over
//!   WebSockets, `MemoryRelay` (`memory.rs`) keeps events in process.
//! - **Events** (`signatures.rs`, `builders.rs`): content-addressed ids,
//!   Schnorr signatures, and builders for reactions and replies.
//! - **Identifiers** (`identifier.rs`): `note`/`nevent`/`npub`/`nsec`, and
//!   recovering a content id from pasted text.
//! - **Verification** (`discovery.rs`): checks a profile's `name@domain`
//!   claim against the author's key via `/.well-known/nostr.json`.

pub mod builders;
pub mod client;
pub mod discovery;
pub mod error;
pub mod identifier;
pub mod memory;
pub mod signatures;
pub mod types;
pub mod websocket;

pub use client::RelayClient;
pub use discovery::{IdentityVerifier, WellKnownVerifier};
pub use error::RelayError;
pub use identifier::ContentId;
pub use memory::MemoryRelay;
pub use types::Filter;
pub use websocket::WsRelayPool;
