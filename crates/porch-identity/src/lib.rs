//! # porch-identity
//!
//! Walletless identity for porch.
//!
//! - **Key vault** (`vault.rs`): seals a private key under a password with
//!   PBKDF2-HMAC-SHA256 and AES-256-GCM. Wrong passwords fail closed.
//! - **Session** (`session.rs`): the identity lifecycle. One identity per
//!   profile, either ephemeral (no password, usable at once) or encrypted
//!   (locked until unlocked). The unlocked key lives in the session scope only.

pub mod session;
pub mod vault;

pub use session::IdentitySession;
pub use vault::KeyVault;
