//! Core domain models shared across all porch crates.
//!
//! These are the "truth" types: what the stores persist and the relays carry.

pub mod activity;
pub mod event;
pub mod identity;
pub mod profile;

/// Re-export all model types for convenience.
pub use activity::*;
pub use event::*;
pub use identity::*;
pub use profile::*;
