//! # porch-common
//!
//! Shared types, configuration, error handling, and key primitives used across all porch crates.
//! This is the foundation layer: no lifecycle logic, just primitives and contracts.

pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod models;
pub mod validation;

pub use error::{ErrorKind, PorchError, PorchResult, StorageError};
pub use keys::{Keypair, PublicKey, SecretKey};
