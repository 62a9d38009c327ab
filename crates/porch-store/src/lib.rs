//! # porch-store
//!
//! Storage layer for porch. Two scopes of string key/value storage:
//! - **Durable**: survives restarts. Holds the identity record and the activity ledger.
//! - **Session**: cleared when the browsing session ends. Holds the unlocked private key.
//!
//! Each record has exactly one owning component; nothing else writes to it.

pub mod ledger;
pub mod storage;

use std::sync::Arc;

use porch_common::{StorageError, config::StorageConfig};

pub use ledger::ActivityLedger;
pub use storage::{FileStore, KeyValueStore, MemoryStore};

/// Durable key of the single identity record (ephemeral keypair or encrypted key).
pub const IDENTITY_KEY: &str = "porch:identity";
/// Durable key of the activity ledger.
pub const ACTIVITY_KEY: &str = "porch:activity";
/// Session key of the cached, unlocked private key (hex).
pub const SESSION_KEY: &str = "porch:session-key";

/// Both storage scopes, passed explicitly to the components that own records in them.
#[derive(Debug, Clone)]
pub struct Stores {
    pub durable: Arc<dyn KeyValueStore>,
    pub session: Arc<dyn KeyValueStore>,
}

impl Stores {
    pub fn new(durable: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self { durable, session }
    }

    /// Two independent in-memory scopes.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// File-backed scopes: durable under `config.data_dir`, session under the
    /// per-login runtime directory (see [`StorageConfig::session_path`]).
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let durable = config.durable_path();
        let session = config.session_path();
        for dir in [durable.parent(), session.parent()].into_iter().flatten() {
            std::fs::create_dir_all(dir)?;
        }
        tracing::debug!("Opening stores {} and {}", durable.display(), session.display());
        Ok(Self::new(Arc::new(FileStore::new(durable)), Arc::new(FileStore::new(session))))
    }
}
