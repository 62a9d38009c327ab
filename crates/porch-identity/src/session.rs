//! Identity lifecycle.
//!
//! ```text
//!   NoIdentity ──create(None)──────────► UnlockedEphemeral ──claim(pw)──► UnlockedEncrypted
//!       │                                      │                              ▲   │
//!       └──create(Some(pw))──► LockedEncrypted ◄──────────lock────────────────┼───┘
//!                                    └─────────────unlock(pw)─────────────────┘
//!   any ──burn──► NoIdentity
//! ```
//!
//! Exactly one identity record lives in the durable scope under
//! [`IDENTITY_KEY`]. The unlocked private key is cached as hex in the session
//! scope under [`SESSION_KEY`]; the public key is re-derived on every read.

use porch_common::{
    Keypair, PorchError, PorchResult, PublicKey, SecretKey, StorageError,
    models::{EphemeralIdentity, IdentityRecord, IdentityState},
    validation::require_valid_password,
};
use porch_relay::identifier;
use porch_store::{ActivityLedger, IDENTITY_KEY, SESSION_KEY, Stores};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::vault::KeyVault;

const IDENTITY: &str = "Identity";

/// Owns the identity record and the session key cache.
#[derive(Debug, Clone)]
pub struct IdentitySession {
    stores: Stores,
    vault: KeyVault,
    ledger: ActivityLedger,
}

/// What the durable scope currently holds.
#[derive(Debug)]
enum StoredIdentity {
    Absent,
    Present(IdentityRecord),
    /// Something is stored but it is not a readable record.
    Unreadable,
}

impl IdentitySession {
    pub fn new(stores: Stores, vault: KeyVault) -> Self {
        let ledger = ActivityLedger::new(stores.durable.clone());
        Self { stores, vault, ledger }
    }

    /// The ledger sharing this session's durable scope.
    pub fn ledger(&self) -> &ActivityLedger {
        &self.ledger
    }

    // ── Creation ─────────────────────────────────────────────────────────────

    /// Create the profile's single identity.
    ///
    /// With a password the key is sealed and stored, and the session stays locked.
    /// Without one the keypair is stored as-is and cached for the session at once.
    pub fn create_identity(&self, password: Option<&str>) -> PorchResult<PublicKey> {
        if !matches!(self.stored()?, StoredIdentity::Absent) {
            return Err(PorchError::AlreadyExists { resource: IDENTITY.into() });
        }

        match password {
            Some(password) => {
                require_valid_password(password)?;
                let keypair = Keypair::generate();
                let sealed = self.vault.encrypt(&keypair.secret.to_hex(), password)?;
                self.write_record(&IdentityRecord::Encrypted(sealed))?;
                info!("Created encrypted identity {}", keypair.public);
                Ok(keypair.public)
            }
            None => {
                let keypair = Keypair::generate();
                let record = IdentityRecord::Ephemeral(EphemeralIdentity {
                    private_key: keypair.secret.to_hex().as_str().to_owned(),
                    public_key: keypair.public.to_hex(),
                });
                self.write_record(&record)?;
                if let Err(e) = self.cache_key(&keypair.secret) {
                    // Don't leave a durable record behind for a failed create.
                    let _ = self.stores.durable.remove(IDENTITY_KEY);
                    return Err(e);
                }
                info!("Created ephemeral identity {}", keypair.public);
                Ok(keypair.public)
            }
        }
    }

    /// Seal the current ephemeral identity under `password`, keeping the same keypair.
    pub fn claim(&self, password: &str) -> PorchResult<PublicKey> {
        let StoredIdentity::Present(IdentityRecord::Ephemeral(ephemeral)) = self.stored()? else {
            return Err(PorchError::not_found("Ephemeral identity"));
        };
        require_valid_password(password)?;

        let secret = SecretKey::from_hex(&ephemeral.private_key)
            .map_err(|e| PorchError::Internal(anyhow::anyhow!("stored ephemeral key is invalid: {e}")))?;
        let sealed = self.vault.encrypt(&secret.to_hex(), password)?;
        self.write_record(&IdentityRecord::Encrypted(sealed))?;
        self.cache_key(&secret)?;

        let public = secret.public_key();
        info!("Claimed identity {public} with a password");
        Ok(public)
    }

    // ── Unlocking ────────────────────────────────────────────────────────────

    /// Open the encrypted identity. With `remember` the key is cached for the session.
    pub fn unlock(&self, password: &str, remember: bool) -> PorchResult<Keypair> {
        let sealed = match self.stored()? {
            StoredIdentity::Present(IdentityRecord::Encrypted(sealed)) => sealed,
            StoredIdentity::Unreadable => return Err(PorchError::InvalidPassword),
            StoredIdentity::Present(IdentityRecord::Ephemeral(_)) | StoredIdentity::Absent => {
                return Err(PorchError::not_found(IDENTITY));
            }
        };

        let secret = self
            .vault
            .decrypt(&sealed, password)
            .and_then(|hex| SecretKey::from_hex(&hex).ok())
            .ok_or(PorchError::InvalidPassword)?;

        if remember {
            self.cache_key(&secret)?;
        }
        let keypair = Keypair::from_secret(secret);
        info!("Unlocked identity {}", keypair.public);
        Ok(keypair)
    }

    /// The keypair cached for this session, if any.
    pub fn get_session_key(&self) -> Option<Keypair> {
        let hex = match self.stores.session.get(SESSION_KEY) {
            Ok(Some(hex)) => Zeroizing::new(hex),
            Ok(None) => return None,
            Err(e) => {
                warn!("Session key unreadable: {e}");
                return None;
            }
        };
        match SecretKey::from_hex(&hex) {
            Ok(secret) => Some(Keypair::from_secret(secret)),
            Err(e) => {
                warn!("Discarding malformed session key: {e}");
                None
            }
        }
    }

    /// Re-populate the session cache from an ephemeral record after a restart.
    /// Returns the active public key, if any identity is usable without a password.
    pub fn resume(&self) -> PorchResult<Option<PublicKey>> {
        if let Some(keypair) = self.get_session_key() {
            return Ok(Some(keypair.public));
        }
        let StoredIdentity::Present(IdentityRecord::Ephemeral(ephemeral)) = self.stored()? else {
            return Ok(None);
        };
        let secret = match SecretKey::from_hex(&ephemeral.private_key) {
            Ok(secret) => secret,
            Err(e) => {
                warn!("Stored ephemeral key is invalid: {e}");
                return Ok(None);
            }
        };
        self.cache_key(&secret)?;
        debug!("Resumed ephemeral identity {}", secret.public_key());
        Ok(Some(secret.public_key()))
    }

    // ── Locking / reset ──────────────────────────────────────────────────────

    /// Forget the session key. The durable record is untouched.
    pub fn lock(&self) -> PorchResult<()> {
        self.stores.session.remove(SESSION_KEY).map_err(storage_failure("lock"))?;
        info!("Identity locked");
        Ok(())
    }

    /// Erase the activity ledger, the session key and the identity record.
    ///
    /// The identity record goes last: a failure on the way leaves it in place,
    /// and burning again finishes the job.
    pub fn burn_identity(&self) -> PorchResult<()> {
        self.ledger.clear().inspect_err(|e| warn!("Failed to clear activity during burn: {e}"))?;
        self.stores.session.remove(SESSION_KEY).map_err(storage_failure("burn"))?;
        self.stores.durable.remove(IDENTITY_KEY).map_err(storage_failure("burn"))?;
        info!("Identity burned");
        Ok(())
    }

    // ── Inspection ───────────────────────────────────────────────────────────

    pub fn state(&self) -> IdentityState {
        let stored = match self.stored() {
            Ok(stored) => stored,
            Err(_) => return IdentityState::NoIdentity,
        };
        let session = self.get_session_key().map(|kp| kp.public);

        match (stored, session) {
            (StoredIdentity::Present(IdentityRecord::Encrypted(_)), Some(pk)) => {
                IdentityState::UnlockedEncrypted(pk)
            }
            (StoredIdentity::Present(IdentityRecord::Ephemeral(_)), Some(pk)) => {
                IdentityState::UnlockedEphemeral(pk)
            }
            (StoredIdentity::Present(IdentityRecord::Encrypted(_)) | StoredIdentity::Unreadable, None) => {
                IdentityState::LockedEncrypted
            }
            // A locked ephemeral identity is unusable until `resume`.
            (StoredIdentity::Present(IdentityRecord::Ephemeral(_)), None) => IdentityState::NoIdentity,
            (StoredIdentity::Unreadable, Some(_)) | (StoredIdentity::Absent, _) => {
                IdentityState::NoIdentity
            }
        }
    }

    /// `nsec` encoding of the unlocked secret key.
    pub fn export_secret(&self) -> PorchResult<Zeroizing<String>> {
        let keypair = self
            .get_session_key()
            .ok_or_else(|| PorchError::not_found("Unlocked identity"))?;
        identifier::encode_nsec(&keypair.secret).map_err(PorchError::from)
    }

    // ── Storage helpers ──────────────────────────────────────────────────────

    fn stored(&self) -> PorchResult<StoredIdentity> {
        let raw = self.stores.durable.get(IDENTITY_KEY).map_err(storage_failure("read identity"))?;
        Ok(match raw {
            None => StoredIdentity::Absent,
            Some(raw) => match serde_json::from_str::<IdentityRecord>(&raw) {
                Ok(record) => StoredIdentity::Present(record),
                Err(_) => {
                    warn!("Identity record is unreadable");
                    StoredIdentity::Unreadable
                }
            },
        })
    }

    fn write_record(&self, record: &IdentityRecord) -> PorchResult<()> {
        let json = serde_json::to_string(record).map_err(|e| PorchError::Internal(e.into()))?;
        self.stores.durable.set(IDENTITY_KEY, &json).map_err(storage_failure("write identity"))
    }

    fn cache_key(&self, secret: &SecretKey) -> PorchResult<()> {
        self.stores
            .session
            .set(SESSION_KEY, &secret.to_hex())
            .map_err(storage_failure("cache session key"))
    }
}

/// Log a storage failure and surface it as [`PorchError::StorageUnavailable`].
fn storage_failure(op: &'static str) -> impl Fn(StorageError) -> PorchError {
    move |e| {
        warn!("Identity storage failure during {op}: {e}");
        PorchError::StorageUnavailable(e)
    }
}
