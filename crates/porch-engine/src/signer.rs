//! Supplies a signing keypair to the write-through operations.

use porch_common::{Keypair, PorchError, PorchResult, models::IdentityState};
use porch_identity::IdentitySession;
use tracing::info;

/// The keypair to sign with, creating a frictionless identity when there is none.
///
/// A locked encrypted identity is never replaced; the caller has to unlock it.
pub fn ensure_signer(session: &IdentitySession) -> PorchResult<Keypair> {
    if let Some(keypair) = session.get_session_key() {
        return Ok(keypair);
    }
    if session.state() == IdentityState::LockedEncrypted {
        return Err(PorchError::not_found("Unlocked identity"));
    }
    if session.resume()?.is_none() {
        let public = session.create_identity(None)?;
        info!("Created ephemeral identity {public} to sign with");
    }
    session
        .get_session_key()
        .ok_or_else(|| PorchError::not_found("Unlocked identity"))
}

#[cfg(test)]
mod tests {
    use porch_identity::KeyVault;
    use porch_store::Stores;

    use super::*;

    fn session() -> IdentitySession {
        IdentitySession::new(Stores::in_memory(), KeyVault::default())
    }

    #[test]
    fn creates_ephemeral_identity_on_demand() {
        let session = session();
        let keypair = ensure_signer(&session).unwrap();
        assert_eq!(session.state(), IdentityState::UnlockedEphemeral(keypair.public));
        assert_eq!(ensure_signer(&session).unwrap(), keypair);
    }

    #[test]
    fn resumes_a_locked_ephemeral_identity() {
        let session = session();
        let first = ensure_signer(&session).unwrap();
        session.lock().unwrap();
        assert_eq!(ensure_signer(&session).unwrap(), first);
    }

    #[test]
    fn locked_encrypted_identity_is_not_replaced() {
        let session = session();
        session.create_identity(Some("correcthorse")).unwrap();
        assert!(matches!(ensure_signer(&session), Err(PorchError::NotFound { .. })));

        let unlocked = session.unlock("correcthorse", true).unwrap();
        assert_eq!(ensure_signer(&session).unwrap(), unlocked);
    }
}
