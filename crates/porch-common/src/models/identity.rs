//! Identity records as persisted in the durable store, and the derived lifecycle state.

use serde::{Deserialize, Serialize};

use crate::keys::PublicKey;

/// A password-encrypted private key. All three fields are base64.
///
/// `salt` and `iv` are fresh for every encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedIdentity {
    pub ciphertext: String,
    pub iv: String,
    pub salt: String,
}

/// A frictionless identity stored without a password. Both halves are hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EphemeralIdentity {
    pub private_key: String,
    pub public_key: String,
}

/// The single identity record a profile may hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdentityRecord {
    Encrypted(EncryptedIdentity),
    Ephemeral(EphemeralIdentity),
}

/// Where the identity lifecycle currently stands. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityState {
    NoIdentity,
    LockedEncrypted,
    UnlockedEphemeral(PublicKey),
    UnlockedEncrypted(PublicKey),
}

impl IdentityState {
    pub fn public_key(&self) -> Option<PublicKey> {
        match self {
            Self::UnlockedEphemeral(pk) | Self::UnlockedEncrypted(pk) => Some(*pk),
            Self::NoIdentity | Self::LockedEncrypted => None,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.public_key().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_record_picks_the_right_variant() {
        let enc: IdentityRecord =
            serde_json::from_str(r#"{"ciphertext":"YQ==","iv":"Yg==","salt":"Yw=="}"#).unwrap();
        assert!(matches!(enc, IdentityRecord::Encrypted(_)));

        let eph: IdentityRecord =
            serde_json::from_str(r#"{"privateKey":"aa","publicKey":"bb"}"#).unwrap();
        assert!(matches!(eph, IdentityRecord::Ephemeral(_)));
    }
}
