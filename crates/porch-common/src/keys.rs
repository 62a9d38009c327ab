//! secp256k1 Schnorr (BIP-340) identity keys.
//!
//! Every identity is a single keypair. The public key is the 32-byte x-only
//! encoding and is always derived from the secret, never stored on its own.
//!
//! # Hex
//! Both halves travel as lowercase hex (64 characters). Secret hex strings are
//! handed out wrapped in [`Zeroizing`] so they are wiped when dropped.

use std::fmt;

use k256::schnorr::{Signature, SigningKey, VerifyingKey};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use signature::hazmat::{PrehashSigner, PrehashVerifier};
use zeroize::Zeroizing;

/// Size of a secret key in bytes
pub const SECRET_KEY_SIZE: usize = 32;
/// Size of an x-only public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of a Schnorr signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Errors that can occur during key operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("key hex decode error")]
    Hex,

    #[error("invalid key size, expected {expected}, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("secret key is not a valid secp256k1 scalar")]
    InvalidSecret,

    #[error("public key is not a valid x-only point")]
    InvalidPublic,

    #[error("signing failed")]
    Signing,
}

// ─── Secret key ──────────────────────────────────────────────────────────────

/// The private half of an identity.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&"<redacted>").finish()
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        *self.to_bytes() == *other.to_bytes()
    }
}

impl Eq for SecretKey {}

impl SecretKey {
    /// Generate a new random secret key from the OS RNG.
    pub fn generate() -> Self {
        Self(SigningKey::random(&mut OsRng))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(KeyError::Length { expected: SECRET_KEY_SIZE, actual: bytes.len() });
        }
        SigningKey::from_bytes(bytes).map(Self).map_err(|_| KeyError::InvalidSecret)
    }

    /// Parse a secret key from a hexadecimal string.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.trim();
        let mut buff = Zeroizing::new([0u8; SECRET_KEY_SIZE]);
        if hex.len() != SECRET_KEY_SIZE * 2 {
            return Err(KeyError::Length { expected: SECRET_KEY_SIZE, actual: hex.len() / 2 });
        }
        hex::decode_to_slice(hex, buff.as_mut()).map_err(|_| KeyError::Hex)?;
        Self::from_bytes(buff.as_ref())
    }

    pub fn to_bytes(&self) -> Zeroizing<[u8; SECRET_KEY_SIZE]> {
        Zeroizing::new(self.0.to_bytes().into())
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.to_bytes()[..]))
    }

    /// Derive the public key from this secret key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().to_bytes().into())
    }

    /// Sign a 32-byte digest (an event id) with BIP-340 Schnorr.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; SIGNATURE_SIZE], KeyError> {
        let sig: Signature = self.0.sign_prehash(digest).map_err(|_| KeyError::Signing)?;
        Ok(sig.to_bytes())
    }
}

// ─── Public key ──────────────────────────────────────────────────────────────

/// The public half of an identity: a 32-byte x-only key, serialized as hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_hex()
    }
}

impl TryFrom<String> for PublicKey {
    type Error = KeyError;
    fn try_from(hex: String) -> Result<Self, Self::Error> {
        PublicKey::from_hex(&hex)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(KeyError::Length { expected: PUBLIC_KEY_SIZE, actual: bytes.len() });
        }
        VerifyingKey::from_bytes(bytes).map_err(|_| KeyError::InvalidPublic)?;
        let mut buff = [0u8; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(bytes);
        Ok(PublicKey(buff))
    }
}

impl PublicKey {
    /// Parse a public key from a hexadecimal string (case-insensitive).
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex.trim()).map_err(|_| KeyError::Hex)?;
        Self::try_from(bytes.as_slice())
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a Schnorr signature over a 32-byte digest.
    pub fn verify_digest(&self, digest: &[u8; 32], sig: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(sig) = Signature::try_from(sig) else {
            return false;
        };
        key.verify_prehash(digest, &sig).is_ok()
    }
}

// ─── Keypair ─────────────────────────────────────────────────────────────────

/// A secret key together with its derived public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keypair {
    pub secret: SecretKey,
    pub public: PublicKey,
}

impl Keypair {
    pub fn generate() -> Self {
        Self::from_secret(SecretKey::generate())
    }

    pub fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    #[test]
    fn hex_round_trip_preserves_public_key() {
        let kp = Keypair::generate();
        let recovered = SecretKey::from_hex(&kp.secret.to_hex()).unwrap();
        assert_eq!(recovered.public_key(), kp.public);
        assert_eq!(PublicKey::from_hex(&kp.public.to_hex()).unwrap(), kp.public);
    }

    #[test]
    fn sign_and_verify_digest() {
        let kp = Keypair::generate();
        let digest: [u8; 32] = Sha256::digest(b"hello porch").into();
        let sig = kp.secret.sign_digest(&digest).unwrap();

        assert!(kp.public.verify_digest(&digest, &sig));

        let other: [u8; 32] = Sha256::digest(b"hello porch?").into();
        assert!(!kp.public.verify_digest(&other, &sig));
        assert!(!Keypair::generate().public.verify_digest(&digest, &sig));
    }

    #[test]
    fn rejects_malformed_secret_hex() {
        assert_eq!(SecretKey::from_hex("abcd"), Err(KeyError::Length { expected: 32, actual: 2 }));
        assert_eq!(SecretKey::from_hex(&"zz".repeat(32)), Err(KeyError::Hex));
        // zero is not a valid scalar
        assert_eq!(SecretKey::from_hex(&"00".repeat(32)), Err(KeyError::InvalidSecret));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let sk = SecretKey::generate();
        let shown = format!("{sk:?}");
        assert!(!shown.contains(sk.to_hex().as_str()));
    }

    #[test]
    fn public_key_serializes_as_hex_string() {
        let kp = Keypair::generate();
        let json = serde_json::to_string(&kp.public).unwrap();
        assert_eq!(json, format!("\"{}\"", kp.public.to_hex()));
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kp.public);
    }
}
