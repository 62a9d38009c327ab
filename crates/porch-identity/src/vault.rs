//! Password key vault.
//!
//! A private key (64 hex characters) is sealed under a key stretched from the
//! user's password:
//!
//! ```text
//! key        = PBKDF2-HMAC-SHA256(password, salt[16], iterations) → 32 bytes
//! ciphertext = AES-256-GCM(key, iv[12], utf8(private_key_hex))
//! record     = { ciphertext, iv, salt }   (each base64)
//! ```
//!
//! Salt and IV are drawn fresh for every [`KeyVault::encrypt`], so the same key
//! sealed twice under the same password never produces the same record.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use pbkdf2::pbkdf2_hmac;
use porch_common::{
    PorchError, PorchResult,
    config::MIN_KDF_ITERATIONS,
    crypto::{from_base64, random_bytes, to_base64},
    models::EncryptedIdentity,
    validation::{self, PasswordCheck},
};
use sha2::Sha256;
use zeroize::Zeroizing;

pub const SALT_SIZE: usize = 16;
pub const IV_SIZE: usize = 12;
pub const DERIVED_KEY_SIZE: usize = 32;

pub type DerivedKey = Zeroizing<[u8; DERIVED_KEY_SIZE]>;

#[derive(Debug, Clone, Copy)]
pub struct KeyVault {
    iterations: u32,
}

impl Default for KeyVault {
    fn default() -> Self {
        Self { iterations: MIN_KDF_ITERATIONS }
    }
}

impl KeyVault {
    /// A vault stretching passwords over `iterations` rounds, clamped to
    /// [`MIN_KDF_ITERATIONS`].
    pub fn new(iterations: u32) -> Self {
        Self { iterations: iterations.max(MIN_KDF_ITERATIONS) }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Stretch `password` into a 256-bit key. A fresh random salt is drawn when
    /// none is given; the salt actually used is returned alongside the key.
    pub fn derive_key(&self, password: &str, salt: Option<&[u8]>) -> (DerivedKey, Vec<u8>) {
        let salt = match salt {
            Some(s) => s.to_vec(),
            None => random_bytes::<SALT_SIZE>().to_vec(),
        };
        let mut key = Zeroizing::new([0u8; DERIVED_KEY_SIZE]);
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, self.iterations, key.as_mut());
        (key, salt)
    }

    /// Seal a hex-encoded private key under `password`.
    pub fn encrypt(&self, private_key_hex: &str, password: &str) -> PorchResult<EncryptedIdentity> {
        let (key, salt) = self.derive_key(password, None);
        let iv = random_bytes::<IV_SIZE>();

        let cipher = Aes256Gcm::new(&(*key).into());
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), private_key_hex.as_bytes())
            .map_err(|_| PorchError::Internal(anyhow::anyhow!("AES-GCM encryption failed")))?;

        Ok(EncryptedIdentity {
            ciphertext: to_base64(&ciphertext),
            iv: to_base64(&iv),
            salt: to_base64(&salt),
        })
    }

    /// Open a sealed record. Returns `None` for a wrong password, a tampered or
    /// truncated record, or undecodable fields. The cases are not distinguished.
    pub fn decrypt(&self, record: &EncryptedIdentity, password: &str) -> Option<Zeroizing<String>> {
        let ciphertext = from_base64(&record.ciphertext)?;
        let iv = from_base64(&record.iv)?;
        let salt = from_base64(&record.salt)?;
        if iv.len() != IV_SIZE || salt.is_empty() {
            return None;
        }

        let (key, _) = self.derive_key(password, Some(&salt));
        let cipher = Aes256Gcm::new(&(*key).into());
        let plaintext = Zeroizing::new(cipher.decrypt(Nonce::from_slice(&iv), ciphertext.as_ref()).ok()?);

        std::str::from_utf8(&plaintext).ok().map(|s| Zeroizing::new(s.to_owned()))
    }

    pub fn validate_password(&self, password: &str) -> PasswordCheck {
        validation::validate_password(password)
    }
}
