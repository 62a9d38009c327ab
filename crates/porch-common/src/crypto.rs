//! Small crypto-adjacent helpers shared by the vault and the identifier codec.
//!
//! - **Randomness**: OS-backed random byte arrays for salts and nonces.
//! - **Base64**: standard alphabet, padded, as persisted in identity records.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use rand_core::{OsRng, RngCore};

/// Fill a fresh `N`-byte array from the operating system RNG.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Encode arbitrary bytes to base64 (standard alphabet, padded).
pub fn to_base64(bytes: &[u8]) -> String {
    B64.encode(bytes)
}

/// Decode base64 to bytes, returning `None` on failure.
pub fn from_base64(encoded: &str) -> Option<Vec<u8>> {
    B64.decode(encoded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_differ() {
        let a: [u8; 16] = random_bytes();
        let b: [u8; 16] = random_bytes();
        assert_ne!(a, b);
    }

    #[test]
    fn base64_rejects_garbage() {
        assert_eq!(from_base64(&to_base64(b"porch")).as_deref(), Some(&b"porch"[..]));
        assert!(from_base64("not base64!!").is_none());
    }
}
