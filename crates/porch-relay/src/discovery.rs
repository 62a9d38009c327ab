//! Domain-identity verification.
//!
//! A profile may claim `name@domain`. The claim holds when
//! `GET https://<domain>/.well-known/nostr.json?name=<name>` answers
//!
//! ```json
//! { "names": { "<name>": "<author pubkey hex>" } }
//! ```
//!
//! A bare `domain` claims the name `_`. Any failure (bad claim, unreachable
//! host, bad JSON, mismatched key) counts as unverified. Results are cached
//! in memory for the configured TTL.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use porch_common::{PublicKey, config::VerificationConfig};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::RelayError;

/// Checks a profile's domain-identity claim against the author's key.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, claim: &str, pubkey: &PublicKey) -> bool;
}

#[derive(Debug, Deserialize)]
struct WellKnownNames {
    #[serde(default)]
    names: HashMap<String, String>,
}

// ─── Cache ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct CacheEntry {
    verified: bool,
    checked_at: Instant,
}

/// Resolves claims over HTTPS. Cheap to clone; clones share the cache.
#[derive(Debug, Clone)]
pub struct WellKnownVerifier {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
    http: reqwest::Client,
    ttl: Duration,
}

impl WellKnownVerifier {
    pub fn new(timeout: Duration, ttl: Duration) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("porch/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { inner: Arc::new(RwLock::new(HashMap::new())), http, ttl })
    }

    pub fn from_config(config: &VerificationConfig) -> Result<Self, RelayError> {
        Self::new(Duration::from_secs(config.timeout_secs), Duration::from_secs(config.cache_ttl_secs))
    }

    /// Forget a cached result.
    pub async fn invalidate(&self, claim: &str, pubkey: &PublicKey) {
        self.inner.write().await.remove(&cache_key(claim, pubkey));
    }

    async fn do_verify(&self, claim: &str, pubkey: &PublicKey) -> bool {
        let Some((name, domain)) = parse_claim(claim) else {
            debug!("Malformed identity claim '{claim}'");
            return false;
        };
        let Ok(mut url) = url::Url::parse(&format!("https://{domain}/.well-known/nostr.json")) else {
            return false;
        };
        url.query_pairs_mut().append_pair("name", &name);

        let resp = match self.http.get(url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                debug!("{domain} answered {} for '{name}'", resp.status());
                return false;
            }
            Err(e) => {
                debug!("Verification request to {domain} failed: {e}");
                return false;
            }
        };
        let Ok(body) = resp.json::<WellKnownNames>().await else {
            return false;
        };
        body.names
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
            .is_some_and(|(_, key)| key.eq_ignore_ascii_case(&pubkey.to_hex()))
    }
}

#[async_trait]
impl IdentityVerifier for WellKnownVerifier {
    async fn verify(&self, claim: &str, pubkey: &PublicKey) -> bool {
        let key = cache_key(claim, pubkey);
        {
            let cache = self.inner.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.checked_at.elapsed() < self.ttl {
                    debug!("Verification cache hit: {claim} → {}", entry.verified);
                    return entry.verified;
                }
            }
        }

        let verified = self.do_verify(claim, pubkey).await;

        self.inner
            .write()
            .await
            .insert(key, CacheEntry { verified, checked_at: Instant::now() });
        verified
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn cache_key(claim: &str, pubkey: &PublicKey) -> String {
    format!("{}|{pubkey}", claim.trim().to_lowercase())
}

/// Split `name@domain` (or a bare `domain`) into lowercase `(name, domain)`.
fn parse_claim(claim: &str) -> Option<(String, String)> {
    let claim = claim.trim().to_lowercase();
    let (name, domain) = match claim.split_once('@') {
        Some((name, domain)) => (name.to_owned(), domain.to_owned()),
        None => ("_".to_owned(), claim),
    };
    let name_ok = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | ':'));
    (name_ok && domain_ok).then_some((name, domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use porch_common::Keypair;

    #[test]
    fn claim_parsing() {
        assert_eq!(parse_claim("Bob@Example.com"), Some(("bob".into(), "example.com".into())));
        assert_eq!(parse_claim("example.com"), Some(("_".into(), "example.com".into())));
        assert_eq!(parse_claim("bob@localhost"), None);
        assert_eq!(parse_claim("bob@evil.com/path"), None);
        assert_eq!(parse_claim("@example.com"), None);
        assert_eq!(parse_claim("bo b@example.com"), None);
    }

    #[tokio::test]
    async fn malformed_claims_are_unverified_and_cached() {
        let verifier = WellKnownVerifier::new(Duration::from_secs(1), Duration::from_secs(60)).unwrap();
        let pk = Keypair::generate().public;

        assert!(!verifier.verify("not a claim", &pk).await);
        assert!(verifier.inner.read().await.contains_key(&cache_key("not a claim", &pk)));

        verifier.invalidate("not a claim", &pk).await;
        assert!(verifier.inner.read().await.is_empty());
    }
}
