//! Signing key fetching and caching.
//!
//! Keys are cached for a TTL. A lookup for an unknown `kid` forces one refresh
//! so rotated keys are picked up before the cache expires. Forced refreshes are
//! spaced at least `MIN_FORCED_REFRESH_INTERVAL` apart; unknown kids inside that
//! window are rejected from the cache.

use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

/// Maximum allowed JWKS response size (1 MB)
const MAX_JWKS_RESPONSE_SIZE: u64 = 1024 * 1024;

pub const DEFAULT_JWKS_TTL: Duration = Duration::from_secs(3600);
pub const MIN_FORCED_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("Failed to fetch JWKS: {0}")]
    Fetch(String),

    #[error("Failed to parse JWKS: {0}")]
    Parse(String),

    #[error("Key not found for kid: {0}")]
    KeyNotFound(String),

    #[error("Response too large: {0} bytes (max: {1})")]
    ResponseTooLarge(u64, u64),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}

struct CachedJwks {
    jwks: JwkSet,
    fetched_at: Instant,
}

pub struct JwksProvider {
    client: reqwest::Client,
    jwks_uri: String,
    cache: RwLock<Option<CachedJwks>>,
    ttl: Duration,
    last_forced_refresh: Mutex<Option<Instant>>,
}

impl JwksProvider {
    pub fn new(
        jwks_uri: impl Into<String>,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Self, JwksError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| JwksError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            jwks_uri: jwks_uri.into(),
            cache: RwLock::new(None),
            ttl,
            last_forced_refresh: Mutex::new(None),
        })
    }

    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, JwksError> {
        debug!("Fetching JWKS from: {}", self.jwks_uri);

        let response = self
            .client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Fetch(format!("HTTP {}", response.status())));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_JWKS_RESPONSE_SIZE {
                return Err(JwksError::ResponseTooLarge(
                    content_length,
                    MAX_JWKS_RESPONSE_SIZE,
                ));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        if bytes.len() as u64 > MAX_JWKS_RESPONSE_SIZE {
            return Err(JwksError::ResponseTooLarge(
                bytes.len() as u64,
                MAX_JWKS_RESPONSE_SIZE,
            ));
        }

        let jwks: JwkSet =
            serde_json::from_slice(&bytes).map_err(|e| JwksError::Parse(e.to_string()))?;

        debug!("Fetched JWKS with {} keys", jwks.keys.len());
        Ok(jwks)
    }

    fn store(&self, jwks: JwkSet) {
        *self.cache.write() = Some(CachedJwks {
            jwks,
            fetched_at: Instant::now(),
        });
    }

    fn cached_key(&self, kid: &str) -> Option<Option<Jwk>> {
        let cache = self.cache.read();
        let cached = cache.as_ref()?;
        if cached.fetched_at.elapsed() > self.ttl {
            return None;
        }
        Some(cached.jwks.find(kid).cloned())
    }

    /// Claims the forced-refresh slot if the last one is old enough.
    fn try_begin_forced_refresh(&self) -> bool {
        let mut last = self.last_forced_refresh.lock();
        match *last {
            Some(at) if at.elapsed() < MIN_FORCED_REFRESH_INTERVAL => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }

    /// Get a specific key by kid (key ID).
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, JwksError> {
        match self.cached_key(kid) {
            Some(Some(key)) => return Ok(key),
            Some(None) if self.try_begin_forced_refresh() => {
                warn!("Key {} not found in cached JWKS, refreshing...", kid)
            }
            Some(None) => {
                debug!("Key {} not found, JWKS refreshed too recently", kid);
                return Err(JwksError::KeyNotFound(kid.to_string()));
            }
            None => {}
        }

        let jwks = self.fetch_jwks().await?;
        let key = jwks.find(kid).cloned();
        self.store(jwks);

        key.ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn jwks_body(kids: &[&str]) -> serde_json::Value {
        let keys: Vec<_> = kids
            .iter()
            .map(|kid| {
                json!({
                    "kty": "RSA",
                    "kid": kid,
                    "alg": "RS256",
                    "use": "sig",
                    "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
                    "e": "AQAB"
                })
            })
            .collect();
        json!({ "keys": keys })
    }

    fn provider(server: &MockServer) -> JwksProvider {
        JwksProvider::new(
            format!("{}/jwks", server.uri()),
            DEFAULT_JWKS_TTL,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_keys_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&["k1"])))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server);
        assert!(provider.get_key("k1").await.is_ok());
        assert!(provider.get_key("k1").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_kid_forces_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&["k1"])))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(&server);
        provider.get_key("k1").await.unwrap();
        let err = provider.get_key("rotated").await.unwrap_err();
        assert!(matches!(err, JwksError::KeyNotFound(ref kid) if kid == "rotated"));
    }

    #[tokio::test]
    async fn test_unknown_kids_refresh_at_most_once_per_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&["k1"])))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(&server);
        provider.get_key("k1").await.unwrap();
        for kid in ["bogus-1", "bogus-2", "bogus-3"] {
            let err = provider.get_key(kid).await.unwrap_err();
            assert!(matches!(err, JwksError::KeyNotFound(ref k) if k == kid));
        }
        assert!(provider.get_key("k1").await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = provider(&server).get_key("k1").await.unwrap_err();
        assert!(matches!(err, JwksError::Fetch(ref msg) if msg.contains("503")));
    }
}
