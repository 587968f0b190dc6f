//! Firebase ID token verification.
//!
//! An ID token is an RS256 JWT signed by one of Google's rotating
//! `securetoken` keys, with `aud` set to the project id and `iss` set to
//! `https://securetoken.google.com/<project id>`. Its `sub` is the uid.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use super::jwks::{JwksError, JwksProvider};
use super::user_id::UserId;
use super::{AuthError, IdentityVerifier};

/// Allowed clock skew in seconds.
const LEEWAY_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
}

pub struct FirebaseVerifier {
    keys: Arc<JwksProvider>,
    validation: Validation,
}

impl FirebaseVerifier {
    pub fn new(project_id: &str, keys: Arc<JwksProvider>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[project_id]);
        validation.set_issuer(&[Self::issuer_for(project_id)]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);
        validation.leeway = LEEWAY_SECS;

        Self { keys, validation }
    }

    pub fn issuer_for(project_id: &str) -> String {
        format!("https://securetoken.google.com/{project_id}")
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Malformed(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::Rejected(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::Malformed("token header has no kid".to_string()))?;

        let jwk = match self.keys.get_key(&kid).await {
            Ok(jwk) => jwk,
            Err(JwksError::KeyNotFound(kid)) => {
                return Err(AuthError::Rejected(format!("unknown signing key {kid}")))
            }
            Err(e) => return Err(AuthError::KeysUnavailable(e)),
        };
        let key = DecodingKey::from_jwk(&jwk)?;

        let data = decode::<IdTokenClaims>(token, &key, &self.validation)?;
        let uid = UserId::parse(&data.claims.sub)
            .map_err(|_| AuthError::Rejected("subject is not a valid uid".to_string()))?;

        debug!(user_id = %uid, "ID token verified");
        Ok(uid)
    }
}

/// Rejects every credential. Used when no Firebase project is configured, so
/// operations needing a verified caller fail closed.
pub struct UnconfiguredVerifier;

#[async_trait]
impl IdentityVerifier for UnconfiguredVerifier {
    async fn verify(&self, _token: &str) -> Result<UserId, AuthError> {
        Err(AuthError::Unconfigured)
    }
}
