//! Caller identity.
//!
//! - `credentials` - extracting the bearer credential and asserted identity
//!   header from a request
//! - `firebase` - verification of Firebase ID tokens
//! - `jwks` - fetching and caching the signing keys

pub mod credentials;
pub mod firebase;
pub mod jwks;
pub mod user_id;

use async_trait::async_trait;
use thiserror::Error;

pub use credentials::{BearerCredential, Credentials, USER_ID_HEADER};
pub use firebase::{FirebaseVerifier, UnconfiguredVerifier};
pub use jwks::{JwksError, JwksProvider};
pub use user_id::{InvalidUserId, UserId};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token failed verification: {0}")]
    Rejected(String),

    #[error("Signing keys unavailable: {0}")]
    KeysUnavailable(#[from] JwksError),

    #[error("Identity verification is not configured")]
    Unconfigured,
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::Rejected(err.to_string())
    }
}

/// Validates a bearer credential and extracts the identity it proves.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}

/// Who is making a request, and how much we trust it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    /// Identity taken from `X-User-Id` as given. Good enough to look up
    /// constraints and to attach a best-effort save, nothing more.
    Asserted(UserId),
    /// Identity proven by a verified bearer credential.
    Verified(UserId),
}

impl Caller {
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Caller::Anonymous => None,
            Caller::Asserted(id) | Caller::Verified(id) => Some(id),
        }
    }

    pub fn verified_user_id(&self) -> Option<&UserId> {
        match self {
            Caller::Verified(id) => Some(id),
            _ => None,
        }
    }

    pub fn trust(&self) -> &'static str {
        match self {
            Caller::Anonymous => "anonymous",
            Caller::Asserted(_) => "asserted",
            Caller::Verified(_) => "verified",
        }
    }
}
