use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use trip_core::{PersistedTrip, UserConstraints};

use crate::auth::UserId;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Store returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Store credentials error: {0}")]
    Credentials(String),

    #[error("Malformed document {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("Store call timed out")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// A user's stored profile: their constraints and whether onboarding is done.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(flatten)]
    pub constraints: UserConstraints,
    #[serde(default)]
    pub onboarded: bool,
}

/// A trip about to be written. The store assigns `id` and `createdAt`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrip {
    pub user_id: UserId,
    pub itinerary: Value,
    pub is_public: bool,
}

/// Persistent document store holding user profiles and trips.
///
/// Trips are append-only: there is no update or delete.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load_profile(&self, user: &UserId) -> Result<Option<ProfileRecord>>;

    async fn save_profile(&self, user: &UserId, profile: &ProfileRecord) -> Result<()>;

    async fn add_trip(&self, trip: NewTrip) -> Result<PersistedTrip>;

    /// Public trips, newest first, at most `limit`.
    async fn list_public_trips(&self, limit: usize) -> Result<Vec<PersistedTrip>>;

    /// Every trip owned by `user`, newest first.
    async fn list_trips_for(&self, user: &UserId) -> Result<Vec<PersistedTrip>>;
}
