use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use trip_core::PersistedTrip;
use uuid::Uuid;

use super::provider::{DocumentStore, NewTrip, ProfileRecord, Result};
use crate::auth::UserId;

const TRIPS_DIR: &str = "trips";
const USERS_DIR: &str = "users";

/// One JSON file per document: `trips/<id>.json` and `users/<uid>.json`.
pub struct FileDocumentStore {
    base_dir: PathBuf,
}

impl FileDocumentStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn trips_dir(&self) -> PathBuf {
        self.base_dir.join(TRIPS_DIR)
    }

    fn profile_path(&self, user: &UserId) -> PathBuf {
        self.base_dir
            .join(USERS_DIR)
            .join(format!("{}.json", user.as_str()))
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tracing::debug!(
                    path = %parent.display(),
                    "FileStore: Creating directory"
                );
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(value)?;
        // Write to a sibling temp file first so readers never see a torn document.
        // Each write gets its own temp name; concurrent saves of one document
        // must not rename each other's file away.
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn all_trips(&self) -> Result<Vec<PersistedTrip>> {
        let dir = self.trips_dir();
        let mut trips = Vec::new();
        if !dir.exists() {
            tracing::debug!(
                base_dir = %dir.display(),
                "FileStore: Trips directory does not exist"
            );
            return Ok(trips);
        }

        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_json::<PersistedTrip>(&path).await {
                Ok(Some(trip)) => trips.push(trip),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "FileStore: Skipping unreadable trip"
                    );
                }
            }
        }

        sort_newest_first(&mut trips);
        Ok(trips)
    }
}

/// createdAt descending; ties broken by id so listings are stable.
pub(crate) fn sort_newest_first(trips: &mut [PersistedTrip]) {
    trips.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn load_profile(&self, user: &UserId) -> Result<Option<ProfileRecord>> {
        let path = self.profile_path(user);
        tracing::debug!(
            user_id = %user,
            path = %path.display(),
            "FileStore: load_profile called"
        );
        Self::read_json(&path).await
    }

    async fn save_profile(&self, user: &UserId, profile: &ProfileRecord) -> Result<()> {
        let path = self.profile_path(user);
        self.write_json(&path, profile).await?;
        tracing::info!(
            user_id = %user,
            path = %path.display(),
            "FileStore: Profile saved"
        );
        Ok(())
    }

    async fn add_trip(&self, trip: NewTrip) -> Result<PersistedTrip> {
        let record = PersistedTrip {
            id: Uuid::new_v4().simple().to_string(),
            user_id: trip.user_id.to_string(),
            itinerary: trip.itinerary,
            is_public: trip.is_public,
            created_at: Utc::now(),
        };
        let path = self.trips_dir().join(format!("{}.json", record.id));
        self.write_json(&path, &record).await?;

        tracing::info!(
            trip_id = %record.id,
            user_id = %record.user_id,
            is_public = record.is_public,
            "FileStore: Trip saved"
        );
        Ok(record)
    }

    async fn list_public_trips(&self, limit: usize) -> Result<Vec<PersistedTrip>> {
        let mut trips = self.all_trips().await?;
        trips.retain(|trip| trip.is_public);
        trips.truncate(limit);
        Ok(trips)
    }

    async fn list_trips_for(&self, user: &UserId) -> Result<Vec<PersistedTrip>> {
        let mut trips = self.all_trips().await?;
        trips.retain(|trip| trip.user_id == user.as_str());
        Ok(trips)
    }
}
