#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use trip_core::{PersistedTrip, Prompt, RawOutput};
use trip_llm::{GenerationClient, LLMError};
use web_service::auth::{AuthError, IdentityVerifier, UserId};
use web_service::services::{Pipeline, PipelineSettings};
use web_service::storage::{
    DocumentStore, FileDocumentStore, NewTrip, ProfileRecord, StorageError,
};
use web_service::AppState;

/// Builds the routed app with CORS and tracing, the way `run` mounts it.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state))
                .wrap(web_service::cors())
                .wrap(web_service::middleware::TracingMiddleware)
                .configure(web_service::app_config),
        )
        .await
    };
}

pub const KYOTO_ITINERARY: &str = r#"{
  "tripTitle": "Temples of Kyoto",
  "destination": "Kyoto, Japan",
  "itinerary": [
    {"day": 1, "title": "Higashiyama", "activities": [
      {"time": "9:00 AM", "description": "Kiyomizu-dera via the ramped path", "category": "Sightseeing", "lat": 34.9949, "lng": 135.785}
    ]},
    {"day": 2, "title": "Arashiyama", "activities": [
      {"time": "10:00 AM", "description": "Tenryu-ji gardens", "category": "Sightseeing", "lat": 35.0156, "lng": 135.6738},
      {"time": "1:00 PM", "description": "Shigetsu vegetarian lunch", "category": "Food", "lat": 35.0158, "lng": 135.6741}
    ]},
    {"day": 3, "title": "Northern temples", "activities": [
      {"time": "9:30 AM", "description": "Kinkaku-ji", "category": "Sightseeing", "lat": 35.0394, "lng": 135.7292}
    ]}
  ]
}"#;

/// Replays scripted outputs in order and records every prompt.
pub struct ScriptedClient {
    outputs: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(outputs: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            outputs: Mutex::new(
                outputs
                    .into_iter()
                    .map(|o| o.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Always answers with `text`.
    pub fn repeating(text: &str, times: usize) -> Arc<Self> {
        Self::new(vec![Ok(text); times])
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, prompt: &Prompt) -> trip_llm::Result<RawOutput> {
        self.prompts.lock().push(prompt.text().to_string());
        match self.outputs.lock().pop_front() {
            Some(Ok(text)) => Ok(RawOutput::from_fragments([text])),
            Some(Err(msg)) => Err(LLMError::Api(msg)),
            None => Err(LLMError::Api("no scripted output left".to_string())),
        }
    }
}

/// Accepts `valid-<uid>` tokens and rejects everything else.
pub struct StubVerifier;

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let uid = token
            .strip_prefix("valid-")
            .ok_or_else(|| AuthError::Rejected("bad signature".to_string()))?;
        UserId::parse(uid).map_err(|e| AuthError::Rejected(e.to_string()))
    }
}

/// Every call fails as if the backend were down.
pub struct FailingStore;

fn down() -> StorageError {
    StorageError::Api {
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn load_profile(&self, _user: &UserId) -> Result<Option<ProfileRecord>, StorageError> {
        Err(down())
    }

    async fn save_profile(
        &self,
        _user: &UserId,
        _profile: &ProfileRecord,
    ) -> Result<(), StorageError> {
        Err(down())
    }

    async fn add_trip(&self, _trip: NewTrip) -> Result<PersistedTrip, StorageError> {
        Err(down())
    }

    async fn list_public_trips(&self, _limit: usize) -> Result<Vec<PersistedTrip>, StorageError> {
        Err(down())
    }

    async fn list_trips_for(&self, _user: &UserId) -> Result<Vec<PersistedTrip>, StorageError> {
        Err(down())
    }
}

pub fn uid(raw: &str) -> UserId {
    UserId::parse(raw).unwrap()
}

/// A pipeline over a scripted client, the stub verifier and a file store in
/// a temp dir. Keep the harness alive for as long as the store is used.
pub struct Harness {
    pub client: Arc<ScriptedClient>,
    pub store: Arc<FileDocumentStore>,
    _dir: TempDir,
}

impl Harness {
    pub fn new(client: Arc<ScriptedClient>) -> Self {
        let dir = TempDir::new().unwrap();
        Self {
            client,
            store: Arc::new(FileDocumentStore::new(dir.path())),
            _dir: dir,
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.client.clone(),
            Arc::new(StubVerifier),
            self.store.clone(),
            settings(),
        )
    }

    pub fn state(&self) -> AppState {
        AppState {
            pipeline: self.pipeline(),
        }
    }

    /// Waits for background saves to land.
    pub async fn trips_for(&self, user: &str, expected: usize) -> Vec<PersistedTrip> {
        for _ in 0..50 {
            let trips = self.store.list_trips_for(&uid(user)).await.unwrap();
            if trips.len() >= expected {
                return trips;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.store.list_trips_for(&uid(user)).await.unwrap()
    }
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        upstream_timeout: Duration::from_secs(5),
        schema_retries: 0,
    }
}

pub fn failing_store_state(client: Arc<ScriptedClient>) -> AppState {
    AppState {
        pipeline: Pipeline::new(
            client,
            Arc::new(StubVerifier),
            Arc::new(FailingStore),
            settings(),
        ),
    }
}
