//! Firestore document store over the REST v1 API.
//!
//! Collections:
//! - `users/<uid>`: `{mobility, sensory, dietary, onboarded}`
//! - `trips/<auto id>`: `{userId, itinerary, isPublic, createdAt}`

pub mod token;
pub mod value;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use trip_core::PersistedTrip;

use self::token::{ServiceAccountKey, ServiceAccountTokenSource};
use super::file_provider::sort_newest_first;
use super::provider::{DocumentStore, NewTrip, ProfileRecord, Result, StorageError};
use crate::auth::UserId;
use crate::config::FirebaseConfig;

pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const TRIPS: &str = "trips";
const USERS: &str = "users";
/// Token the emulator accepts as an administrator.
const EMULATOR_TOKEN: &str = "owner";

pub enum FirestoreAuth {
    Emulator,
    ServiceAccount(ServiceAccountTokenSource),
}

pub struct FirestoreStore {
    client: Client,
    documents_url: String,
    auth: FirestoreAuth,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    #[serde(default)]
    create_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<Document>,
}

impl FirestoreStore {
    pub fn new(base_url: &str, project_id: &str, auth: FirestoreAuth, client: Client) -> Self {
        Self {
            client,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                base_url.trim_end_matches('/'),
                project_id
            ),
            auth,
        }
    }

    /// Emulator when `emulator_host` is set, otherwise the production API
    /// authenticated with the service-account key file.
    pub fn from_config(firebase: &FirebaseConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        if let Some(host) = &firebase.emulator_host {
            let project_id = firebase.project_id.as_deref().ok_or_else(|| {
                StorageError::Credentials("FIREBASE_PROJECT_ID is required".to_string())
            })?;
            tracing::info!(emulator = %host, "Firestore: Using emulator");
            return Ok(Self::new(
                &format!("http://{host}/v1"),
                project_id,
                FirestoreAuth::Emulator,
                client,
            ));
        }

        let key = ServiceAccountKey::from_file(&firebase.credentials_file)?;
        let project_id = firebase
            .project_id
            .clone()
            .or_else(|| key.project_id.clone())
            .ok_or_else(|| {
                StorageError::Credentials("FIREBASE_PROJECT_ID is required".to_string())
            })?;
        let tokens = ServiceAccountTokenSource::new(key, client.clone())?;

        Ok(Self::new(
            FIRESTORE_BASE_URL,
            &project_id,
            FirestoreAuth::ServiceAccount(tokens),
            client,
        ))
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = match &self.auth {
            FirestoreAuth::Emulator => EMULATOR_TOKEN.to_string(),
            FirestoreAuth::ServiceAccount(tokens) => tokens.access_token().await?,
        };
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StorageError::Timeout
                } else {
                    StorageError::Request(e)
                }
            })?;
        Ok(response)
    }

    async fn expect_success(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Api { status, body })
    }

    async fn run_query(&self, structured_query: Value) -> Result<Vec<PersistedTrip>> {
        let url = format!("{}:runQuery", self.documents_url);
        let request = self
            .client
            .post(&url)
            .json(&json!({ "structuredQuery": structured_query }));
        let response = Self::expect_success(self.send(request).await?).await?;
        let items: Vec<RunQueryItem> = response.json().await?;

        let trips = items
            .into_iter()
            .filter_map(|item| item.document)
            .filter_map(|doc| match trip_from_document(doc) {
                Ok(trip) => Some(trip),
                Err(e) => {
                    tracing::warn!(error = %e, "Firestore: Skipping malformed trip");
                    None
                }
            })
            .collect();
        Ok(trips)
    }
}

fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn malformed(doc: &Document, reason: impl Into<String>) -> StorageError {
    StorageError::Malformed {
        id: document_id(&doc.name).to_string(),
        reason: reason.into(),
    }
}

/// Trips written before `isPublic`/`createdAt` existed fall back to private
/// and the document's create time.
fn trip_from_document(doc: Document) -> Result<PersistedTrip> {
    let fields = value::decode_fields(&doc.fields).map_err(|reason| malformed(&doc, reason))?;

    let user_id = fields
        .get("userId")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(&doc, "missing userId"))?
        .to_string();
    let created_at = fields
        .get("createdAt")
        .and_then(Value::as_str)
        .or(doc.create_time.as_deref())
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| malformed(&doc, "missing createdAt"))?;

    Ok(PersistedTrip {
        id: document_id(&doc.name).to_string(),
        user_id,
        itinerary: fields.get("itinerary").cloned().unwrap_or(Value::Null),
        is_public: fields
            .get("isPublic")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        created_at,
    })
}

fn field_equals(field: &str, value: Value) -> Value {
    json!({
        "fieldFilter": {
            "field": { "fieldPath": field },
            "op": "EQUAL",
            "value": value::encode(&value),
        }
    })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn load_profile(&self, user: &UserId) -> Result<Option<ProfileRecord>> {
        let url = format!("{}/{}/{}", self.documents_url, USERS, user.as_str());
        let response = self.send(self.client.get(&url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(user_id = %user, "Firestore: No profile document");
            return Ok(None);
        }
        let doc: Document = Self::expect_success(response).await?.json().await?;

        let fields = value::decode_fields(&doc.fields).map_err(|reason| malformed(&doc, reason))?;
        let profile: ProfileRecord = serde_json::from_value(Value::Object(fields))
            .map_err(|e| malformed(&doc, e.to_string()))?;
        Ok(Some(profile))
    }

    async fn save_profile(&self, user: &UserId, profile: &ProfileRecord) -> Result<()> {
        let url = format!("{}/{}/{}", self.documents_url, USERS, user.as_str());
        let fields = match serde_json::to_value(profile)? {
            Value::Object(map) => value::encode_fields(&map),
            _ => Map::new(),
        };
        let request = self.client.patch(&url).json(&json!({ "fields": fields }));
        Self::expect_success(self.send(request).await?).await?;

        tracing::info!(user_id = %user, "Firestore: Profile saved");
        Ok(())
    }

    async fn add_trip(&self, trip: NewTrip) -> Result<PersistedTrip> {
        let url = format!("{}/{}", self.documents_url, TRIPS);
        let mut fields = Map::new();
        fields.insert(
            "userId".to_string(),
            value::encode(&Value::String(trip.user_id.to_string())),
        );
        fields.insert("itinerary".to_string(), value::encode(&trip.itinerary));
        fields.insert(
            "isPublic".to_string(),
            value::encode(&Value::Bool(trip.is_public)),
        );
        fields.insert(
            "createdAt".to_string(),
            value::encode_timestamp(&Utc::now()),
        );

        let request = self.client.post(&url).json(&json!({ "fields": fields }));
        let doc: Document = Self::expect_success(self.send(request).await?)
            .await?
            .json()
            .await?;
        let record = trip_from_document(doc)?;

        tracing::info!(
            trip_id = %record.id,
            user_id = %record.user_id,
            is_public = record.is_public,
            "Firestore: Trip saved"
        );
        Ok(record)
    }

    async fn list_public_trips(&self, limit: usize) -> Result<Vec<PersistedTrip>> {
        self.run_query(json!({
            "from": [{ "collectionId": TRIPS }],
            "where": field_equals("isPublic", Value::Bool(true)),
            "orderBy": [{ "field": { "fieldPath": "createdAt" }, "direction": "DESCENDING" }],
            "limit": limit,
        }))
        .await
    }

    async fn list_trips_for(&self, user: &UserId) -> Result<Vec<PersistedTrip>> {
        // Sorted here rather than in the query to avoid needing a composite index.
        let mut trips = self
            .run_query(json!({
                "from": [{ "collectionId": TRIPS }],
                "where": field_equals("userId", Value::String(user.to_string())),
            }))
            .await?;
        sort_newest_first(&mut trips);
        Ok(trips)
    }
}
