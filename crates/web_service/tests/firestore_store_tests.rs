//! Firestore REST store against a mock server

use std::time::Duration;

use serde_json::{json, Value};
use web_service::auth::UserId;
use web_service::storage::firestore::token::{ServiceAccountKey, ServiceAccountTokenSource};
use web_service::storage::firestore::{FirestoreAuth, FirestoreStore};
use web_service::storage::{DocumentStore, NewTrip, ProfileRecord, StorageError};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOCS: &str = "/v1/projects/demo/databases/(default)/documents";
const PRIVATE_KEY: &str = include_str!("fixtures/test_rsa_key.pem");

fn store(server: &MockServer) -> FirestoreStore {
    FirestoreStore::new(
        &format!("{}/v1", server.uri()),
        "demo",
        FirestoreAuth::Emulator,
        reqwest::Client::new(),
    )
}

fn trip_document(id: &str, user: &str, public: bool, created: &str) -> Value {
    json!({
        "name": format!("projects/demo/databases/(default)/documents/trips/{id}"),
        "fields": {
            "userId": {"stringValue": user},
            "isPublic": {"booleanValue": public},
            "createdAt": {"timestampValue": created},
            "itinerary": {"mapValue": {"fields": {"tripTitle": {"stringValue": id}}}}
        }
    })
}

#[tokio::test]
async fn test_missing_profile_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/alice")))
        .and(header("authorization", "Bearer owner"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": {"code": 404}})))
        .mount(&server)
        .await;

    let profile = store(&server)
        .load_profile(&UserId::parse("alice").unwrap())
        .await
        .unwrap();
    assert_eq!(profile, None);
}

#[tokio::test]
async fn test_load_profile_decodes_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/alice")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/demo/databases/(default)/documents/users/alice",
            "fields": {
                "mobility": {"stringValue": "wheelchair"},
                "sensory": {"stringValue": ""},
                "onboarded": {"booleanValue": true}
            }
        })))
        .mount(&server)
        .await;

    let profile = store(&server)
        .load_profile(&UserId::parse("alice").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(profile.onboarded);
    assert_eq!(profile.constraints.entries(), vec![("Mobility", "wheelchair")]);
}

#[tokio::test]
async fn test_save_profile_patches_document() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{DOCS}/users/alice")))
        .and(body_partial_json(json!({
            "fields": {
                "dietary": {"stringValue": "vegan"},
                "onboarded": {"booleanValue": true}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/demo/databases/(default)/documents/users/alice"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut profile = ProfileRecord {
        onboarded: true,
        ..Default::default()
    };
    profile.constraints.dietary = Some("vegan".to_string());
    store(&server)
        .save_profile(&UserId::parse("alice").unwrap(), &profile)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_trip_returns_assigned_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/trips")))
        .and(body_partial_json(json!({
            "fields": {
                "userId": {"stringValue": "alice"},
                "isPublic": {"booleanValue": false},
                "itinerary": {"mapValue": {"fields": {"days": {"integerValue": "3"}}}}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(trip_document(
            "auto1",
            "alice",
            false,
            "2024-05-01T10:00:00Z",
        )))
        .mount(&server)
        .await;

    let saved = store(&server)
        .add_trip(NewTrip {
            user_id: UserId::parse("alice").unwrap(),
            itinerary: json!({"days": 3}),
            is_public: false,
        })
        .await
        .unwrap();
    assert_eq!(saved.id, "auto1");
    assert_eq!(saved.user_id, "alice");
}

#[tokio::test]
async fn test_public_trips_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .and(body_partial_json(json!({
            "structuredQuery": {
                "from": [{"collectionId": "trips"}],
                "where": {"fieldFilter": {
                    "field": {"fieldPath": "isPublic"},
                    "op": "EQUAL",
                    "value": {"booleanValue": true}
                }},
                "orderBy": [{"field": {"fieldPath": "createdAt"}, "direction": "DESCENDING"}],
                "limit": 10
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": trip_document("b", "bob", true, "2024-05-02T00:00:00Z"), "readTime": "2024-06-01T00:00:00Z"},
            {"document": trip_document("a", "alice", true, "2024-05-01T00:00:00Z"), "readTime": "2024-06-01T00:00:00Z"}
        ])))
        .mount(&server)
        .await;

    let trips = store(&server).list_public_trips(10).await.unwrap();
    let ids: Vec<_> = trips.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[tokio::test]
async fn test_empty_query_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"readTime": "2024-06-01T00:00:00Z"}])),
        )
        .mount(&server)
        .await;

    assert!(store(&server).list_public_trips(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_trips_for_user_sorted_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .and(body_partial_json(json!({
            "structuredQuery": {"where": {"fieldFilter": {
                "field": {"fieldPath": "userId"},
                "value": {"stringValue": "alice"}
            }}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": trip_document("old", "alice", false, "2024-01-01T00:00:00Z")},
            {"document": trip_document("new", "alice", true, "2024-03-01T00:00:00Z")}
        ])))
        .mount(&server)
        .await;

    let trips = store(&server)
        .list_trips_for(&UserId::parse("alice").unwrap())
        .await
        .unwrap();
    let ids: Vec<_> = trips.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
}

#[tokio::test]
async fn test_malformed_trip_is_skipped() {
    let server = MockServer::start().await;
    let ownerless = json!({
        "name": "projects/demo/databases/(default)/documents/trips/orphan",
        "fields": {
            "isPublic": {"booleanValue": true},
            "itinerary": {"mapValue": {"fields": {}}}
        }
    });
    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": trip_document("good", "alice", true, "2024-03-01T00:00:00Z")},
            {"document": ownerless}
        ])))
        .mount(&server)
        .await;

    let trips = store(&server).list_public_trips(10).await.unwrap();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].id, "good");
}

#[tokio::test]
async fn test_server_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/trips")))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let err = store(&server)
        .add_trip(NewTrip {
            user_id: UserId::parse("alice").unwrap(),
            itinerary: json!({}),
            is_public: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Api { status: 503, .. }));
}

#[tokio::test]
async fn test_slow_store_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/alice")))
        .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let store = FirestoreStore::new(
        &format!("{}/v1", server.uri()),
        "demo",
        FirestoreAuth::Emulator,
        client,
    );
    let err = store
        .load_profile(&UserId::parse("alice").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Timeout));
}

#[tokio::test]
async fn test_service_account_token_is_exchanged_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/alice")))
        .and(header("authorization", "Bearer ya29.test"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let key: ServiceAccountKey = serde_json::from_value(json!({
        "client_email": "svc@demo.iam.gserviceaccount.com",
        "private_key": PRIVATE_KEY,
        "token_uri": format!("{}/token", server.uri()),
    }))
    .unwrap();
    let tokens = ServiceAccountTokenSource::new(key, reqwest::Client::new()).unwrap();
    let store = FirestoreStore::new(
        &format!("{}/v1", server.uri()),
        "demo",
        FirestoreAuth::ServiceAccount(tokens),
        reqwest::Client::new(),
    );

    let alice = UserId::parse("alice").unwrap();
    assert_eq!(store.load_profile(&alice).await.unwrap(), None);
    assert_eq!(store.load_profile(&alice).await.unwrap(), None);
}

#[tokio::test]
async fn test_bad_private_key_is_a_credentials_error() {
    let key: ServiceAccountKey = serde_json::from_value(json!({
        "client_email": "svc@demo.iam.gserviceaccount.com",
        "private_key": "not a pem",
    }))
    .unwrap();
    let err = ServiceAccountTokenSource::new(key, reqwest::Client::new())
        .err()
        .unwrap();
    assert!(matches!(err, StorageError::Credentials(_)));
}
