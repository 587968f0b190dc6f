//! ID token verification against a mock key endpoint

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use web_service::auth::{AuthError, FirebaseVerifier, IdentityVerifier, JwksProvider};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "trip-planner-test";
const PRIVATE_KEY: &[u8] = include_bytes!("fixtures/test_rsa_key.pem");
const JWKS: &str = include_str!("fixtures/test_jwks.json");

async fn verifier() -> (MockServer, FirebaseVerifier) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::from_str::<Value>(JWKS).unwrap()),
        )
        .mount(&server)
        .await;

    let keys = JwksProvider::new(
        format!("{}/jwks", server.uri()),
        Duration::from_secs(60),
        Duration::from_secs(5),
    )
    .unwrap();
    let verifier = FirebaseVerifier::new(PROJECT, Arc::new(keys));
    (server, verifier)
}

fn claims(sub: &str) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "sub": sub,
        "aud": PROJECT,
        "iss": format!("https://securetoken.google.com/{PROJECT}"),
        "iat": now,
        "exp": now + 3600,
    })
}

fn sign(claims: &Value, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &EncodingKey::from_rsa_pem(PRIVATE_KEY).unwrap()).unwrap()
}

#[tokio::test]
async fn test_valid_token_yields_uid() {
    let (_server, verifier) = verifier().await;
    let token = sign(&claims("uid_123"), "test-key-1");

    let uid = verifier.verify(&token).await.unwrap();
    assert_eq!(uid.as_str(), "uid_123");
}

#[tokio::test]
async fn test_wrong_audience_is_rejected() {
    let (_server, verifier) = verifier().await;
    let mut claims = claims("uid_123");
    claims["aud"] = json!("someone-elses-project");

    let err = verifier.verify(&sign(&claims, "test-key-1")).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected(_)));
}

#[tokio::test]
async fn test_wrong_issuer_is_rejected() {
    let (_server, verifier) = verifier().await;
    let mut claims = claims("uid_123");
    claims["iss"] = json!("https://evil.example.com");

    let err = verifier.verify(&sign(&claims, "test-key-1")).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected(_)));
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let (_server, verifier) = verifier().await;
    let mut claims = claims("uid_123");
    claims["exp"] = json!(Utc::now().timestamp() - 3600);

    let err = verifier.verify(&sign(&claims, "test-key-1")).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected(_)));
}

#[tokio::test]
async fn test_unknown_kid_is_rejected() {
    let (_server, verifier) = verifier().await;
    let err = verifier
        .verify(&sign(&claims("uid_123"), "not-a-google-key"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Rejected(ref msg) if msg.contains("not-a-google-key")));
}

#[tokio::test]
async fn test_tampered_token_is_rejected() {
    let (_server, verifier) = verifier().await;
    let token = sign(&claims("uid_123"), "test-key-1");
    let forged = sign(&claims("admin"), "test-key-1");

    // Signature of one token on the payload of another.
    let mut parts: Vec<&str> = token.split('.').collect();
    let forged_payload = forged.split('.').nth(1).unwrap();
    parts[1] = forged_payload;
    let spliced = parts.join(".");

    let err = verifier.verify(&spliced).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected(_)));
}

#[tokio::test]
async fn test_garbage_is_malformed() {
    let (_server, verifier) = verifier().await;
    let err = verifier.verify("not-a-jwt").await.unwrap_err();
    assert!(matches!(err, AuthError::Malformed(_)));
}

#[tokio::test]
async fn test_key_endpoint_down_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let keys = JwksProvider::new(
        format!("{}/jwks", server.uri()),
        Duration::from_secs(60),
        Duration::from_secs(5),
    )
    .unwrap();
    let verifier = FirebaseVerifier::new(PROJECT, Arc::new(keys));

    let err = verifier
        .verify(&sign(&claims("uid_123"), "test-key-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::KeysUnavailable(_)));
}
