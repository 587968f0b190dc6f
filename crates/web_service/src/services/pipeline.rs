//! Request pipeline shared by every public operation.
//!
//! ```text
//! Received -> Authenticated -> Enriched -> Prompted -> Generated -> Validated -> Persisted -> Responded
//! ```
//!
//! Each operation runs the skeleton once under its `OperationPolicy`; the
//! optional stages are skipped when the policy says so. Store-only operations
//! (saving, listing) go straight from `Authenticated` to the store.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use trip_core::{build_prompt, GenerationResult, PersistedTrip, Prompt, Task, UserConstraints};
use trip_llm::GenerationClient;

use super::constraint_gateway::ConstraintGateway;
use super::persistence_sink::PersistenceSink;
use crate::auth::{AuthError, BearerCredential, Caller, Credentials, IdentityVerifier, UserId};
use crate::error::{AppError, Result};
use crate::storage::{DocumentStore, NewTrip, ProfileRecord};

/// Maximum number of trips returned by public-trips.
pub const PUBLIC_TRIPS_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityPolicy {
    /// Credentials are ignored.
    Anonymous,
    /// A verified bearer or an asserted `X-User-Id`; neither is required.
    Optional,
    /// A verified bearer is required.
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistPolicy {
    Never,
    /// Saved in the background when the caller has an identity.
    BestEffort,
    /// The save is the operation; failing it fails the request.
    Required,
}

#[derive(Debug, Clone, Copy)]
pub struct OperationPolicy {
    pub name: &'static str,
    pub identity: IdentityPolicy,
    pub personalize: bool,
    pub persist: PersistPolicy,
}

impl OperationPolicy {
    const fn new(
        name: &'static str,
        identity: IdentityPolicy,
        personalize: bool,
        persist: PersistPolicy,
    ) -> Self {
        Self {
            name,
            identity,
            personalize,
            persist,
        }
    }
}

pub mod policies {
    use super::IdentityPolicy::*;
    use super::OperationPolicy;
    use super::PersistPolicy::*;

    pub const GENERATE: OperationPolicy = OperationPolicy::new("generate", Optional, true, BestEffort);
    pub const SAVE_TRIP: OperationPolicy = OperationPolicy::new("save-trip", Verified, false, Required);
    pub const PUBLIC_TRIPS: OperationPolicy = OperationPolicy::new("public-trips", Anonymous, false, Never);
    pub const CHECKLIST: OperationPolicy =
        OperationPolicy::new("generate-checklist", Anonymous, false, Never);
    pub const COMM_CARD: OperationPolicy =
        OperationPolicy::new("generate-comm-card", Anonymous, false, Never);
    pub const SENSORY_PROFILE: OperationPolicy =
        OperationPolicy::new("sensory-profile", Anonymous, false, Never);
    pub const RESHUFFLE_DAY: OperationPolicy =
        OperationPolicy::new("reshuffle-day", Anonymous, false, Never);
    pub const SCRIPT: OperationPolicy = OperationPolicy::new("generate-script", Anonymous, false, Never);
    pub const SAVE_PROFILE: OperationPolicy = OperationPolicy::new("save-profile", Verified, false, Required);
    pub const CHECK_ONBOARDING: OperationPolicy =
        OperationPolicy::new("check-onboarding", Verified, false, Never);
    pub const MY_TRIPS: OperationPolicy = OperationPolicy::new("my-trips", Verified, false, Never);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    Authenticated,
    Enriched,
    Prompted,
    Generated,
    Validated,
    Persisted,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Authenticated => "authenticated",
            Stage::Enriched => "enriched",
            Stage::Prompted => "prompted",
            Stage::Generated => "generated",
            Stage::Validated => "validated",
            Stage::Persisted => "persisted",
            Stage::Responded => "responded",
        };
        f.write_str(name)
    }
}

fn enter(policy: &OperationPolicy, stage: Stage) {
    tracing::debug!(operation = policy.name, stage = %stage, "Pipeline stage");
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Bound on each external call.
    pub upstream_timeout: Duration,
    /// Extra generation attempts after output fails validation.
    pub schema_retries: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(30),
            schema_retries: 0,
        }
    }
}

/// A validated result, plus the background save it triggered if any.
pub struct Generated {
    pub result: GenerationResult,
    pub persistence: Option<JoinHandle<()>>,
}

pub struct Pipeline {
    generator: Arc<dyn GenerationClient>,
    verifier: Arc<dyn IdentityVerifier>,
    store: Arc<dyn DocumentStore>,
    constraints: ConstraintGateway,
    sink: PersistenceSink,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        generator: Arc<dyn GenerationClient>,
        verifier: Arc<dyn IdentityVerifier>,
        store: Arc<dyn DocumentStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            constraints: ConstraintGateway::new(store.clone(), settings.upstream_timeout),
            sink: PersistenceSink::new(store.clone(), settings.upstream_timeout),
            generator,
            verifier,
            store,
            settings,
        }
    }

    async fn authenticate(
        &self,
        policy: &OperationPolicy,
        credentials: &Credentials,
    ) -> Result<Caller> {
        let caller = match policy.identity {
            IdentityPolicy::Anonymous => Caller::Anonymous,
            IdentityPolicy::Verified => match &credentials.bearer {
                BearerCredential::Token(token) => Caller::Verified(self.verify(token).await?),
                BearerCredential::Absent | BearerCredential::Malformed => {
                    tracing::debug!(operation = policy.name, "Missing or malformed bearer credential");
                    return Err(AppError::Unauthenticated);
                }
            },
            IdentityPolicy::Optional => match &credentials.bearer {
                BearerCredential::Token(token) => Caller::Verified(self.verify(token).await?),
                BearerCredential::Malformed => return Err(AppError::Unauthenticated),
                BearerCredential::Absent => match &credentials.asserted {
                    None => Caller::Anonymous,
                    Some(Ok(user)) => Caller::Asserted(user.clone()),
                    Some(Err(e)) => return Err(AppError::BadRequest(e.to_string())),
                },
            },
        };
        enter(policy, Stage::Authenticated);
        tracing::debug!(operation = policy.name, trust = caller.trust(), "Caller resolved");
        Ok(caller)
    }

    async fn verify(&self, token: &str) -> Result<UserId> {
        match timeout(self.settings.upstream_timeout, self.verifier.verify(token)).await {
            Ok(Ok(user)) => Ok(user),
            Ok(Err(AuthError::KeysUnavailable(e))) => {
                tracing::error!(error = %e, "Identity keys unavailable");
                Err(AppError::UpstreamUnavailable)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Bearer credential rejected");
                Err(AppError::Unauthenticated)
            }
            Err(_) => {
                tracing::error!("Identity verification timed out");
                Err(AppError::UpstreamUnavailable)
            }
        }
    }

    async fn verified_caller(
        &self,
        policy: &OperationPolicy,
        credentials: &Credentials,
    ) -> Result<UserId> {
        let caller = self.authenticate(policy, credentials).await?;
        caller
            .verified_user_id()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }

    /// One generation call, bounded by the upstream timeout.
    async fn call_generator(&self, prompt: &Prompt) -> Result<trip_core::RawOutput> {
        match timeout(self.settings.upstream_timeout, self.generator.generate(prompt)).await {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(e)) => {
                tracing::error!(kind = %prompt.kind(), error = %e, "Generation call failed");
                Err(AppError::UpstreamUnavailable)
            }
            Err(_) => {
                tracing::error!(
                    kind = %prompt.kind(),
                    timeout_secs = self.settings.upstream_timeout.as_secs(),
                    "Generation call timed out"
                );
                Err(AppError::UpstreamUnavailable)
            }
        }
    }

    /// Calls the generator and decodes its output, retrying up to
    /// `schema_retries` extra times when the output fails validation.
    async fn generate_validated(
        &self,
        policy: &OperationPolicy,
        prompt: &Prompt,
    ) -> Result<GenerationResult> {
        let attempts = self.settings.schema_retries.saturating_add(1);
        for attempt in 1..=attempts {
            let raw = self.call_generator(prompt).await?;
            enter(policy, Stage::Generated);

            match raw.decode(prompt.schema()) {
                Ok(result) => {
                    enter(policy, Stage::Validated);
                    return Ok(result);
                }
                Err(e) => tracing::error!(
                    kind = %prompt.kind(),
                    attempt,
                    attempts,
                    error = %e,
                    raw = %raw.as_str(),
                    "Generation output failed validation"
                ),
            }
        }
        Err(AppError::SchemaViolation)
    }

    /// Runs a generation operation.
    pub async fn generate(
        &self,
        policy: &OperationPolicy,
        credentials: &Credentials,
        task: Task,
    ) -> Result<Generated> {
        enter(policy, Stage::Received);
        if let Task::Itinerary { idea } = &task {
            if idea.trim().is_empty() {
                return Err(AppError::BadRequest("trip idea is empty".to_string()));
            }
        }

        let caller = self.authenticate(policy, credentials).await?;

        let constraints = if policy.personalize {
            let constraints = self.constraints.constraints_for(&caller).await;
            enter(policy, Stage::Enriched);
            Some(constraints)
        } else {
            None
        };

        let prompt = build_prompt(&task, constraints.as_ref());
        enter(policy, Stage::Prompted);

        let result = self.generate_validated(policy, &prompt).await?;
        if let GenerationResult::SensoryProfile(profile) = &result {
            let out_of_range = profile.out_of_range_scores();
            if !out_of_range.is_empty() {
                tracing::warn!(scores = ?out_of_range, "Sensory scores outside 1-100, passing through");
            }
        }

        let persistence = match (policy.persist, caller.user_id(), result.as_itinerary()) {
            (PersistPolicy::BestEffort, Some(user), Some(itinerary)) => {
                let itinerary = serde_json::to_value(itinerary)
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                let handle = self.sink.spawn_best_effort(NewTrip {
                    user_id: user.clone(),
                    itinerary,
                    is_public: false,
                });
                enter(policy, Stage::Persisted);
                Some(handle)
            }
            _ => None,
        };

        enter(policy, Stage::Responded);
        Ok(Generated {
            result,
            persistence,
        })
    }

    /// Saves a caller-supplied itinerary for a verified caller.
    pub async fn save_trip(
        &self,
        credentials: &Credentials,
        itinerary: Value,
        is_public: bool,
    ) -> Result<PersistedTrip> {
        let policy = &policies::SAVE_TRIP;
        enter(policy, Stage::Received);
        let user = self.verified_caller(policy, credentials).await?;

        if itinerary.is_null() {
            return Err(AppError::BadRequest("itinerary is required".to_string()));
        }

        let saved = self
            .sink
            .save(NewTrip {
                user_id: user.clone(),
                itinerary,
                is_public,
            })
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user, error = %e, "Explicit trip save failed");
                AppError::PersistenceFailure("could not store the trip".to_string())
            })?;
        enter(policy, Stage::Persisted);
        Ok(saved)
    }

    pub async fn public_trips(&self) -> Result<Vec<PersistedTrip>> {
        let policy = &policies::PUBLIC_TRIPS;
        enter(policy, Stage::Received);
        let trips = timeout(
            self.settings.upstream_timeout,
            self.store.list_public_trips(PUBLIC_TRIPS_LIMIT),
        )
        .await
        .map_err(|_| AppError::UpstreamUnavailable)?
        .map_err(|e| {
            tracing::error!(error = %e, "Listing public trips failed");
            AppError::Internal("could not load trips".to_string())
        })?;
        enter(policy, Stage::Responded);
        Ok(trips)
    }

    pub async fn my_trips(&self, credentials: &Credentials) -> Result<Vec<PersistedTrip>> {
        let policy = &policies::MY_TRIPS;
        enter(policy, Stage::Received);
        let user = self.verified_caller(policy, credentials).await?;

        let trips = timeout(self.settings.upstream_timeout, self.store.list_trips_for(&user))
            .await
            .map_err(|_| AppError::UpstreamUnavailable)?
            .map_err(|e| {
                tracing::error!(user_id = %user, error = %e, "Listing caller trips failed");
                AppError::Internal("could not load trips".to_string())
            })?;
        enter(policy, Stage::Responded);
        Ok(trips)
    }

    pub async fn save_profile(
        &self,
        credentials: &Credentials,
        constraints: UserConstraints,
    ) -> Result<()> {
        let policy = &policies::SAVE_PROFILE;
        enter(policy, Stage::Received);
        let user = self.verified_caller(policy, credentials).await?;

        let profile = ProfileRecord {
            constraints,
            onboarded: true,
        };
        timeout(
            self.settings.upstream_timeout,
            self.store.save_profile(&user, &profile),
        )
        .await
        .map_err(|_| AppError::PersistenceFailure("store timed out".to_string()))?
        .map_err(|e| {
            tracing::error!(user_id = %user, error = %e, "Saving profile failed");
            AppError::PersistenceFailure("could not store the profile".to_string())
        })?;
        enter(policy, Stage::Persisted);
        Ok(())
    }

    /// Whether the verified caller has completed onboarding. Lookup failures
    /// read as not onboarded.
    pub async fn check_onboarding(&self, credentials: &Credentials) -> Result<bool> {
        let policy = &policies::CHECK_ONBOARDING;
        enter(policy, Stage::Received);
        let user = self.verified_caller(policy, credentials).await?;
        let onboarded = self.constraints.is_onboarded(&user).await;
        enter(policy, Stage::Responded);
        Ok(onboarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;
    use trip_core::RawOutput;
    use trip_llm::LLMError;

    use crate::auth::UnconfiguredVerifier;
    use crate::storage::FileDocumentStore;

    /// Replays scripted outputs and records every prompt it was given.
    struct ScriptedClient {
        outputs: Mutex<VecDeque<std::result::Result<String, String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(outputs: Vec<std::result::Result<&str, &str>>) -> Arc<Self> {
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

    const CHECKLIST_OK: &str = r#"{"checklist": ["Pack medication"]}"#;

    fn pipeline(
        client: Arc<ScriptedClient>,
        dir: &tempfile::TempDir,
        schema_retries: u32,
    ) -> Pipeline {
        Pipeline::new(
            client,
            Arc::new(UnconfiguredVerifier),
            Arc::new(FileDocumentStore::new(dir.path())),
            PipelineSettings {
                upstream_timeout: Duration::from_secs(5),
                schema_retries,
            },
        )
    }

    fn checklist_task() -> Task {
        Task::Checklist {
            destination: "Oslo".to_string(),
            trip_title: "Fjords".to_string(),
            accessibility: json!({}),
        }
    }

    #[tokio::test]
    async fn test_schema_violation_is_not_retried_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new(vec![Ok("not json"), Ok(CHECKLIST_OK)]);
        let pipeline = pipeline(client.clone(), &dir, 0);

        let err = pipeline
            .generate(&policies::CHECKLIST, &Credentials::anonymous(), checklist_task())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::SchemaViolation));
        assert_eq!(client.prompts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_schema_retry_uses_same_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new(vec![Ok(r#"{"checklist": "oops"}"#), Ok(CHECKLIST_OK)]);
        let pipeline = pipeline(client.clone(), &dir, 1);

        let generated = pipeline
            .generate(&policies::CHECKLIST, &Credentials::anonymous(), checklist_task())
            .await
            .unwrap();
        assert!(matches!(generated.result, GenerationResult::Checklist(_)));

        let prompts = client.prompts.lock();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0], prompts[1]);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new(vec![Err("HTTP 503"), Ok(CHECKLIST_OK)]);
        let pipeline = pipeline(client.clone(), &dir, 3);

        let err = pipeline
            .generate(&policies::CHECKLIST, &Credentials::anonymous(), checklist_task())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::UpstreamUnavailable));
        assert_eq!(client.prompts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_idea_is_rejected_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new(vec![]);
        let pipeline = pipeline(client.clone(), &dir, 0);

        let err = pipeline
            .generate(
                &policies::GENERATE,
                &Credentials::anonymous(),
                Task::Itinerary {
                    idea: "  \n".to_string(),
                },
            )
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(client.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_verified_operations_fail_closed_without_verifier() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(ScriptedClient::new(vec![]), &dir, 0);
        let credentials = Credentials {
            bearer: BearerCredential::Token("a.b.c".to_string()),
            asserted: None,
        };

        let err = pipeline
            .save_trip(&credentials, json!({"tripTitle": "x"}), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
        assert!(!dir.path().join("trips").exists());
    }

    #[tokio::test]
    async fn test_asserted_identity_is_not_enough_for_save() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(ScriptedClient::new(vec![]), &dir, 0);
        let credentials = Credentials {
            bearer: BearerCredential::Absent,
            asserted: Some(Ok(UserId::parse("alice").unwrap())),
        };

        let err = pipeline
            .save_trip(&credentials, json!({}), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[test]
    fn test_policies_declare_capabilities() {
        assert_eq!(policies::GENERATE.identity, IdentityPolicy::Optional);
        assert_eq!(policies::GENERATE.persist, PersistPolicy::BestEffort);
        assert!(policies::GENERATE.personalize);
        assert_eq!(policies::SAVE_TRIP.identity, IdentityPolicy::Verified);
        assert_eq!(policies::SAVE_TRIP.persist, PersistPolicy::Required);
        for policy in [
            policies::CHECKLIST,
            policies::COMM_CARD,
            policies::SENSORY_PROFILE,
            policies::RESHUFFLE_DAY,
            policies::SCRIPT,
            policies::PUBLIC_TRIPS,
        ] {
            assert_eq!(policy.identity, IdentityPolicy::Anonymous, "{}", policy.name);
            assert_eq!(policy.persist, PersistPolicy::Never, "{}", policy.name);
        }
    }
}
