use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use trip_core::UserConstraints;

use crate::auth::{Caller, UserId};
use crate::storage::{DocumentStore, ProfileRecord};

/// Reads stored constraint records.
///
/// Lookups never fail: a missing, unreadable or slow record reads as "no
/// constraints known".
#[derive(Clone)]
pub struct ConstraintGateway {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl ConstraintGateway {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    async fn profile(&self, user: &UserId) -> Option<ProfileRecord> {
        match timeout(self.timeout, self.store.load_profile(user)).await {
            Ok(Ok(profile)) => profile,
            Ok(Err(e)) => {
                tracing::warn!(user_id = %user, error = %e, "Constraint lookup failed, continuing without");
                None
            }
            Err(_) => {
                tracing::warn!(user_id = %user, "Constraint lookup timed out, continuing without");
                None
            }
        }
    }

    pub async fn constraints_for(&self, caller: &Caller) -> UserConstraints {
        let Some(user) = caller.user_id() else {
            return UserConstraints::default();
        };
        self.profile(user)
            .await
            .map(|profile| profile.constraints)
            .unwrap_or_default()
    }

    pub async fn is_onboarded(&self, user: &UserId) -> bool {
        self.profile(user)
            .await
            .is_some_and(|profile| profile.onboarded)
    }
}
