use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::Instrument;
use trip_core::PersistedTrip;

use crate::storage::{DocumentStore, NewTrip, StorageError};

/// Writes trips to the document store.
#[derive(Clone)]
pub struct PersistenceSink {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl PersistenceSink {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Writes `trip` and reports the outcome to the caller.
    pub async fn save(&self, trip: NewTrip) -> Result<PersistedTrip, StorageError> {
        timeout(self.timeout, self.store.add_trip(trip))
            .await
            .map_err(|_| StorageError::Timeout)?
    }

    /// Writes `trip` in the background. Failures are logged and go no further.
    pub fn spawn_best_effort(&self, trip: NewTrip) -> JoinHandle<()> {
        let sink = self.clone();
        let user_id = trip.user_id.clone();
        tokio::spawn(
            async move {
                match sink.save(trip).await {
                    Ok(saved) => tracing::info!(
                        trip_id = %saved.id,
                        user_id = %user_id,
                        "Trip saved for caller"
                    ),
                    Err(e) => tracing::warn!(
                        user_id = %user_id,
                        error = %e,
                        "Background trip save failed"
                    ),
                }
            }
            .instrument(tracing::Span::current()),
        )
    }
}
