pub mod file_provider;
pub mod firestore;
pub mod provider;

use std::sync::Arc;

pub use file_provider::FileDocumentStore;
pub use firestore::FirestoreStore;
pub use provider::{DocumentStore, NewTrip, ProfileRecord, StorageError};

use crate::config::{AppConfig, StoreBackend};

/// Builds the store selected by `store.backend`.
pub fn build_store(config: &AppConfig) -> provider::Result<Arc<dyn DocumentStore>> {
    match config.store.backend {
        StoreBackend::File => {
            tracing::info!(data_dir = %config.store.data_dir.display(), "Using file document store");
            Ok(Arc::new(FileDocumentStore::new(&config.store.data_dir)))
        }
        StoreBackend::Firestore => Ok(Arc::new(FirestoreStore::from_config(
            &config.firebase,
            config.upstream_timeout(),
        )?)),
    }
}
