use std::sync::Arc;
use tally_storage::{Storage, StorageError};

/// Reports whether the storage backend is reachable.
pub struct HealthChecker {
    storage: Arc<dyn Storage>,
}

impl HealthChecker {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn check_connection(&self) -> Result<(), StorageError> {
        self.storage.ping().await
    }
}
