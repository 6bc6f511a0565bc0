use crate::health::HealthChecker;
use crate::service::MetricsService;
use std::sync::Arc;
use tally_storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<MetricsService>,
    pub health: Arc<HealthChecker>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            metrics: Arc::new(MetricsService::new(Arc::clone(&storage))),
            health: Arc::new(HealthChecker::new(storage)),
        }
    }
}
