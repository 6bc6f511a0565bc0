//! Metric storage for the tally service.
//!
//! Three interchangeable backends implement [`Storage`]:
//! [`memory::MemoryStore`] keeps everything in process,
//! [`file::FileStore`] wraps another backend and snapshots it to a JSON file,
//! and [`database::DatabaseStore`] persists to PostgreSQL or SQLite through
//! SeaORM.

pub mod database;
pub mod entities;
pub mod error;
pub mod file;
pub mod memory;


use async_trait::async_trait;
use error::Result;
use serde::{Deserialize, Serialize};

pub use database::DatabaseStore;
pub use error::StorageError;
pub use file::{FileStore, FileStoreConfig};
pub use memory::MemoryStore;

/// A stored gauge: the last value written under `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeMetric {
    pub name: String,
    pub value: f64,
}

impl GaugeMetric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A stored counter. As a write this is a delta, as a read it is the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterMetric {
    pub name: String,
    pub value: i64,
}

impl CounterMetric {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Persistence backend for gauges and counters.
///
/// Gauges and counters live in independent namespaces: the same name may
/// exist once as each kind. Implementations must be safe to share across
/// tasks because the ingress, the snapshot task and health checks access the
/// same instance concurrently.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns the current value of a gauge, or
    /// [`StorageError::NotFound`] if it was never written.
    async fn get_gauge(&self, name: &str) -> Result<GaugeMetric>;

    /// Returns the accumulated total of a counter, or
    /// [`StorageError::NotFound`] if it was never written.
    async fn get_counter(&self, name: &str) -> Result<CounterMetric>;

    /// Lists all gauges. Order is unspecified.
    async fn list_gauges(&self) -> Result<Vec<GaugeMetric>>;

    /// Lists all counters. Order is unspecified.
    async fn list_counters(&self) -> Result<Vec<CounterMetric>>;

    /// Sets a gauge, replacing any previous value.
    async fn add_gauge(&self, name: &str, value: f64) -> Result<()>;

    /// Adds `delta` to a counter, creating it at `delta` if absent. Fails
    /// with [`StorageError::CounterOverflow`] and changes nothing when the
    /// total would leave the `i64` range.
    async fn add_counter(&self, name: &str, delta: i64) -> Result<()>;

    /// Applies gauges then counters, in order, all or nothing. An overflowing
    /// counter rejects the whole batch.
    async fn add_batch(&self, gauges: &[GaugeMetric], counters: &[CounterMetric]) -> Result<()>;

    /// Verifies the backend is reachable.
    async fn ping(&self) -> Result<()>;
}
