//! Shared vocabulary for the tally agent and metrics service: metric kinds,
//! typed records, the JSON wire envelope and the retry schedule.

pub mod backoff;
pub mod error;
pub mod types;

pub use backoff::Backoff;
pub use error::RecordError;
pub use types::{MetricEntry, MetricEnvelope, MetricKind, MetricRecord, MetricValue, Sample};
