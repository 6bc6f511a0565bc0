use tally_common::{MetricKind, RecordError};
use tally_storage::StorageError;

/// Input rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("metric name must not be empty")]
    EmptyName,

    #[error("'{raw}' is not a valid {kind} value")]
    InvalidValue { kind: MetricKind, raw: String },

    #[error("{kind} metric '{name}' carries no value")]
    MissingValue { kind: MetricKind, name: String },

    #[error("counter '{name}' cannot decrease (delta {delta})")]
    NegativeDelta { name: String, delta: i64 },

    #[error("counter '{name}' would overflow adding {delta}")]
    CounterOverflow { name: String, delta: i64 },
}

/// Errors returned by [`MetricsService`](crate::service::MetricsService).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Service: unsupported metric kind '{0}'")]
    UnsupportedMetricKind(String),

    #[error("Service: invalid metric: {0}")]
    Validation(#[from] ValidationError),

    #[error("Service: {kind} metric '{name}' not found")]
    NotFound { kind: MetricKind, name: String },

    #[error("Service: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { kind, name } => ServiceError::NotFound { kind, name },
            StorageError::CounterOverflow { name, delta } => {
                ValidationError::CounterOverflow { name, delta }.into()
            }
            other => ServiceError::Storage(other),
        }
    }
}

impl From<RecordError> for ServiceError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::UnsupportedKind(kind) => ServiceError::UnsupportedMetricKind(kind),
            RecordError::MissingValue { kind, name } => {
                ValidationError::MissingValue { kind, name }.into()
            }
        }
    }
}

/// Convenience `Result` alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
