use std::path::PathBuf;
use tally_common::MetricKind;

/// Errors that can occur within the storage layer.
///
/// A read may find no metric ([`NotFound`](StorageError::NotFound)). A write
/// may be refused ([`CounterOverflow`](StorageError::CounterOverflow)) or fail
/// to become durable (`Io`, `Snapshot`, `Database`). The backend itself may be
/// unreachable ([`Connection`](StorageError::Connection)).
///
/// # Examples
///
/// ```rust
/// use tally_common::MetricKind;
/// use tally_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     kind: MetricKind::Gauge,
///     name: "Alloc".to_string(),
/// };
/// assert!(err.is_not_found());
/// assert!(err.to_string().contains("Alloc"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested metric has never been written. Never returned by writes.
    #[error("Storage: {kind} metric '{name}' not found")]
    NotFound { kind: MetricKind, name: String },

    /// Adding the delta would take the counter's total outside the `i64`
    /// range. The stored total is left unchanged.
    #[error("Storage: counter '{name}' would overflow adding {delta}")]
    CounterOverflow { name: String, delta: i64 },

    /// Reading or writing the snapshot file failed.
    #[error("Storage: I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The snapshot could not be encoded, or an existing snapshot is malformed.
    #[error("Storage: snapshot {} is invalid: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A statement or transaction failed on the database backend.
    #[error("Storage: database error: {0}")]
    Database(sea_orm::DbErr),

    /// The backend could not be reached.
    #[error("Storage: connection failed: {0}")]
    Connection(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    pub fn is_connection_failure(&self) -> bool {
        matches!(self, StorageError::Connection(_))
    }

    pub(crate) fn counter_overflow(name: &str, delta: i64) -> Self {
        StorageError::CounterOverflow {
            name: name.to_string(),
            delta,
        }
    }

    pub(crate) fn not_found(kind: MetricKind, name: &str) -> Self {
        StorageError::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

impl From<sea_orm::DbErr> for StorageError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_) => {
                StorageError::Connection(err.to_string())
            }
            other => StorageError::Database(other),
        }
    }
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
