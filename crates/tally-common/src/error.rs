use crate::types::MetricKind;

/// Errors raised while turning loosely-typed input (kind strings, wire
/// envelopes) into typed metric records.
///
/// # Examples
///
/// ```
/// use tally_common::{MetricKind, RecordError};
///
/// let err: RecordError = "histogram".parse::<MetricKind>().unwrap_err();
/// assert!(matches!(err, RecordError::UnsupportedKind(ref k) if k == "histogram"));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// The kind string is neither `gauge` nor `counter`.
    #[error("unsupported metric kind '{0}'")]
    UnsupportedKind(String),

    /// The envelope does not carry the field its kind requires
    /// (`value` for gauges, `delta` for counters).
    #[error("{kind} metric '{name}' carries no value")]
    MissingValue { kind: MetricKind, name: String },
}
