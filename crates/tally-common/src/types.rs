use crate::error::RecordError;
use serde::{Deserialize, Serialize};

/// Name of the only sampled statistic that is reported as a counter.
pub const POLL_COUNT: &str = "PollCount";

/// Name of the random gauge emitted with every runtime sampling pass.
pub const RANDOM_VALUE: &str = "RandomValue";

/// The two metric kinds understood by the service.
///
/// Gauges are overwritten on every write; counters accumulate deltas.
///
/// # Examples
///
/// ```
/// use tally_common::MetricKind;
///
/// let kind: MetricKind = "counter".parse().unwrap();
/// assert_eq!(kind, MetricKind::Counter);
/// assert_eq!(kind.to_string(), "counter");
/// assert!("Gauge".parse::<MetricKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricKind {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            other => Err(RecordError::UnsupportedKind(other.to_string())),
        }
    }
}

/// A typed metric value: a gauge reading or a counter delta/total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Gauge(f64),
    Counter(i64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Gauge(v) => f.write_str(&format_gauge(*v)),
            MetricValue::Counter(v) => write!(f, "{v}"),
        }
    }
}

/// A named metric with its typed value.
///
/// On the write path a counter value is a delta; when read back from
/// storage it is the accumulated total.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub name: String,
    pub value: MetricValue,
}

impl MetricRecord {
    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Gauge(value),
        }
    }

    pub fn counter(name: impl Into<String>, delta: i64) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Counter(delta),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }
}

/// JSON wire envelope shared by the agent and the HTTP ingress.
///
/// Exactly one of `delta` / `value` is meaningful for a given kind; the
/// other is ignored even when present.
///
/// ```json
/// {"id": "PollCount", "type": "counter", "delta": 1}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl From<&MetricRecord> for MetricEnvelope {
    fn from(record: &MetricRecord) -> Self {
        let (delta, value) = match record.value {
            MetricValue::Gauge(v) => (None, Some(v)),
            MetricValue::Counter(d) => (Some(d), None),
        };
        Self {
            id: record.name.clone(),
            kind: record.kind().as_str().to_string(),
            delta,
            value,
        }
    }
}

impl TryFrom<MetricEnvelope> for MetricRecord {
    type Error = RecordError;

    fn try_from(envelope: MetricEnvelope) -> Result<Self, Self::Error> {
        let kind: MetricKind = envelope.kind.parse()?;
        let value = match kind {
            MetricKind::Gauge => envelope.value.map(MetricValue::Gauge),
            MetricKind::Counter => envelope.delta.map(MetricValue::Counter),
        };
        match value {
            Some(value) => Ok(MetricRecord {
                name: envelope.id,
                value,
            }),
            None => Err(RecordError::MissingValue {
                kind,
                name: envelope.id,
            }),
        }
    }
}

/// One observation produced by a sampling source.
///
/// The kind is not carried: it is derived from the name, see
/// [`is_counter_sample`].
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub value: f64,
}

impl Sample {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn kind(&self) -> MetricKind {
        if is_counter_sample(&self.name) {
            MetricKind::Counter
        } else {
            MetricKind::Gauge
        }
    }

    /// Converts the sample to a typed record. Counter samples are truncated
    /// toward zero.
    pub fn to_record(&self) -> MetricRecord {
        match self.kind() {
            MetricKind::Gauge => MetricRecord::gauge(self.name.clone(), self.value),
            MetricKind::Counter => MetricRecord::counter(self.name.clone(), self.value as i64),
        }
    }
}

/// Returns `true` for sample names that are reported as counters.
pub fn is_counter_sample(name: &str) -> bool {
    name == POLL_COUNT
}

/// A `(name, formatted value)` pair used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricEntry {
    pub name: String,
    pub value: String,
}

/// Formats a gauge in shortest general form: plain decimal for exponents in
/// `[-4, 6)`, scientific notation with a signed two-digit exponent otherwise.
///
/// ```
/// use tally_common::types::format_gauge;
///
/// assert_eq!(format_gauge(3.5), "3.5");
/// assert_eq!(format_gauge(100.0), "100");
/// assert_eq!(format_gauge(1234567.0), "1.234567e+06");
/// assert_eq!(format_gauge(0.00001), "1e-05");
/// ```
pub fn format_gauge(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if value == 0.0 {
        return format!("{value}");
    }

    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return format!("{value}");
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-4..6).contains(&exponent) {
        format!("{value}")
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_envelope_ignores_delta() {
        let envelope = MetricEnvelope {
            id: "Alloc".into(),
            kind: "gauge".into(),
            delta: Some(0),
            value: Some(12.5),
        };
        let record = MetricRecord::try_from(envelope).unwrap();
        assert_eq!(record, MetricRecord::gauge("Alloc", 12.5));
    }

    #[test]
    fn counter_envelope_requires_delta() {
        let envelope = MetricEnvelope {
            id: "PollCount".into(),
            kind: "counter".into(),
            delta: None,
            value: Some(3.0),
        };
        let err = MetricRecord::try_from(envelope).unwrap_err();
        assert_eq!(
            err,
            RecordError::MissingValue {
                kind: MetricKind::Counter,
                name: "PollCount".into()
            }
        );
    }

    #[test]
    fn envelope_serializes_only_the_populated_field() {
        let json = serde_json::to_value(MetricEnvelope::from(&MetricRecord::counter("PollCount", 1)))
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "PollCount", "type": "counter", "delta": 1})
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let envelope: MetricEnvelope =
            serde_json::from_str(r#"{"id":"x","type":"summary","value":1}"#).unwrap();
        assert!(matches!(
            MetricRecord::try_from(envelope),
            Err(RecordError::UnsupportedKind(k)) if k == "summary"
        ));
    }

    #[test]
    fn only_poll_count_is_a_counter_sample() {
        assert_eq!(Sample::new(POLL_COUNT, 1.0).to_record(), MetricRecord::counter("PollCount", 1));
        assert_eq!(Sample::new("pollcount", 1.0).kind(), MetricKind::Gauge);
        assert_eq!(Sample::new(RANDOM_VALUE, 0.25).kind(), MetricKind::Gauge);
    }

    #[test]
    fn gauge_formatting_edges() {
        assert_eq!(format_gauge(0.0), "0");
        assert_eq!(format_gauge(-2.0), "-2");
        assert_eq!(format_gauge(123456.0), "123456");
        assert_eq!(format_gauge(0.0001), "0.0001");
        assert_eq!(format_gauge(1e21), "1e+21");
        assert_eq!(format_gauge(-1.5e-7), "-1.5e-07");
        assert_eq!(format_gauge(f64::INFINITY), "+Inf");
        assert_eq!(MetricValue::Counter(42).to_string(), "42");
    }
}
