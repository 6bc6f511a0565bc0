use crate::error::{Result, ValidationError};
use std::sync::Arc;
use tally_common::{MetricEntry, MetricKind, MetricRecord, MetricValue};
use tally_storage::{CounterMetric, GaugeMetric, Storage};

/// Validates, types and routes metric reads and writes to storage.
///
/// Transport adapters hand it raw strings or decoded records; it never sees
/// transport details.
pub struct MetricsService {
    storage: Arc<dyn Storage>,
}

impl MetricsService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Parses `raw` according to `kind` and stores it.
    pub async fn save(&self, kind: &str, name: &str, raw: &str) -> Result<()> {
        let record = parse_record(kind, name, raw)?;
        self.save_record(&record).await
    }

    pub async fn save_record(&self, record: &MetricRecord) -> Result<()> {
        validate(record)?;
        match record.value {
            MetricValue::Gauge(value) => self.storage.add_gauge(&record.name, value).await?,
            MetricValue::Counter(delta) => self.storage.add_counter(&record.name, delta).await?,
        }
        Ok(())
    }

    /// Stores a batch through one `add_batch` call. Nothing is written if
    /// any record is invalid.
    pub async fn save_records(&self, records: &[MetricRecord]) -> Result<()> {
        let mut gauges = Vec::new();
        let mut counters = Vec::new();
        for record in records {
            validate(record)?;
            match record.value {
                MetricValue::Gauge(value) => gauges.push(GaugeMetric::new(record.name.clone(), value)),
                MetricValue::Counter(delta) => {
                    counters.push(CounterMetric::new(record.name.clone(), delta))
                }
            }
        }
        self.storage.add_batch(&gauges, &counters).await?;
        Ok(())
    }

    /// Current value of a metric as text: a gauge in shortest general form,
    /// a counter as a plain integer.
    pub async fn get(&self, kind: &str, name: &str) -> Result<String> {
        let kind: MetricKind = kind.parse()?;
        let record = self.get_record(kind, name).await?;
        Ok(record.value.to_string())
    }

    pub async fn get_record(&self, kind: MetricKind, name: &str) -> Result<MetricRecord> {
        let record = match kind {
            MetricKind::Gauge => {
                let gauge = self.storage.get_gauge(name).await?;
                MetricRecord::gauge(gauge.name, gauge.value)
            }
            MetricKind::Counter => {
                let counter = self.storage.get_counter(name).await?;
                MetricRecord::counter(counter.name, counter.value)
            }
        };
        Ok(record)
    }

    /// Every stored metric with its formatted value, gauges first. Order
    /// within a kind follows the backend.
    pub async fn list_all(&self) -> Result<Vec<MetricEntry>> {
        let gauges = self.storage.list_gauges().await?;
        let counters = self.storage.list_counters().await?;

        let entries = gauges
            .into_iter()
            .map(|g| MetricEntry {
                value: MetricValue::Gauge(g.value).to_string(),
                name: g.name,
            })
            .chain(counters.into_iter().map(|c| MetricEntry {
                value: MetricValue::Counter(c.value).to_string(),
                name: c.name,
            }))
            .collect();
        Ok(entries)
    }
}

fn parse_record(kind: &str, name: &str, raw: &str) -> Result<MetricRecord> {
    let kind: MetricKind = kind.parse()?;
    let invalid = || ValidationError::InvalidValue {
        kind,
        raw: raw.to_string(),
    };
    let value = match kind {
        MetricKind::Gauge => MetricValue::Gauge(raw.trim().parse().map_err(|_| invalid())?),
        MetricKind::Counter => MetricValue::Counter(raw.trim().parse().map_err(|_| invalid())?),
    };
    Ok(MetricRecord {
        name: name.to_string(),
        value,
    })
}

fn validate(record: &MetricRecord) -> std::result::Result<(), ValidationError> {
    if record.name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    match record.value {
        MetricValue::Gauge(value) if !value.is_finite() => Err(ValidationError::InvalidValue {
            kind: MetricKind::Gauge,
            raw: value.to_string(),
        }),
        MetricValue::Counter(delta) if delta < 0 => Err(ValidationError::NegativeDelta {
            name: record.name.clone(),
            delta,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use tally_storage::MemoryStore;

    fn service() -> MetricsService {
        MetricsService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn gauge_overwrites_and_counter_accumulates() {
        let service = service();
        service.save("gauge", "Alloc", "1.5").await.unwrap();
        service.save("gauge", "Alloc", "100").await.unwrap();
        service.save("counter", "PollCount", "3").await.unwrap();
        service.save("counter", "PollCount", "4").await.unwrap();

        assert_eq!(service.get("gauge", "Alloc").await.unwrap(), "100");
        assert_eq!(service.get("counter", "PollCount").await.unwrap(), "7");
    }

    #[tokio::test]
    async fn gauge_text_uses_shortest_form() {
        let service = service();
        service.save("gauge", "Heap", "0.000012").await.unwrap();
        service.save("gauge", "Sys", "3.140").await.unwrap();
        assert_eq!(service.get("gauge", "Heap").await.unwrap(), "1.2e-05");
        assert_eq!(service.get("gauge", "Sys").await.unwrap(), "3.14");
    }

    #[tokio::test]
    async fn unparseable_values_are_validation_errors() {
        let service = service();
        for (kind, raw) in [("gauge", "abc"), ("counter", "1.5"), ("counter", ""), ("gauge", "NaN")] {
            let err = service.save(kind, "X", raw).await.unwrap_err();
            assert!(
                matches!(err, ServiceError::Validation(ValidationError::InvalidValue { .. })),
                "{kind}/{raw}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn unknown_kind_is_unsupported() {
        let service = service();
        assert!(matches!(
            service.save("histogram", "X", "1").await,
            Err(ServiceError::UnsupportedMetricKind(k)) if k == "histogram"
        ));
        assert!(matches!(
            service.get("Gauge", "X").await,
            Err(ServiceError::UnsupportedMetricKind(_))
        ));
    }

    #[tokio::test]
    async fn missing_metric_is_not_found_and_never_zero() {
        let service = service();
        service.save("counter", "Zero", "0").await.unwrap();
        assert_eq!(service.get("counter", "Zero").await.unwrap(), "0");
        assert!(matches!(
            service.get("counter", "Missing").await,
            Err(ServiceError::NotFound { kind: MetricKind::Counter, .. })
        ));
        // Written as a gauge, absent as a counter.
        service.save("gauge", "Alloc", "1").await.unwrap();
        assert!(matches!(
            service.get_record(MetricKind::Counter, "Alloc").await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn negative_counter_delta_is_rejected() {
        let service = service();
        let err = service.save("counter", "PollCount", "-1").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::NegativeDelta { delta: -1, .. })
        ));
    }

    #[tokio::test]
    async fn counter_overflow_is_a_validation_error() {
        let service = service();
        service.save("counter", "Big", &i64::MAX.to_string()).await.unwrap();

        let err = service.save("counter", "Big", "1").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::CounterOverflow { delta: 1, .. })
        ));
        assert_eq!(service.get("counter", "Big").await.unwrap(), i64::MAX.to_string());
    }

    #[tokio::test]
    async fn batch_with_invalid_record_writes_nothing() {
        let service = service();
        let err = service
            .save_records(&[
                MetricRecord::gauge("Alloc", 1.0),
                MetricRecord::counter("", 1),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::EmptyName)));
        assert!(service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_applies_in_order() {
        let service = service();
        service
            .save_records(&[
                MetricRecord::gauge("Alloc", 1.0),
                MetricRecord::counter("PollCount", 1),
                MetricRecord::gauge("Alloc", 2.0),
                MetricRecord::counter("PollCount", 1),
            ])
            .await
            .unwrap();

        let mut entries = service.list_all().await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            entries,
            vec![
                MetricEntry {
                    name: "Alloc".into(),
                    value: "2".into()
                },
                MetricEntry {
                    name: "PollCount".into(),
                    value: "2".into()
                },
            ]
        );
    }
}
