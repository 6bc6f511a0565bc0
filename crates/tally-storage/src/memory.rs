use crate::error::{Result, StorageError};
use crate::{CounterMetric, GaugeMetric, Storage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tally_common::MetricKind;

#[derive(Default)]
struct Metrics {
    gauges: HashMap<String, f64>,
    counters: HashMap<String, i64>,
}

impl Metrics {
    fn set_gauge(&mut self, name: &str, value: f64) {
        self.gauges.insert(name.to_string(), value);
    }

    fn add_counter(&mut self, name: &str, delta: i64) -> Result<()> {
        let total = self.counters.get(name).copied().unwrap_or(0);
        let total = total
            .checked_add(delta)
            .ok_or_else(|| StorageError::counter_overflow(name, delta))?;
        self.counters.insert(name.to_string(), total);
        Ok(())
    }

    /// Totals the counters of a batch would end with, without applying them.
    fn stage_counters(&self, counters: &[CounterMetric]) -> Result<HashMap<String, i64>> {
        let mut staged: HashMap<String, i64> = HashMap::new();
        for counter in counters {
            let total = match staged.get(&counter.name) {
                Some(total) => *total,
                None => self.counters.get(&counter.name).copied().unwrap_or(0),
            };
            let total = total
                .checked_add(counter.value)
                .ok_or_else(|| StorageError::counter_overflow(&counter.name, counter.value))?;
            staged.insert(counter.name.clone(), total);
        }
        Ok(staged)
    }
}

/// In-process store. Always reachable; a write fails only on counter
/// overflow.
#[derive(Default)]
pub struct MemoryStore {
    metrics: RwLock<Metrics>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Metrics> {
        self.metrics
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Metrics> {
        self.metrics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn get_gauge(&self, name: &str) -> Result<GaugeMetric> {
        self.read()
            .gauges
            .get(name)
            .map(|value| GaugeMetric::new(name, *value))
            .ok_or_else(|| StorageError::not_found(MetricKind::Gauge, name))
    }

    async fn get_counter(&self, name: &str) -> Result<CounterMetric> {
        self.read()
            .counters
            .get(name)
            .map(|value| CounterMetric::new(name, *value))
            .ok_or_else(|| StorageError::not_found(MetricKind::Counter, name))
    }

    async fn list_gauges(&self) -> Result<Vec<GaugeMetric>> {
        Ok(self
            .read()
            .gauges
            .iter()
            .map(|(name, value)| GaugeMetric::new(name.clone(), *value))
            .collect())
    }

    async fn list_counters(&self) -> Result<Vec<CounterMetric>> {
        Ok(self
            .read()
            .counters
            .iter()
            .map(|(name, value)| CounterMetric::new(name.clone(), *value))
            .collect())
    }

    async fn add_gauge(&self, name: &str, value: f64) -> Result<()> {
        self.write().set_gauge(name, value);
        Ok(())
    }

    async fn add_counter(&self, name: &str, delta: i64) -> Result<()> {
        self.write().add_counter(name, delta)
    }

    async fn add_batch(&self, gauges: &[GaugeMetric], counters: &[CounterMetric]) -> Result<()> {
        let mut metrics = self.write();
        let totals = metrics.stage_counters(counters)?;
        for gauge in gauges {
            metrics.set_gauge(&gauge.name, gauge.value);
        }
        metrics.counters.extend(totals);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
