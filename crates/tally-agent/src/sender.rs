use crate::error::{Result, SendError};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tally_common::{Backoff, MetricEnvelope, MetricRecord};

/// Delivers batches through a [`Transport`], retrying failures on a fixed
/// schedule. Shared by all batching workers.
pub struct MetricSender {
    transport: Arc<dyn Transport>,
    schedule: Vec<Duration>,
}

impl MetricSender {
    pub fn new(transport: Arc<dyn Transport>, schedule: Vec<Duration>) -> Self {
        Self {
            transport,
            schedule,
        }
    }

    /// Sends one batch. Each call starts a fresh retry cycle: the first
    /// attempt is immediate and every failure waits for the next scheduled
    /// delay, until the schedule runs out and
    /// [`SendError::Exhausted`] is returned.
    pub async fn send(&self, batch: &[MetricRecord]) -> Result<()> {
        let envelopes: Vec<MetricEnvelope> = batch.iter().map(MetricEnvelope::from).collect();
        let mut backoff = Backoff::new(self.schedule.clone());

        loop {
            let err = match self.transport.send(&envelopes).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            match backoff.next_delay() {
                Some(delay) => {
                    tracing::warn!(
                        attempt = backoff.retries(),
                        max_attempts = backoff.max_attempts(),
                        retry_in_ms = delay.as_millis() as u64,
                        error = %err,
                        "Send failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(SendError::Exhausted {
                        attempts: backoff.max_attempts(),
                        last: Box::new(err),
                    })
                }
            }
        }
    }
}
