use crate::sender::MetricSender;
use std::sync::Arc;
use std::time::Duration;
use tally_common::{MetricRecord, Sample};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// One batching worker: owns a private batch, fills it from the shared
/// queue and ships it every report interval.
pub struct Worker {
    id: usize,
    queue: flume::Receiver<Sample>,
    sender: Arc<MetricSender>,
    report_interval: Duration,
    batch: Vec<MetricRecord>,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: flume::Receiver<Sample>,
        sender: Arc<MetricSender>,
        report_interval: Duration,
    ) -> Self {
        Self {
            id,
            queue,
            sender,
            report_interval,
            batch: Vec::new(),
        }
    }

    /// Runs until cancelled or the queue closes, then drains whatever is
    /// left in the queue and makes one final send.
    ///
    /// A send in progress is never interrupted; cancellation is observed
    /// once it completes.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut flush = interval_at(Instant::now() + self.report_interval, self.report_interval);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = self.queue.recv_async() => match received {
                    Ok(sample) => self.batch.push(sample.to_record()),
                    Err(_) => break,
                },
                _ = flush.tick() => self.flush().await,
            }
        }

        // Senders stop once cancelled; the queue then reports disconnection.
        while let Ok(sample) = self.queue.recv_async().await {
            self.batch.push(sample.to_record());
        }
        self.flush().await;

        if !self.batch.is_empty() {
            tracing::warn!(
                worker = self.id,
                dropped = self.batch.len(),
                "Final send failed, discarding batch"
            );
        }
        tracing::debug!(worker = self.id, "Worker stopped");
    }

    async fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        match self.sender.send(&self.batch).await {
            Ok(()) => {
                tracing::debug!(worker = self.id, count = self.batch.len(), "Batch sent");
                self.batch.clear();
            }
            Err(e) => {
                tracing::error!(
                    worker = self.id,
                    retained = self.batch.len(),
                    error = %e,
                    "Failed to send batch, keeping it for the next interval"
                );
            }
        }
    }
}

/// Starts `count` workers sharing one queue and one sender.
pub fn spawn_workers(
    count: usize,
    queue: flume::Receiver<Sample>,
    sender: Arc<MetricSender>,
    report_interval: Duration,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|id| {
            let worker = Worker::new(id, queue.clone(), Arc::clone(&sender), report_interval);
            tokio::spawn(worker.run(cancel.clone()))
        })
        .collect()
}
