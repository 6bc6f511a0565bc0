use std::time::Duration;
use tally_collector::Collector;
use tally_common::Sample;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Runs `collector` every `poll_interval` and pushes each sample into the
/// shared queue, waiting for room when the queue is full.
///
/// The task stops on cancellation (between passes) or when every receiver is
/// gone, dropping its queue handle so workers can observe the queue closing.
pub fn spawn_sampler(
    mut collector: Box<dyn Collector>,
    queue: flume::Sender<Sample>,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {}
            }

            let samples = match collector.collect() {
                Ok(samples) => samples,
                Err(e) => {
                    tracing::warn!(collector = collector.name(), error = %e, "Collection failed");
                    continue;
                }
            };
            tracing::debug!(collector = collector.name(), count = samples.len(), "Collected samples");

            // A pass is enqueued whole; workers keep draining after
            // cancellation, so this cannot stall shutdown.
            for sample in samples {
                if queue.send_async(sample).await.is_err() {
                    tracing::debug!(collector = collector.name(), "Queue closed");
                    return;
                }
            }
        }

        tracing::debug!(collector = collector.name(), "Sampler stopped");
    })
}
