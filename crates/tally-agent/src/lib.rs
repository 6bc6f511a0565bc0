//! Collector agent: samples runtime and host statistics on independent
//! timers, batches them in a small worker pool and delivers the batches to
//! the metrics service with bounded retries.

pub mod batcher;
pub mod config;
pub mod error;
pub mod sampler;
pub mod sender;
pub mod transport;

use batcher::spawn_workers;
use config::AgentConfig;
use sampler::spawn_sampler;
use sender::MetricSender;
use std::sync::Arc;
use tally_collector::{Collector, HostCollector, RuntimeCollector};
use tokio_util::sync::CancellationToken;
use transport::{HttpTransport, Transport};

/// The assembled agent pipeline: samplers -> bounded queue -> workers ->
/// sender.
pub struct Agent {
    config: AgentConfig,
    collectors: Vec<Box<dyn Collector>>,
    transport: Arc<dyn Transport>,
}

impl Agent {
    /// Builds the agent with the runtime and host collectors and an HTTP
    /// transport.
    pub fn new(config: AgentConfig) -> anyhow::Result<Self> {
        let transport = HttpTransport::from_config(&config)?;
        let collectors: Vec<Box<dyn Collector>> = vec![
            Box::new(RuntimeCollector::new()?),
            Box::new(HostCollector::new(config.disk_path.clone())),
        ];
        Ok(Self::with_parts(config, collectors, Arc::new(transport)))
    }

    pub fn with_parts(
        config: AgentConfig,
        collectors: Vec<Box<dyn Collector>>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            collectors,
            transport,
        }
    }

    /// Runs until `cancel` fires, then waits for samplers to stop and for
    /// every worker to drain the queue and make its final send.
    pub async fn run(self, cancel: CancellationToken) {
        let (queue_tx, queue_rx) = flume::bounded(self.config.queue_capacity);
        let sender = Arc::new(MetricSender::new(
            self.transport,
            self.config.backoff_schedule(),
        ));

        tracing::info!(
            poll_interval_secs = self.config.poll_interval_secs,
            report_interval_secs = self.config.report_interval_secs,
            workers = self.config.rate_limit,
            server = %self.config.base_url(),
            "Starting agent pipeline"
        );

        let mut handles: Vec<_> = self
            .collectors
            .into_iter()
            .map(|collector| {
                spawn_sampler(
                    collector,
                    queue_tx.clone(),
                    self.config.poll_interval(),
                    cancel.clone(),
                )
            })
            .collect();
        // Only samplers may hold senders, so the queue closes when they stop.
        drop(queue_tx);

        handles.extend(spawn_workers(
            self.config.rate_limit,
            queue_rx,
            sender,
            self.config.report_interval(),
            cancel,
        ));

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Pipeline task failed");
            }
        }
        tracing::info!("Agent pipeline stopped");
    }
}
