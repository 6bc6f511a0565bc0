use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Metrics service address, with or without scheme (`localhost:8080`).
    pub server_endpoint: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    /// Number of concurrent batching workers.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// HMAC-SHA256 key; when set every request carries a `HashSHA256` header.
    pub signing_key: Option<String>,
    /// Gzip request bodies.
    #[serde(default = "default_compress")]
    pub compress: bool,
    /// Delays between retries of one send, in seconds.
    #[serde(default = "default_backoff")]
    pub backoff_secs: Vec<u64>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Filesystem reported as `TotalDiskSpace` / `FreeDiskSpace`.
    #[serde(default = "default_disk_path")]
    pub disk_path: PathBuf,
}

fn default_poll_interval() -> u64 {
    2
}

fn default_report_interval() -> u64 {
    10
}

fn default_rate_limit() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    100
}

fn default_compress() -> bool {
    true
}

fn default_backoff() -> Vec<u64> {
    vec![1, 2, 5]
}

fn default_request_timeout() -> u64 {
    10
}

fn default_disk_path() -> PathBuf {
    PathBuf::from("/")
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.server_endpoint.trim().is_empty(),
            "server_endpoint must not be empty"
        );
        anyhow::ensure!(self.poll_interval_secs > 0, "poll_interval_secs must be positive");
        anyhow::ensure!(
            self.report_interval_secs > 0,
            "report_interval_secs must be positive"
        );
        anyhow::ensure!(self.rate_limit > 0, "rate_limit must be at least 1");
        anyhow::ensure!(self.queue_capacity > 0, "queue_capacity must be at least 1");
        Ok(())
    }

    /// Base URL of the service; `http://` is assumed when no scheme is given.
    pub fn base_url(&self) -> String {
        let addr = self.server_endpoint.trim().trim_end_matches('/');
        if addr.contains("://") {
            return addr.to_string();
        }
        format!("http://{addr}")
    }

    pub fn updates_url(&self) -> String {
        format!("{}/updates/", self.base_url())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff_schedule(&self) -> Vec<Duration> {
        self.backoff_secs
            .iter()
            .copied()
            .map(Duration::from_secs)
            .collect()
    }
}
