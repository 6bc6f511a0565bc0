use crate::error::{Result, StorageError};
use crate::{CounterMetric, GaugeMetric, Storage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// On-disk snapshot format.
///
/// ```json
/// {"counters":[{"name":"PollCount","value":5}],"gauges":[{"name":"Alloc","value":1.5}]}
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub counters: Vec<CounterMetric>,
    #[serde(default)]
    pub gauges: Vec<GaugeMetric>,
}

#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// `None` disables both restore and snapshots.
    pub file_path: Option<PathBuf>,
    /// Zero snapshots after every write; otherwise the period of the
    /// background snapshot task.
    pub store_interval: Duration,
    /// Load the snapshot into the wrapped store on open.
    pub restore: bool,
}

/// Snapshotting decorator over another [`Storage`].
///
/// Reads are served by the wrapped store. Writes and snapshots are
/// serialized by one async mutex, so a snapshot always reflects a state
/// between writes and the file on disk is only ever replaced whole.
pub struct FileStore {
    inner: Arc<dyn Storage>,
    file_path: Option<PathBuf>,
    store_interval: Duration,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Wraps `inner`, restoring the snapshot first when configured.
    ///
    /// A missing snapshot file is not an error; a malformed one is.
    pub async fn open(inner: Arc<dyn Storage>, config: FileStoreConfig) -> Result<Self> {
        let file_path = config
            .file_path
            .filter(|path| !path.as_os_str().is_empty());
        let store = Self {
            inner,
            file_path,
            store_interval: config.store_interval,
            write_lock: Mutex::new(()),
        };

        if config.restore {
            if let Some(path) = &store.file_path {
                store.restore(path).await?;
            }
        }

        Ok(store)
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Whether every acknowledged write has already been snapshotted.
    pub fn is_write_through(&self) -> bool {
        self.file_path.is_some() && self.store_interval.is_zero()
    }

    async fn restore(&self, path: &Path) -> Result<()> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No snapshot to restore");
                return Ok(());
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let snapshot: Snapshot =
            serde_json::from_slice(&data).map_err(|source| StorageError::Snapshot {
                path: path.to_path_buf(),
                source,
            })?;

        self.inner
            .add_batch(&snapshot.gauges, &snapshot.counters)
            .await?;
        tracing::info!(
            path = %path.display(),
            gauges = snapshot.gauges.len(),
            counters = snapshot.counters.len(),
            "Restored metrics snapshot"
        );
        Ok(())
    }

    /// Writes a snapshot now. Used by the periodic task and for the final
    /// flush at shutdown; a no-op without a file path.
    pub async fn backup_data(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_snapshot().await
    }

    async fn write_snapshot(&self) -> Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };

        let mut snapshot = Snapshot {
            counters: self.inner.list_counters().await?,
            gauges: self.inner.list_gauges().await?,
        };
        snapshot.counters.sort_by(|a, b| a.name.cmp(&b.name));
        snapshot.gauges.sort_by(|a, b| a.name.cmp(&b.name));

        let data = serde_json::to_vec(&snapshot).map_err(|source| StorageError::Snapshot {
            path: path.clone(),
            source,
        })?;

        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, &data).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

        tracing::debug!(
            path = %path.display(),
            gauges = snapshot.gauges.len(),
            counters = snapshot.counters.len(),
            "Snapshot written"
        );
        Ok(())
    }

    async fn after_write(&self) -> Result<()> {
        if self.is_write_through() {
            self.write_snapshot().await
        } else {
            Ok(())
        }
    }

    /// Starts the background snapshot loop when a positive interval and a
    /// file path are configured. The loop exits when `cancel` fires; the
    /// final flush is left to the caller via [`backup_data`](Self::backup_data).
    pub fn spawn_periodic_backup(
        self: &Arc<Self>,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        if self.file_path.is_none() || self.store_interval.is_zero() {
            return None;
        }

        let store = Arc::clone(self);
        let period = self.store_interval;
        Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = store.backup_data().await {
                            tracing::error!(error = %e, "Periodic snapshot failed");
                        }
                    }
                }
            }
            tracing::debug!("Periodic snapshot task stopped");
        }))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[async_trait]
impl Storage for FileStore {
    async fn get_gauge(&self, name: &str) -> Result<GaugeMetric> {
        self.inner.get_gauge(name).await
    }

    async fn get_counter(&self, name: &str) -> Result<CounterMetric> {
        self.inner.get_counter(name).await
    }

    async fn list_gauges(&self) -> Result<Vec<GaugeMetric>> {
        self.inner.list_gauges().await
    }

    async fn list_counters(&self) -> Result<Vec<CounterMetric>> {
        self.inner.list_counters().await
    }

    async fn add_gauge(&self, name: &str, value: f64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.inner.add_gauge(name, value).await?;
        self.after_write().await
    }

    async fn add_counter(&self, name: &str, delta: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.inner.add_counter(name, delta).await?;
        self.after_write().await
    }

    async fn add_batch(&self, gauges: &[GaugeMetric], counters: &[CounterMetric]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.inner.add_batch(gauges, counters).await?;
        self.after_write().await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}
