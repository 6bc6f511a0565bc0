use crate::config::ServerConfig;
use std::sync::Arc;
use tally_storage::error::Result;
use tally_storage::{DatabaseStore, FileStore, FileStoreConfig, MemoryStore, Storage};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The storage stack selected at startup.
pub enum StorageBackend {
    /// In-memory store wrapped by snapshot persistence.
    File(Arc<FileStore>),
    Database(Arc<DatabaseStore>),
}

impl StorageBackend {
    /// Uses the database when a DSN is configured, otherwise memory plus
    /// snapshot file.
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        if let Some(dsn) = config.database_dsn() {
            let store = DatabaseStore::connect(dsn).await?;
            return Ok(StorageBackend::Database(Arc::new(store)));
        }

        let store = FileStore::open(
            Arc::new(MemoryStore::new()),
            FileStoreConfig {
                file_path: config.snapshot_path(),
                store_interval: config.store_interval(),
                restore: config.restore,
            },
        )
        .await?;
        tracing::info!(
            path = ?store.file_path(),
            interval_secs = config.store_interval_secs,
            write_through = store.is_write_through(),
            "Using in-memory storage with snapshots"
        );
        Ok(StorageBackend::File(Arc::new(store)))
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        match self {
            StorageBackend::File(store) => Arc::clone(store) as Arc<dyn Storage>,
            StorageBackend::Database(store) => Arc::clone(store) as Arc<dyn Storage>,
        }
    }

    /// Starts the periodic snapshot task, if this backend has one.
    pub fn spawn_background(&self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        match self {
            StorageBackend::File(store) => store.spawn_periodic_backup(cancel),
            StorageBackend::Database(_) => None,
        }
    }

    /// Final shutdown step: one last snapshot, or closing the pool.
    pub async fn shutdown(self) -> Result<()> {
        match self {
            StorageBackend::File(store) => {
                store.backup_data().await?;
                tracing::info!("Final snapshot written");
            }
            StorageBackend::Database(store) => match Arc::try_unwrap(store) {
                Ok(store) => store.close().await?,
                Err(_) => tracing::debug!("Database still shared, pool closes on drop"),
            },
        }
        Ok(())
    }
}
