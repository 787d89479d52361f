//! # Storage Backend Selection
//!
//! | Backend | Location | Notes |
//! |---------|----------|-------|
//! | `memory` | - | History is lost on exit |
//! | `file` | `{data_dir}/slashing-protection.db` | Default |
//! | `rocksdb` | `{data_dir}/rocksdb/` | Requires the `rocksdb` feature |

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

use std::sync::Arc;

use anyhow::Context;
use qs_01_slashing_protection::{FileBackedKVStore, InMemoryKVStore, KeyValueStore};
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};

/// File name of the file-backed ledger inside the data directory.
pub const LEDGER_FILE_NAME: &str = "slashing-protection.db";

/// Open the configured backend.
pub fn open_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        StorageBackend::Memory => {
            info!("[runtime] Using in-memory ledger (history is not persisted)");
            Ok(Arc::new(InMemoryKVStore::new()))
        }
        StorageBackend::File => {
            std::fs::create_dir_all(&config.data_dir).with_context(|| {
                format!("creating data directory {}", config.data_dir.display())
            })?;
            let path = config.data_dir.join(LEDGER_FILE_NAME);
            let store = FileBackedKVStore::open(&path)
                .with_context(|| format!("opening ledger {}", path.display()))?;
            info!("[runtime] Using file-backed ledger at {}", path.display());
            Ok(Arc::new(store))
        }
        StorageBackend::RocksDb => open_rocksdb(config),
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(config: &StorageConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let rocks = RocksDbConfig {
        path: config.data_dir.join("rocksdb"),
        sync_writes: config.sync_writes,
        ..Default::default()
    };
    let store = RocksDbStore::open(rocks.clone())
        .with_context(|| format!("opening RocksDB at {}", rocks.path.display()))?;
    info!("[runtime] Using RocksDB ledger at {}", rocks.path.display());
    Ok(Arc::new(store))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_config: &StorageConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    anyhow::bail!("storage backend 'rocksdb' requires building with --features rocksdb")
}
