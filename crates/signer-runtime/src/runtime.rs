//! # Signer Runtime
//!
//! Owns everything with process lifetime: the data-directory lock, the
//! ledger backend, the engine and the pruning scheduler.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration
//! 2. Lock the data directory (durable backends only)
//! 3. Open the storage backend
//! 4. Build the engine and register configured validators
//! 5. Start the pruning scheduler (if enabled)

use std::sync::Arc;

use anyhow::{Context, Result};
use qs_01_slashing_protection::{
    DatabaseLock, KeyValueStore, SlashingProtection, SlashingProtectionService,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapters::storage::open_store;
use crate::config::{SignerConfig, StorageBackend};
use crate::scheduler::PruningScheduler;

pub type Engine = SlashingProtectionService<dyn KeyValueStore>;

pub struct SignerRuntime {
    config: SignerConfig,
    engine: Arc<Engine>,
    /// Released on drop.
    _data_lock: Option<DatabaseLock>,
    shutdown_tx: watch::Sender<bool>,
}

impl SignerRuntime {
    /// Open the ledger and register the configured validators.
    pub fn open(config: SignerConfig) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let data_lock = match config.storage.backend {
            StorageBackend::Memory => None,
            StorageBackend::File | StorageBackend::RocksDb => {
                let lock = DatabaseLock::acquire_with_timeout(
                    &config.storage.data_dir,
                    config.storage.lock_wait,
                )
                .with_context(|| format!("locking {}", config.storage.data_dir.display()))?;
                Some(lock)
            }
        };

        let store = open_store(&config.storage)?;
        let engine = Arc::new(SlashingProtectionService::new(
            store,
            config.slashing.clone(),
        )?);

        let public_keys = config.public_keys()?;
        if !public_keys.is_empty() {
            engine
                .register_validators(&public_keys)
                .context("registering configured validators")?;
        }

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            config,
            engine,
            _data_lock: data_lock,
            shutdown_tx,
        })
    }

    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    pub fn engine(&self) -> Arc<Engine> {
        Arc::clone(&self.engine)
    }

    /// Start background tasks. Returns the scheduler handle if pruning runs.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if !self.config.slashing.enabled {
            warn!("[runtime] Slashing protection is DISABLED. Signing requests are not checked");
            return None;
        }
        let pruning = &self.config.slashing.pruning;
        if !pruning.enabled {
            info!("[runtime] Pruning disabled");
            return None;
        }
        let scheduler = PruningScheduler::new(Arc::clone(&self.engine), pruning);
        Some(scheduler.spawn(self.shutdown_tx.subscribe()))
    }

    /// Signal background tasks to stop.
    pub fn shutdown(&self) {
        info!("[runtime] Initiating shutdown...");
        if self.shutdown_tx.send(true).is_err() {
            debug!("[runtime] No background tasks running");
        }
    }
}
