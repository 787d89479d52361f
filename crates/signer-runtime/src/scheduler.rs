//! # Pruning Scheduler
//!
//! Runs `SlashingProtection::prune` every `interval`, optionally once at
//! startup. Each prune runs on the blocking pool since the engine performs
//! synchronous storage I/O under its validator locks. A failed prune is
//! logged and retried at the next tick.

use std::sync::Arc;
use std::time::Duration;

use qs_01_slashing_protection::{PruneSummary, PruningConfig, SlashingProtection};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

pub struct PruningScheduler<P: ?Sized> {
    protection: Arc<P>,
    interval: Duration,
    at_boot: bool,
}

impl<P> PruningScheduler<P>
where
    P: SlashingProtection + ?Sized + 'static,
{
    pub fn new(protection: Arc<P>, config: &PruningConfig) -> Self {
        Self {
            protection,
            interval: config.interval,
            at_boot: config.at_boot,
        }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Tick until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let first_tick = if self.at_boot {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };
        let mut ticker = tokio::time::interval_at(first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "[pruner] Scheduled every {:?} (at boot: {})",
            self.interval, self.at_boot
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.prune_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("[pruner] Shutdown signal received");
                        break;
                    }
                }
            }
        }
    }

    async fn prune_once(&self) -> Option<PruneSummary> {
        let protection = Arc::clone(&self.protection);
        debug!("[pruner] Starting scheduled prune");
        match tokio::task::spawn_blocking(move || protection.prune()).await {
            Ok(Ok(summary)) => Some(summary),
            Ok(Err(e)) => {
                error!("[pruner] Scheduled prune failed: {}", e);
                None
            }
            Err(e) => {
                error!("[pruner] Prune task panicked: {}", e);
                None
            }
        }
    }
}
