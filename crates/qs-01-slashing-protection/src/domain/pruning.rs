//! # Pruning Arithmetic
//!
//! Retention is measured back from the newest stored duty:
//!
//! ```text
//! pruning_point = max(0, max_index - amount_to_keep + 1)
//! new_watermark = max(pruning_point, current_watermark)
//! ```
//!
//! No mark is produced unless both a newest duty and a current watermark
//! exist. The watermark therefore only ever advances. The decision engine
//! writes the zero baseline on a validator's first permit of each kind, so a
//! validator that never had a duty permitted is left untouched.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use shared_types::{Epoch, Slot, ValidatorId};

use super::errors::SlashingProtectionError;

/// Retention configuration.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningConfig {
    /// Enable scheduled pruning.
    pub enabled: bool,
    /// Epochs of attestation history to keep (default: 10,000).
    pub epochs_to_keep: u64,
    /// Slots per epoch of the network (default: 32).
    pub slots_per_epoch: u64,
    /// Interval between scheduled prunes (default: 24h).
    #[serde_as(as = "DurationSeconds<u64>")]
    pub interval: Duration,
    /// Prune once at startup before the first interval elapses.
    pub at_boot: bool,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            epochs_to_keep: 10_000,
            slots_per_epoch: 32,
            interval: Duration::from_secs(24 * 60 * 60),
            at_boot: false,
        }
    }
}

impl PruningConfig {
    /// Reject non-positive tunables and a zero interval.
    pub fn validate(&self) -> Result<(), SlashingProtectionError> {
        if self.interval.is_zero() {
            return Err(SlashingProtectionError::Configuration(
                "pruning interval must be greater than zero".to_string(),
            ));
        }
        validate_tunables(self.epochs_to_keep, self.slots_per_epoch)
    }
}

pub fn validate_tunables(
    epochs_to_keep: u64,
    slots_per_epoch: u64,
) -> Result<(), SlashingProtectionError> {
    if epochs_to_keep == 0 {
        return Err(SlashingProtectionError::Configuration(format!(
            "epochs_to_keep must be a positive value, but was {}",
            epochs_to_keep
        )));
    }
    if slots_per_epoch == 0 {
        return Err(SlashingProtectionError::Configuration(format!(
            "slots_per_epoch must be a positive value, but was {}",
            slots_per_epoch
        )));
    }
    Ok(())
}

/// `max(epochs_to_keep / slots_per_epoch, 1)`
///
/// Callers must have validated `slots_per_epoch > 0`.
pub fn slots_to_keep(epochs_to_keep: u64, slots_per_epoch: u64) -> u64 {
    (epochs_to_keep / slots_per_epoch).max(1)
}

/// Compute the watermark a prune should advance to, if any.
pub fn calculate_pruning_mark(
    amount_to_keep: u64,
    highpoint: Option<u64>,
    watermark: Option<u64>,
) -> Option<u64> {
    let highpoint = highpoint?;
    let watermark = watermark?;
    let pruning_point = if highpoint < amount_to_keep {
        0
    } else {
        highpoint - amount_to_keep + 1
    };
    Some(pruning_point.max(watermark))
}

/// Result of pruning one validator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub validator_id: ValidatorId,
    /// Slot watermark after the prune, if blocks were pruned.
    pub slot_watermark: Option<Slot>,
    /// Epoch watermark after the prune, if attestations were pruned.
    pub epoch_watermark: Option<Epoch>,
    pub blocks_deleted: u64,
    pub attestations_deleted: u64,
}

impl PruneOutcome {
    pub fn is_noop(&self) -> bool {
        self.slot_watermark.is_none() && self.epoch_watermark.is_none()
    }
}

/// Aggregate result of a prune across validators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneSummary {
    pub validators_pruned: u64,
    pub blocks_deleted: u64,
    pub attestations_deleted: u64,
}

impl PruneSummary {
    pub fn record(&mut self, outcome: &PruneOutcome) {
        if !outcome.is_noop() {
            self.validators_pruned += 1;
        }
        self.blocks_deleted += outcome.blocks_deleted;
        self.attestations_deleted += outcome.attestations_deleted;
    }
}
