//! # Engine Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, DurationMilliSeconds};
use shared_types::SigningRoot;

use super::errors::SlashingProtectionError;
use super::pruning::PruningConfig;

/// Default wait for a (validator, duty kind) lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the slashing protection engine.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlashingProtectionConfig {
    /// Enforce slashing protection on signing requests. When false every
    /// request is permitted without consulting or recording history.
    pub enabled: bool,
    /// Maximum wait for a validator lock before the request fails.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub lock_timeout: Duration,
    /// Retention policy.
    pub pruning: PruningConfig,
    /// Written into the interchange metadata on export.
    #[serde_as(as = "DisplayFromStr")]
    pub genesis_validators_root: SigningRoot,
}

impl Default for SlashingProtectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            pruning: PruningConfig::default(),
            genesis_validators_root: SigningRoot::new(vec![0u8; 32]),
        }
    }
}

impl SlashingProtectionConfig {
    pub fn validate(&self) -> Result<(), SlashingProtectionError> {
        if self.lock_timeout.is_zero() {
            return Err(SlashingProtectionError::Configuration(
                "lock_timeout must be greater than zero".to_string(),
            ));
        }
        self.pruning.validate()
    }
}
