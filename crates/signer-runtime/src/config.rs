//! # Signer Configuration
//!
//! Sources, lowest precedence first:
//!
//! 1. Defaults
//! 2. JSON file (`--config`)
//! 3. `QS_*` environment variables
//! 4. CLI flags
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `QS_DATA_DIR` | `storage.data_dir` |
//! | `QS_STORAGE_BACKEND` | `storage.backend` (`memory`, `file`, `rocksdb`) |
//! | `QS_SYNC_WRITES` | `storage.sync_writes` |
//! | `QS_LOCK_WAIT_SECS` | `storage.lock_wait` |
//! | `QS_SLASHING_ENABLED` | `slashing.enabled` |
//! | `QS_LOCK_TIMEOUT_MS` | `slashing.lock_timeout` |
//! | `QS_GENESIS_VALIDATORS_ROOT` | `slashing.genesis_validators_root` |
//! | `QS_PRUNING_ENABLED` | `slashing.pruning.enabled` |
//! | `QS_PRUNING_EPOCHS_TO_KEEP` | `slashing.pruning.epochs_to_keep` |
//! | `QS_PRUNING_SLOTS_PER_EPOCH` | `slashing.pruning.slots_per_epoch` |
//! | `QS_PRUNING_INTERVAL_SECS` | `slashing.pruning.interval` |
//! | `QS_PRUNING_AT_BOOT` | `slashing.pruning.at_boot` |
//! | `QS_VALIDATORS` | `validators` (comma-separated hex) |

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use qs_01_slashing_protection::SlashingProtectionConfig;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use shared_types::{SigningRoot, ValidatorPublicKey, BLS_PUBLIC_KEY_LEN};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Storage backend '{0}' is not compiled into this binary")]
    UnsupportedBackend(StorageBackend),

    #[error("Invalid validator public key {key:?}: {reason}")]
    InvalidPublicKey { key: String, reason: String },

    #[error(transparent)]
    Slashing(#[from] qs_01_slashing_protection::SlashingProtectionError),
}

/// Complete signer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    pub storage: StorageConfig,
    pub slashing: SlashingProtectionConfig,
    /// Hex-encoded BLS public keys to register at startup.
    pub validators: Vec<String>,
}

/// Storage configuration.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the ledger and its `LOCK` file.
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
    /// fsync every RocksDB batch (default: true).
    pub sync_writes: bool,
    /// How long to wait for another process to release the data directory.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub lock_wait: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            backend: StorageBackend::File,
            sync_writes: true,
            lock_wait: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Ephemeral. History is lost on exit.
    Memory,
    /// Single file under the data directory.
    File,
    /// RocksDB under the data directory (feature `rocksdb`).
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            "rocksdb" => Ok(StorageBackend::RocksDb),
            other => Err(format!("unknown storage backend {:?}", other)),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageBackend::Memory => "memory",
            StorageBackend::File => "file",
            StorageBackend::RocksDb => "rocksdb",
        };
        f.write_str(name)
    }
}

impl SignerConfig {
    /// Defaults, overlaid with the file at `path` if given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `QS_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `QS_*` overrides from `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("QS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = parse_env(&lookup, "QS_STORAGE_BACKEND")? {
            self.storage.backend = backend;
        }
        if let Some(sync) = parse_env(&lookup, "QS_SYNC_WRITES")? {
            self.storage.sync_writes = sync;
        }
        if let Some(secs) = parse_env(&lookup, "QS_LOCK_WAIT_SECS")? {
            self.storage.lock_wait = Duration::from_secs(secs);
        }

        let slashing = &mut self.slashing;
        if let Some(enabled) = parse_env(&lookup, "QS_SLASHING_ENABLED")? {
            slashing.enabled = enabled;
        }
        if let Some(millis) = parse_env(&lookup, "QS_LOCK_TIMEOUT_MS")? {
            slashing.lock_timeout = Duration::from_millis(millis);
        }
        if let Some(root) = parse_env::<SigningRoot, _>(&lookup, "QS_GENESIS_VALIDATORS_ROOT")? {
            slashing.genesis_validators_root = root;
        }

        let pruning = &mut slashing.pruning;
        if let Some(enabled) = parse_env(&lookup, "QS_PRUNING_ENABLED")? {
            pruning.enabled = enabled;
        }
        if let Some(epochs) = parse_env(&lookup, "QS_PRUNING_EPOCHS_TO_KEEP")? {
            pruning.epochs_to_keep = epochs;
        }
        if let Some(slots) = parse_env(&lookup, "QS_PRUNING_SLOTS_PER_EPOCH")? {
            pruning.slots_per_epoch = slots;
        }
        if let Some(secs) = parse_env(&lookup, "QS_PRUNING_INTERVAL_SECS")? {
            pruning.interval = Duration::from_secs(secs);
        }
        if let Some(at_boot) = parse_env(&lookup, "QS_PRUNING_AT_BOOT")? {
            pruning.at_boot = at_boot;
        }

        if let Some(keys) = lookup("QS_VALIDATORS") {
            self.validators = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }

    /// Reject invalid tunables and malformed public keys.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.slashing.validate()?;
        if self.storage.backend == StorageBackend::RocksDb && !cfg!(feature = "rocksdb") {
            return Err(ConfigError::UnsupportedBackend(self.storage.backend));
        }
        self.public_keys().map(|_| ())
    }

    /// Parsed `validators`.
    pub fn public_keys(&self) -> Result<Vec<ValidatorPublicKey>, ConfigError> {
        self.validators
            .iter()
            .map(|key| {
                let public_key =
                    ValidatorPublicKey::from_hex(key).map_err(|e| ConfigError::InvalidPublicKey {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?;
                if !public_key.is_bls() {
                    return Err(ConfigError::InvalidPublicKey {
                        key: key.clone(),
                        reason: format!(
                            "expected {} bytes, got {}",
                            BLS_PUBLIC_KEY_LEN,
                            public_key.as_bytes().len()
                        ),
                    });
                }
                Ok(public_key)
            })
            .collect()
    }
}

fn parse_env<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value }),
    }
}
