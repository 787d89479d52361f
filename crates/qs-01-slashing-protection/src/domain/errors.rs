//! # Domain Errors
//!
//! ## Taxonomy
//!
//! - Safety denials are NOT errors: they are `SigningDecision::Deny`.
//! - `Configuration` - invalid tunables, fatal to the call.
//! - `Storage` - backend or lock faults. Retryable, never an implicit permit.
//! - `InvariantViolation` - a store constraint was breached. A logic bug.
//! - `Corruption` - a stored record is unreadable. Not retryable.

use std::time::Duration;

use shared_types::{DutyKind, ValidatorId};
use thiserror::Error;

/// Key-value backend errors.
#[derive(Debug, Clone, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },
    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}

/// Ledger store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed. Transient.
    #[error(transparent)]
    Backend(#[from] KVStoreError),

    /// A write would break a ledger invariant.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored value could not be decoded.
    #[error("Corrupt {what} record: {reason}")]
    Decode { what: &'static str, reason: String },

    /// A value could not be encoded for storage.
    #[error("Failed to encode {what} record: {reason}")]
    Encode { what: &'static str, reason: String },

    /// The (validator, kind) lock was not acquired in time. Nothing was run.
    #[error("Timed out after {waited:?} waiting for {kind} lock of validator {validator_id}")]
    LockTimeout {
        validator_id: ValidatorId,
        kind: DutyKind,
        waited: Duration,
    },
}

impl StoreError {
    pub fn constraint(message: impl Into<String>) -> Self {
        StoreError::ConstraintViolation(message.into())
    }

    pub(crate) fn decode(what: &'static str, err: impl std::fmt::Display) -> Self {
        StoreError::Decode {
            what,
            reason: err.to_string(),
        }
    }

    pub(crate) fn encode(what: &'static str, err: impl std::fmt::Display) -> Self {
        StoreError::Encode {
            what,
            reason: err.to_string(),
        }
    }
}

/// Errors surfaced by the slashing protection API.
#[derive(Debug, Error)]
pub enum SlashingProtectionError {
    /// Invalid configuration or tunables.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Storage or lock failure. The operation was not performed.
    #[error("Storage fault: {0}")]
    Storage(StoreError),

    /// A ledger invariant was breached.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The ledger holds data that cannot be read back.
    #[error("Corrupt ledger: {0}")]
    Corruption(String),

    /// The public key was never registered with this instance.
    #[error("Validator {public_key} is not registered")]
    UnregisteredValidator { public_key: String },

    /// The key is not a 48-byte compressed BLS public key.
    #[error("Public key {public_key} has {length} bytes, expected 48")]
    InvalidPublicKey { public_key: String, length: usize },

    /// Interchange import is not supported.
    #[error("Importing interchange data is not supported")]
    ImportUnsupported,

    /// Interchange document could not be serialized.
    #[error("Interchange export failed: {0}")]
    Interchange(#[from] serde_json::Error),

    /// The export destination failed.
    #[error("Failed to write interchange output: {0}")]
    Output(#[from] std::io::Error),
}

impl SlashingProtectionError {
    /// Only storage faults may be retried by callers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SlashingProtectionError::Storage(_))
    }
}

impl From<StoreError> for SlashingProtectionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConstraintViolation(message) => {
                SlashingProtectionError::InvariantViolation(message)
            }
            err @ StoreError::Encode { .. } => {
                SlashingProtectionError::InvariantViolation(err.to_string())
            }
            err @ (StoreError::Decode { .. }
            | StoreError::Backend(KVStoreError::CorruptionError { .. })) => {
                SlashingProtectionError::Corruption(err.to_string())
            }
            other => SlashingProtectionError::Storage(other),
        }
    }
}

impl From<KVStoreError> for SlashingProtectionError {
    fn from(err: KVStoreError) -> Self {
        StoreError::Backend(err).into()
    }
}

/// Result type for slashing protection operations.
pub type SlashingProtectionResult<T> = Result<T, SlashingProtectionError>;
