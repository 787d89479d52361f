//! # Inbound Ports (Driving Ports)
//!
//! The API the signing-request handler and operator tooling call.

use std::io::{Read, Write};

use shared_types::{Epoch, SigningRoot, Slot, ValidatorId, ValidatorPublicKey};

use crate::domain::decision::SigningDecision;
use crate::domain::errors::SlashingProtectionResult;
use crate::domain::pruning::{PruneOutcome, PruneSummary};

/// Primary API for slashing protection.
///
/// Implementations must enforce all domain invariants. A `Deny` decision is a
/// successful call: the caller must refuse to sign and answer its client with
/// a 403-equivalent. An `Err` is a fault (5xx-equivalent) and must never be
/// treated as a permit.
pub trait SlashingProtection: Send + Sync {
    /// Register the configured key set. Idempotent.
    ///
    /// Must be called before signing traffic is accepted, and again after any
    /// live key reload.
    fn register_validators(&self, public_keys: &[ValidatorPublicKey]) -> SlashingProtectionResult<()>;

    /// Check a block proposal and record it on permit.
    ///
    /// ## Errors
    ///
    /// - `UnregisteredValidator`: the key was not registered with this instance
    /// - `Storage`: lock timeout or backend fault, nothing was recorded
    fn may_sign_block(
        &self,
        public_key: &ValidatorPublicKey,
        slot: Slot,
        signing_root: &SigningRoot,
    ) -> SlashingProtectionResult<SigningDecision>;

    /// Check an attestation and record it on permit.
    fn may_sign_attestation(
        &self,
        public_key: &ValidatorPublicKey,
        source_epoch: Epoch,
        target_epoch: Epoch,
        signing_root: &SigningRoot,
    ) -> SlashingProtectionResult<SigningDecision>;

    /// Prune every registered validator with the configured retention.
    fn prune(&self) -> SlashingProtectionResult<PruneSummary>;

    /// Prune one validator.
    ///
    /// ## Errors
    ///
    /// - `Configuration`: `epochs_to_keep` or `slots_per_epoch` is zero
    fn prune_for_validator(
        &self,
        validator_id: ValidatorId,
        epochs_to_keep: u64,
        slots_per_epoch: u64,
    ) -> SlashingProtectionResult<PruneOutcome>;

    /// Write the interchange document for all registered validators.
    fn export(&self, output: &mut dyn Write) -> SlashingProtectionResult<()>;

    /// Always fails with `ImportUnsupported`.
    fn import(&self, input: &mut dyn Read) -> SlashingProtectionResult<()>;
}
