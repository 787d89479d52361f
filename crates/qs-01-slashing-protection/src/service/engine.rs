//! # Decision Engine
//!
//! Evaluates one request against the ledger inside the caller's transaction.
//! On `Permit` the new record has been written to the transaction and the
//! caller must commit it. On `Deny` nothing was written.
//!
//! The first permit of a duty kind also writes a zero floor for that kind.
//! A zero floor denies nothing; it is the baseline the pruner advances from.

use shared_types::{Epoch, SigningRoot, Slot, ValidatorId};

use crate::domain::decision::{
    check_attestation_floor, check_block_floor, resolve_existing, DenialReason, SigningDecision,
};
use crate::domain::errors::StoreError;
use crate::ledger::LedgerTransaction;
use crate::ports::outbound::KeyValueStore;

pub fn decide_block<S: KeyValueStore + ?Sized>(
    tx: &mut LedgerTransaction<'_, S>,
    validator_id: ValidatorId,
    slot: Slot,
    signing_root: &SigningRoot,
) -> Result<SigningDecision, StoreError> {
    let watermark = tx.get_watermark(validator_id)?;
    if let Some(reason) = check_block_floor(watermark.as_ref(), slot) {
        return Ok(SigningDecision::Deny(reason));
    }

    if let Some(existing) = tx.find_block_at_slot(validator_id, slot)? {
        return Ok(resolve_existing(
            &existing.signing_root,
            signing_root,
            DenialReason::DoubleBlockProposal,
        ));
    }

    tx.insert_block(validator_id, slot, signing_root)?;
    if watermark.and_then(|w| w.slot).is_none() {
        tx.update_slot_watermark(validator_id, 0)?;
    }
    Ok(SigningDecision::Permit)
}

pub fn decide_attestation<S: KeyValueStore + ?Sized>(
    tx: &mut LedgerTransaction<'_, S>,
    validator_id: ValidatorId,
    source_epoch: Epoch,
    target_epoch: Epoch,
    signing_root: &SigningRoot,
) -> Result<SigningDecision, StoreError> {
    let watermark = tx.get_watermark(validator_id)?;
    if let Some(reason) = check_attestation_floor(watermark.as_ref(), source_epoch, target_epoch) {
        return Ok(SigningDecision::Deny(reason));
    }

    if let Some(existing) = tx.find_attestation_at_target_epoch(validator_id, target_epoch)? {
        // Only the root is compared: identical roots imply identical sources.
        return Ok(resolve_existing(
            &existing.signing_root,
            signing_root,
            DenialReason::DoubleVote,
        ));
    }

    if !tx
        .find_surrounding_attestations(validator_id, source_epoch, target_epoch)?
        .is_empty()
    {
        return Ok(SigningDecision::Deny(DenialReason::SurroundedVote));
    }

    if !tx
        .find_surrounded_attestations(validator_id, source_epoch, target_epoch)?
        .is_empty()
    {
        return Ok(SigningDecision::Deny(DenialReason::SurroundingVote));
    }

    tx.insert_attestation(validator_id, source_epoch, target_epoch, signing_root)?;
    if watermark.and_then(|w| w.target_epoch).is_none() {
        tx.update_epoch_watermarks(validator_id, 0, 0)?;
    }
    Ok(SigningDecision::Permit)
}
