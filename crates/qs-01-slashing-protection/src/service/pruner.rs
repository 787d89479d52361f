//! # Pruner
//!
//! Each sub-procedure holds the validator's lock for its duty kind and runs
//! two transactions: first the watermark is raised and committed, then the
//! records below it are deleted. An interrupted delete leaves the floor in
//! place, and re-running it is idempotent.

use shared_types::{DutyKind, Epoch, Slot, ValidatorId};
use tracing::debug;

use crate::adapters::lock::ValidatorLockManager;
use crate::domain::errors::SlashingProtectionError;
use crate::domain::pruning::{calculate_pruning_mark, slots_to_keep, validate_tunables, PruneOutcome};
use crate::ledger::LedgerStore;
use crate::metrics;
use crate::ports::outbound::KeyValueStore;

pub struct Pruner<'a, S: KeyValueStore + ?Sized> {
    ledger: &'a LedgerStore<S>,
    locks: &'a ValidatorLockManager,
}

impl<'a, S: KeyValueStore + ?Sized> Pruner<'a, S> {
    pub fn new(ledger: &'a LedgerStore<S>, locks: &'a ValidatorLockManager) -> Self {
        Self { ledger, locks }
    }

    pub fn prune_for_validator(
        &self,
        validator_id: ValidatorId,
        epochs_to_keep: u64,
        slots_per_epoch: u64,
    ) -> Result<PruneOutcome, SlashingProtectionError> {
        validate_tunables(epochs_to_keep, slots_per_epoch)?;
        let slots_to_keep = slots_to_keep(epochs_to_keep, slots_per_epoch);

        let (slot_watermark, blocks_deleted) = self.prune_blocks(validator_id, slots_to_keep)?;
        let (epoch_watermark, attestations_deleted) =
            self.prune_attestations(validator_id, epochs_to_keep)?;

        Ok(PruneOutcome {
            validator_id,
            slot_watermark,
            epoch_watermark,
            blocks_deleted,
            attestations_deleted,
        })
    }

    fn prune_blocks(
        &self,
        validator_id: ValidatorId,
        slots_to_keep: u64,
    ) -> Result<(Option<Slot>, u64), SlashingProtectionError> {
        self.locks.with_lock(validator_id, DutyKind::Block, || {
            let mut tx = self.ledger.begin();
            let current = tx.get_watermark(validator_id)?.and_then(|w| w.slot);
            let highest = tx.find_max_slot(validator_id)?;
            let Some(mark) = calculate_pruning_mark(slots_to_keep, highest, current) else {
                return Ok((None, 0));
            };
            let watermark = tx.update_slot_watermark(validator_id, mark)?;
            tx.commit()?;

            let floor = watermark.slot.unwrap_or(mark);
            let mut tx = self.ledger.begin();
            let deleted = tx.delete_blocks_below_slot(validator_id, floor)?;
            tx.commit()?;

            debug!(
                "[slashing] Validator {} block watermark {} ({} blocks deleted)",
                validator_id, floor, deleted
            );
            metrics::record_pruned(DutyKind::Block, deleted);
            Ok((Some(floor), deleted))
        })
    }

    fn prune_attestations(
        &self,
        validator_id: ValidatorId,
        epochs_to_keep: u64,
    ) -> Result<(Option<Epoch>, u64), SlashingProtectionError> {
        self.locks.with_lock(validator_id, DutyKind::Attestation, || {
            let mut tx = self.ledger.begin();
            let current = tx.get_watermark(validator_id)?.and_then(|w| w.target_epoch);
            let highest = tx.find_max_target_epoch(validator_id)?;
            let Some(mark) = calculate_pruning_mark(epochs_to_keep, highest, current) else {
                return Ok((None, 0));
            };
            let watermark = tx.update_epoch_watermarks(validator_id, mark, mark)?;
            tx.commit()?;

            let floor = watermark.target_epoch.unwrap_or(mark);
            let mut tx = self.ledger.begin();
            let deleted = tx.delete_attestations_below_epoch(validator_id, floor)?;
            tx.commit()?;

            debug!(
                "[slashing] Validator {} attestation watermark {} ({} attestations deleted)",
                validator_id, floor, deleted
            );
            metrics::record_pruned(DutyKind::Attestation, deleted);
            Ok((Some(floor), deleted))
        })
    }
}
