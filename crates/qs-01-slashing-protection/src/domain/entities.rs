//! # Domain Entities
//!
//! Records the ledger holds for each registered validator.

use serde::{Deserialize, Serialize};
use shared_types::{Epoch, SigningRoot, Slot, ValidatorId};

/// A block duty already permitted for a validator at a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBlock {
    pub validator_id: ValidatorId,
    pub slot: Slot,
    pub signing_root: SigningRoot,
}

impl SignedBlock {
    pub fn new(validator_id: ValidatorId, slot: Slot, signing_root: SigningRoot) -> Self {
        Self {
            validator_id,
            slot,
            signing_root,
        }
    }
}

/// An attestation duty already permitted for a validator.
///
/// Stored records always satisfy `source_epoch <= target_epoch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAttestation {
    pub validator_id: ValidatorId,
    pub source_epoch: Epoch,
    pub target_epoch: Epoch,
    pub signing_root: SigningRoot,
}

impl SignedAttestation {
    pub fn new(
        validator_id: ValidatorId,
        source_epoch: Epoch,
        target_epoch: Epoch,
        signing_root: SigningRoot,
    ) -> Self {
        Self {
            validator_id,
            source_epoch,
            target_epoch,
            signing_root,
        }
    }

    /// Whether `self`'s (source, target) interval strictly contains `other`'s.
    pub fn surrounds(&self, other: &SignedAttestation) -> bool {
        surrounds(
            (self.source_epoch, self.target_epoch),
            (other.source_epoch, other.target_epoch),
        )
    }
}

/// `outer.source < inner.source && outer.target > inner.target`
pub fn surrounds(outer: (Epoch, Epoch), inner: (Epoch, Epoch)) -> bool {
    outer.0 < inner.0 && outer.1 > inner.1
}

/// Per-validator low-watermark.
///
/// Each field is an independent floor. `None` means no floor has been set for
/// that dimension yet; the row as a whole is absent until first written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningWatermark {
    pub validator_id: ValidatorId,
    pub slot: Option<Slot>,
    pub source_epoch: Option<Epoch>,
    pub target_epoch: Option<Epoch>,
}

impl SigningWatermark {
    /// A row with no floors set.
    pub fn empty(validator_id: ValidatorId) -> Self {
        Self {
            validator_id,
            slot: None,
            source_epoch: None,
            target_epoch: None,
        }
    }

    /// Raise-only update of the slot floor. Returns whether it moved.
    pub fn raise_slot(&mut self, slot: Slot) -> bool {
        raise(&mut self.slot, slot)
    }

    /// Raise-only update of both epoch floors. Returns whether either moved.
    pub fn raise_epochs(&mut self, source_epoch: Epoch, target_epoch: Epoch) -> bool {
        let source_moved = raise(&mut self.source_epoch, source_epoch);
        let target_moved = raise(&mut self.target_epoch, target_epoch);
        source_moved || target_moved
    }

    /// Whether a block at `slot` falls strictly below the slot floor.
    pub fn is_block_below(&self, slot: Slot) -> bool {
        self.slot.is_some_and(|floor| slot < floor)
    }

    /// Whether an attestation falls strictly below either epoch floor.
    pub fn is_attestation_below(&self, source_epoch: Epoch, target_epoch: Epoch) -> bool {
        self.target_epoch.is_some_and(|floor| target_epoch < floor)
            || self.source_epoch.is_some_and(|floor| source_epoch < floor)
    }
}

fn raise(current: &mut Option<u64>, candidate: u64) -> bool {
    match current {
        Some(value) if *value >= candidate => false,
        _ => {
            *current = Some(candidate);
            true
        }
    }
}
