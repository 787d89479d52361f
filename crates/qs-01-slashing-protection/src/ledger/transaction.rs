use std::collections::BTreeMap;

use shared_types::{DutyKind, Epoch, SigningRoot, Slot, ValidatorId, ValidatorPublicKey};

use crate::domain::entities::{surrounds, SignedAttestation, SignedBlock, SigningWatermark};
use crate::domain::errors::StoreError;
use crate::domain::keys::{
    attestation_key, block_key, decode_index, decode_u64, decode_validator_id, public_key_key,
    validator_key, watermark_key, KeyPrefix, NEXT_VALIDATOR_ID_KEY,
};
use crate::ports::outbound::{BatchOperation, KeyValueStore};

/// Stored attestation value: `(source_epoch, signing_root)`.
type AttestationValue = (Epoch, Vec<u8>);

/// Stored epoch floors: `(source_epoch, target_epoch)`.
type EpochFloors = (Epoch, Epoch);

/// A unit of work over the ledger.
///
/// Reads see this transaction's own uncommitted writes. Isolation between
/// transactions comes from the validator locks held by the caller.
pub struct LedgerTransaction<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
    /// `None` marks a pending delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, S: KeyValueStore + ?Sized> LedgerTransaction<'a, S> {
    pub(crate) fn new(store: &'a S) -> Self {
        Self {
            store,
            writes: BTreeMap::new(),
        }
    }

    /// Flush all buffered writes as one atomic batch.
    pub fn commit(self) -> Result<(), StoreError> {
        if self.writes.is_empty() {
            return Ok(());
        }
        let operations = self
            .writes
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOperation::put(key, value),
                None => BatchOperation::delete(key),
            })
            .collect();
        self.store.atomic_batch_write(operations)?;
        Ok(())
    }

    /// Number of buffered writes.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    // =========================================================================
    // RAW ACCESS
    // =========================================================================

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.writes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => Ok(self.store.get(key)?),
        }
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        match self.writes.get(key) {
            Some(pending) => Ok(pending.is_some()),
            None => Ok(self.store.exists(key)?),
        }
    }

    /// Committed entries merged with pending writes, in key order.
    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.prefix_scan(prefix)?.into_iter().collect();
        for (key, pending) in self.writes.iter().filter(|(k, _)| k.starts_with(prefix)) {
            match pending {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.writes.insert(key, None);
    }

    // =========================================================================
    // VALIDATORS
    // =========================================================================

    pub fn find_validator_id(
        &self,
        public_key: &ValidatorPublicKey,
    ) -> Result<Option<ValidatorId>, StoreError> {
        self.get(&validator_key(public_key))?
            .map(|bytes| decode_u64(&bytes, "validator").map(ValidatorId))
            .transpose()
    }

    pub fn find_public_key(
        &self,
        validator_id: ValidatorId,
    ) -> Result<Option<ValidatorPublicKey>, StoreError> {
        Ok(self.get(&public_key_key(validator_id))?.map(ValidatorPublicKey::new))
    }

    pub fn is_registered(&self, validator_id: ValidatorId) -> Result<bool, StoreError> {
        self.exists(&public_key_key(validator_id))
    }

    /// Id the next new registration will receive.
    pub fn next_validator_id(&self) -> Result<u64, StoreError> {
        match self.get(NEXT_VALIDATOR_ID_KEY)? {
            Some(bytes) => decode_u64(&bytes, "validator id counter"),
            None => Ok(1),
        }
    }

    /// Idempotent insert; already-present keys keep their id.
    ///
    /// The caller must serialize concurrent registrations (see
    /// `LedgerStore::register_validators`).
    pub fn register_validators(
        &mut self,
        public_keys: &[ValidatorPublicKey],
    ) -> Result<Vec<ValidatorId>, StoreError> {
        let mut next = self.next_validator_id()?;
        let mut ids = Vec::with_capacity(public_keys.len());

        for public_key in public_keys {
            if let Some(id) = self.find_validator_id(public_key)? {
                ids.push(id);
                continue;
            }
            let id = ValidatorId(next);
            next += 1;
            self.put(validator_key(public_key), id.to_be_bytes().to_vec());
            self.put(public_key_key(id), public_key.as_bytes().to_vec());
            ids.push(id);
        }

        self.put(NEXT_VALIDATOR_ID_KEY.to_vec(), next.to_be_bytes().to_vec());
        Ok(ids)
    }

    /// All registered validators, in id order.
    pub fn list_validators(&self) -> Result<Vec<(ValidatorId, ValidatorPublicKey)>, StoreError> {
        self.scan(KeyPrefix::PublicKeyById.as_bytes())?
            .into_iter()
            .map(|(key, value)| -> Result<_, StoreError> {
                Ok((decode_validator_id(&key)?, ValidatorPublicKey::new(value)))
            })
            .collect()
    }

    fn require_registered(&self, validator_id: ValidatorId) -> Result<(), StoreError> {
        if self.is_registered(validator_id)? {
            Ok(())
        } else {
            Err(StoreError::constraint(format!(
                "validator {} is not registered",
                validator_id
            )))
        }
    }

    // =========================================================================
    // SIGNED BLOCKS
    // =========================================================================

    /// Record a permitted block. Re-inserting the same root is a no-op.
    pub fn insert_block(
        &mut self,
        validator_id: ValidatorId,
        slot: Slot,
        signing_root: &SigningRoot,
    ) -> Result<(), StoreError> {
        self.require_registered(validator_id)?;
        if let Some(existing) = self.find_block_at_slot(validator_id, slot)? {
            if existing.signing_root == *signing_root {
                return Ok(());
            }
            return Err(StoreError::constraint(format!(
                "validator {} already has block {} at slot {}, refusing {}",
                validator_id, existing.signing_root, slot, signing_root
            )));
        }
        self.put(block_key(validator_id, slot), signing_root.as_bytes().to_vec());
        Ok(())
    }

    pub fn find_block_at_slot(
        &self,
        validator_id: ValidatorId,
        slot: Slot,
    ) -> Result<Option<SignedBlock>, StoreError> {
        Ok(self
            .get(&block_key(validator_id, slot))?
            .map(|root| SignedBlock::new(validator_id, slot, SigningRoot::new(root))))
    }

    /// All blocks of a validator, in slot order.
    pub fn find_blocks(&self, validator_id: ValidatorId) -> Result<Vec<SignedBlock>, StoreError> {
        self.scan(&KeyPrefix::SignedBlock.validator_scope(validator_id))?
            .into_iter()
            .map(|(key, root)| -> Result<_, StoreError> {
                let slot = decode_index(&key, "block")?;
                Ok(SignedBlock::new(validator_id, slot, SigningRoot::new(root)))
            })
            .collect()
    }

    pub fn find_max_slot(&self, validator_id: ValidatorId) -> Result<Option<Slot>, StoreError> {
        self.scan(&KeyPrefix::SignedBlock.validator_scope(validator_id))?
            .last()
            .map(|(key, _)| decode_index(key, "block"))
            .transpose()
    }

    /// Delete blocks with `slot < below`. Returns the number deleted.
    pub fn delete_blocks_below_slot(
        &mut self,
        validator_id: ValidatorId,
        below: Slot,
    ) -> Result<u64, StoreError> {
        let mut deleted = 0;
        for (key, _) in self.scan(&KeyPrefix::SignedBlock.validator_scope(validator_id))? {
            if decode_index(&key, "block")? >= below {
                break;
            }
            self.delete(key);
            deleted += 1;
        }
        Ok(deleted)
    }

    // =========================================================================
    // SIGNED ATTESTATIONS
    // =========================================================================

    /// Record a permitted attestation. Re-inserting the same root is a no-op.
    pub fn insert_attestation(
        &mut self,
        validator_id: ValidatorId,
        source_epoch: Epoch,
        target_epoch: Epoch,
        signing_root: &SigningRoot,
    ) -> Result<(), StoreError> {
        self.require_registered(validator_id)?;
        if source_epoch > target_epoch {
            return Err(StoreError::constraint(format!(
                "attestation source {} is after target {}",
                source_epoch, target_epoch
            )));
        }
        if let Some(existing) = self.find_attestation_at_target_epoch(validator_id, target_epoch)? {
            if existing.signing_root == *signing_root && existing.source_epoch == source_epoch {
                return Ok(());
            }
            return Err(StoreError::constraint(format!(
                "validator {} already has attestation {} for target {}, refusing {}",
                validator_id, existing.signing_root, target_epoch, signing_root
            )));
        }
        let value: AttestationValue = (source_epoch, signing_root.as_bytes().to_vec());
        let encoded = bincode::serialize(&value).map_err(|e| StoreError::encode("attestation", e))?;
        self.put(attestation_key(validator_id, target_epoch), encoded);
        Ok(())
    }

    pub fn find_attestation_at_target_epoch(
        &self,
        validator_id: ValidatorId,
        target_epoch: Epoch,
    ) -> Result<Option<SignedAttestation>, StoreError> {
        self.get(&attestation_key(validator_id, target_epoch))?
            .map(|bytes| decode_attestation(validator_id, target_epoch, &bytes))
            .transpose()
    }

    /// All attestations of a validator, in target-epoch order.
    pub fn find_attestations(
        &self,
        validator_id: ValidatorId,
    ) -> Result<Vec<SignedAttestation>, StoreError> {
        self.scan(&KeyPrefix::SignedAttestation.validator_scope(validator_id))?
            .into_iter()
            .map(|(key, bytes)| -> Result<_, StoreError> {
                let target_epoch = decode_index(&key, "attestation")?;
                decode_attestation(validator_id, target_epoch, &bytes)
            })
            .collect()
    }

    /// Stored attestations that strictly surround `(source, target)`.
    pub fn find_surrounding_attestations(
        &self,
        validator_id: ValidatorId,
        source_epoch: Epoch,
        target_epoch: Epoch,
    ) -> Result<Vec<SignedAttestation>, StoreError> {
        Ok(self
            .find_attestations(validator_id)?
            .into_iter()
            .filter(|a| surrounds((a.source_epoch, a.target_epoch), (source_epoch, target_epoch)))
            .collect())
    }

    /// Stored attestations strictly surrounded by `(source, target)`.
    pub fn find_surrounded_attestations(
        &self,
        validator_id: ValidatorId,
        source_epoch: Epoch,
        target_epoch: Epoch,
    ) -> Result<Vec<SignedAttestation>, StoreError> {
        Ok(self
            .find_attestations(validator_id)?
            .into_iter()
            .filter(|a| surrounds((source_epoch, target_epoch), (a.source_epoch, a.target_epoch)))
            .collect())
    }

    pub fn find_max_target_epoch(
        &self,
        validator_id: ValidatorId,
    ) -> Result<Option<Epoch>, StoreError> {
        self.scan(&KeyPrefix::SignedAttestation.validator_scope(validator_id))?
            .last()
            .map(|(key, _)| decode_index(key, "attestation"))
            .transpose()
    }

    /// Delete attestations with `target_epoch < below`. Returns the number deleted.
    pub fn delete_attestations_below_epoch(
        &mut self,
        validator_id: ValidatorId,
        below: Epoch,
    ) -> Result<u64, StoreError> {
        let mut deleted = 0;
        for (key, _) in self.scan(&KeyPrefix::SignedAttestation.validator_scope(validator_id))? {
            if decode_index(&key, "attestation")? >= below {
                break;
            }
            self.delete(key);
            deleted += 1;
        }
        Ok(deleted)
    }

    // =========================================================================
    // WATERMARKS
    // =========================================================================

    /// Both floors of a validator. `None` until either has been written.
    pub fn get_watermark(
        &self,
        validator_id: ValidatorId,
    ) -> Result<Option<SigningWatermark>, StoreError> {
        let slot = self.get_slot_floor(validator_id)?;
        let epochs = self.get_epoch_floors(validator_id)?;
        if slot.is_none() && epochs.is_none() {
            return Ok(None);
        }
        Ok(Some(SigningWatermark {
            validator_id,
            slot,
            source_epoch: epochs.map(|(source, _)| source),
            target_epoch: epochs.map(|(_, target)| target),
        }))
    }

    /// Raise-only upsert of the slot floor. Returns the stored row.
    ///
    /// Only the block floor key is written, so this never races the epoch
    /// floors held under the attestation lock.
    pub fn update_slot_watermark(
        &mut self,
        validator_id: ValidatorId,
        slot: Slot,
    ) -> Result<SigningWatermark, StoreError> {
        self.require_registered(validator_id)?;
        let existing = self.get_slot_floor(validator_id)?;
        let mut watermark = SigningWatermark::empty(validator_id);
        watermark.slot = existing;
        if watermark.raise_slot(slot) || existing.is_none() {
            let floor = watermark.slot.unwrap_or(slot);
            self.put(
                watermark_key(validator_id, DutyKind::Block),
                floor.to_be_bytes().to_vec(),
            );
        }
        self.stored_watermark(validator_id)
    }

    /// Raise-only upsert of both epoch floors. Returns the stored row.
    pub fn update_epoch_watermarks(
        &mut self,
        validator_id: ValidatorId,
        source_epoch: Epoch,
        target_epoch: Epoch,
    ) -> Result<SigningWatermark, StoreError> {
        self.require_registered(validator_id)?;
        let existing = self.get_epoch_floors(validator_id)?;
        let mut watermark = SigningWatermark::empty(validator_id);
        watermark.source_epoch = existing.map(|(source, _)| source);
        watermark.target_epoch = existing.map(|(_, target)| target);
        if watermark.raise_epochs(source_epoch, target_epoch) || existing.is_none() {
            let floors: EpochFloors = (
                watermark.source_epoch.unwrap_or(source_epoch),
                watermark.target_epoch.unwrap_or(target_epoch),
            );
            let encoded =
                bincode::serialize(&floors).map_err(|e| StoreError::encode("watermark", e))?;
            self.put(watermark_key(validator_id, DutyKind::Attestation), encoded);
        }
        self.stored_watermark(validator_id)
    }

    fn stored_watermark(&self, validator_id: ValidatorId) -> Result<SigningWatermark, StoreError> {
        Ok(self
            .get_watermark(validator_id)?
            .unwrap_or_else(|| SigningWatermark::empty(validator_id)))
    }

    fn get_slot_floor(&self, validator_id: ValidatorId) -> Result<Option<Slot>, StoreError> {
        self.get(&watermark_key(validator_id, DutyKind::Block))?
            .map(|bytes| decode_u64(&bytes, "slot watermark"))
            .transpose()
    }

    fn get_epoch_floors(
        &self,
        validator_id: ValidatorId,
    ) -> Result<Option<EpochFloors>, StoreError> {
        self.get(&watermark_key(validator_id, DutyKind::Attestation))?
            .map(|bytes| {
                bincode::deserialize(&bytes).map_err(|e| StoreError::decode("epoch watermark", e))
            })
            .transpose()
    }
}

fn decode_attestation(
    validator_id: ValidatorId,
    target_epoch: Epoch,
    bytes: &[u8],
) -> Result<SignedAttestation, StoreError> {
    let (source_epoch, root): AttestationValue =
        bincode::deserialize(bytes).map_err(|e| StoreError::decode("attestation", e))?;
    Ok(SignedAttestation::new(
        validator_id,
        source_epoch,
        target_epoch,
        SigningRoot::new(root),
    ))
}
