//! # Slashing Protection Service
//!
//! Facade wiring the ledger, the lock manager, the decision engine, the
//! pruner and the exporter behind the [`SlashingProtection`] port.
//!
//! ## Decision Flow
//!
//! 1. Resolve the public key to a validator id (registered on this instance)
//! 2. Take the `(validator, kind)` lock, bounded by `lock_timeout`
//! 3. Begin a transaction, re-read watermark and history, apply the rules
//! 4. Commit on `Permit`; drop (roll back) on `Deny` or error
//!
//! With `enabled = false` every request is permitted and nothing is read or
//! recorded. Registration, pruning and export keep working.

mod engine;
mod pruner;

pub use engine::{decide_attestation, decide_block};
pub use pruner::Pruner;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

use parking_lot::RwLock;
use shared_types::{DutyKind, Epoch, SigningRoot, Slot, ValidatorId, ValidatorPublicKey};
use tracing::{debug, info, warn};

use crate::adapters::lock::ValidatorLockManager;
use crate::domain::config::SlashingProtectionConfig;
use crate::domain::decision::SigningDecision;
use crate::domain::errors::{SlashingProtectionError, SlashingProtectionResult};
use crate::domain::pruning::{PruneOutcome, PruneSummary};
use crate::interchange::InterchangeExporter;
use crate::ledger::LedgerStore;
use crate::metrics;
use crate::ports::inbound::SlashingProtection;
use crate::ports::outbound::KeyValueStore;

/// The slashing protection engine over a key-value backend.
pub struct SlashingProtectionService<S: KeyValueStore + ?Sized> {
    ledger: LedgerStore<S>,
    locks: ValidatorLockManager,
    config: SlashingProtectionConfig,
    /// Keys registered through this instance. Not a cache of ledger state:
    /// decisions always re-read the ledger.
    registered: RwLock<HashMap<ValidatorPublicKey, ValidatorId>>,
}

impl<S: KeyValueStore + ?Sized> SlashingProtectionService<S> {
    /// Create the service. Fails fast on invalid configuration.
    pub fn new(store: Arc<S>, config: SlashingProtectionConfig) -> SlashingProtectionResult<Self> {
        config.validate()?;
        Ok(Self {
            ledger: LedgerStore::new(store),
            locks: ValidatorLockManager::new(config.lock_timeout),
            config,
            registered: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &SlashingProtectionConfig {
        &self.config
    }

    /// The underlying ledger, for operator tooling.
    pub fn ledger(&self) -> &LedgerStore<S> {
        &self.ledger
    }

    pub fn locks(&self) -> &ValidatorLockManager {
        &self.locks
    }

    /// Id of a key registered with this instance.
    pub fn validator_id(&self, public_key: &ValidatorPublicKey) -> Option<ValidatorId> {
        self.registered.read().get(public_key).copied()
    }

    /// Ids registered with this instance, ascending.
    pub fn registered_validators(&self) -> Vec<ValidatorId> {
        let mut ids: Vec<_> = self.registered.read().values().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn resolve(&self, public_key: &ValidatorPublicKey) -> SlashingProtectionResult<ValidatorId> {
        self.validator_id(public_key)
            .ok_or_else(|| SlashingProtectionError::UnregisteredValidator {
                public_key: public_key.to_hex(),
            })
    }

    /// Protection is disabled: permit without reading or recording history.
    fn unchecked(&self, kind: DutyKind, public_key: &ValidatorPublicKey) -> SigningDecision {
        debug!("[slashing] Unchecked {} for {}: protection disabled", kind, public_key);
        SigningDecision::Permit
    }

    fn report(
        &self,
        kind: DutyKind,
        public_key: &ValidatorPublicKey,
        detail: std::fmt::Arguments<'_>,
        decision: SigningDecision,
    ) -> SigningDecision {
        match decision {
            SigningDecision::Permit => {
                debug!("[slashing] ✓ Permitted {} for {} at {}", kind, public_key, detail);
                metrics::record_permitted(kind);
            }
            SigningDecision::Deny(reason) => {
                warn!(
                    "[slashing] ⛔ Prevented {} for {} at {}: {}",
                    kind, public_key, detail, reason
                );
                metrics::record_prevented(kind, reason);
            }
        }
        decision
    }
}

impl<S: KeyValueStore + ?Sized> SlashingProtection for SlashingProtectionService<S> {
    fn register_validators(
        &self,
        public_keys: &[ValidatorPublicKey],
    ) -> SlashingProtectionResult<()> {
        if let Some(invalid) = public_keys.iter().find(|key| !key.is_bls()) {
            return Err(SlashingProtectionError::InvalidPublicKey {
                public_key: invalid.to_hex(),
                length: invalid.as_bytes().len(),
            });
        }
        let ids = self.ledger.register_validators(public_keys)?;
        let mut registered = self.registered.write();
        for (public_key, id) in public_keys.iter().zip(ids) {
            registered.insert(public_key.clone(), id);
        }
        info!(
            "[slashing] {} validators registered with this signer",
            registered.len()
        );
        Ok(())
    }

    fn may_sign_block(
        &self,
        public_key: &ValidatorPublicKey,
        slot: Slot,
        signing_root: &SigningRoot,
    ) -> SlashingProtectionResult<SigningDecision> {
        if !self.config.enabled {
            return Ok(self.unchecked(DutyKind::Block, public_key));
        }
        let validator_id = self.resolve(public_key)?;
        let decision = self.locks.with_lock(validator_id, DutyKind::Block, || {
            let mut tx = self.ledger.begin();
            let decision = decide_block(&mut tx, validator_id, slot, signing_root)?;
            if decision.is_permitted() {
                tx.commit()?;
            }
            Ok::<_, SlashingProtectionError>(decision)
        })?;
        Ok(self.report(
            DutyKind::Block,
            public_key,
            format_args!("slot {}", slot),
            decision,
        ))
    }

    fn may_sign_attestation(
        &self,
        public_key: &ValidatorPublicKey,
        source_epoch: Epoch,
        target_epoch: Epoch,
        signing_root: &SigningRoot,
    ) -> SlashingProtectionResult<SigningDecision> {
        if !self.config.enabled {
            return Ok(self.unchecked(DutyKind::Attestation, public_key));
        }
        let validator_id = self.resolve(public_key)?;
        let decision = self.locks.with_lock(validator_id, DutyKind::Attestation, || {
            let mut tx = self.ledger.begin();
            let decision =
                decide_attestation(&mut tx, validator_id, source_epoch, target_epoch, signing_root)?;
            if decision.is_permitted() {
                tx.commit()?;
            }
            Ok::<_, SlashingProtectionError>(decision)
        })?;
        Ok(self.report(
            DutyKind::Attestation,
            public_key,
            format_args!("source {} target {}", source_epoch, target_epoch),
            decision,
        ))
    }

    fn prune(&self) -> SlashingProtectionResult<PruneSummary> {
        let pruning = &self.config.pruning;
        pruning.validate()?;

        let validators = self.registered_validators();
        let mut summary = PruneSummary::default();
        for validator_id in &validators {
            let outcome =
                self.prune_for_validator(*validator_id, pruning.epochs_to_keep, pruning.slots_per_epoch)?;
            summary.record(&outcome);
        }

        info!(
            "[slashing] 🧹 Pruned {} of {} validators ({} blocks, {} attestations deleted)",
            summary.validators_pruned,
            validators.len(),
            summary.blocks_deleted,
            summary.attestations_deleted
        );
        Ok(summary)
    }

    fn prune_for_validator(
        &self,
        validator_id: ValidatorId,
        epochs_to_keep: u64,
        slots_per_epoch: u64,
    ) -> SlashingProtectionResult<PruneOutcome> {
        Pruner::new(&self.ledger, &self.locks).prune_for_validator(
            validator_id,
            epochs_to_keep,
            slots_per_epoch,
        )
    }

    fn export(&self, output: &mut dyn Write) -> SlashingProtectionResult<()> {
        InterchangeExporter::new(&self.ledger, &self.locks, &self.config.genesis_validators_root)
            .export(output)
    }

    fn import(&self, _input: &mut dyn Read) -> SlashingProtectionResult<()> {
        warn!("[slashing] Rejected interchange import: not supported");
        Err(SlashingProtectionError::ImportUnsupported)
    }
}
