//! Shared test fixtures.

use std::sync::Arc;

use qs_01_slashing_protection::{
    InMemoryKVStore, KeyValueStore, SlashingProtection, SlashingProtectionConfig,
    SlashingProtectionService,
};
use shared_types::{Epoch, SigningRoot, Slot, ValidatorId, ValidatorPublicKey};

pub type MemoryEngine = SlashingProtectionService<InMemoryKVStore>;

/// A 48-byte key filled with `byte`.
pub fn pubkey(byte: u8) -> ValidatorPublicKey {
    ValidatorPublicKey::new(vec![byte; 48])
}

/// A 32-byte root filled with `byte`.
pub fn root(byte: u8) -> SigningRoot {
    SigningRoot::new(vec![byte; 32])
}

/// In-memory engine with `keys` registered.
pub fn memory_engine(keys: &[u8]) -> MemoryEngine {
    engine_over(Arc::new(InMemoryKVStore::new()), keys)
}

/// Engine over `store` with `keys` registered.
pub fn engine_over<S: KeyValueStore + ?Sized>(
    store: Arc<S>,
    keys: &[u8],
) -> SlashingProtectionService<S> {
    let engine = SlashingProtectionService::new(store, SlashingProtectionConfig::default())
        .expect("default config is valid");
    let keys: Vec<_> = keys.iter().map(|b| pubkey(*b)).collect();
    engine
        .register_validators(&keys)
        .expect("registration succeeds");
    engine
}

pub fn id_of<S: KeyValueStore + ?Sized>(
    engine: &SlashingProtectionService<S>,
    key: u8,
) -> ValidatorId {
    engine.validator_id(&pubkey(key)).expect("key is registered")
}

/// Sign blocks at `slots`, each with root `slot as u8`.
pub fn sign_blocks<S: KeyValueStore + ?Sized>(
    engine: &SlashingProtectionService<S>,
    key: u8,
    slots: impl IntoIterator<Item = Slot>,
) {
    for slot in slots {
        let decision = engine
            .may_sign_block(&pubkey(key), slot, &root(slot as u8))
            .expect("storage is healthy");
        assert!(decision.is_permitted(), "block at slot {} denied", slot);
    }
}

/// Sign attestations `(e - 1, e)` for each target in `targets` (source 0 for target 0).
pub fn sign_attestations<S: KeyValueStore + ?Sized>(
    engine: &SlashingProtectionService<S>,
    key: u8,
    targets: impl IntoIterator<Item = Epoch>,
) {
    for target in targets {
        let source = target.saturating_sub(1);
        let decision = engine
            .may_sign_attestation(&pubkey(key), source, target, &root(target as u8))
            .expect("storage is healthy");
        assert!(decision.is_permitted(), "attestation at target {} denied", target);
    }
}

/// Force floors through the ledger, for preconditions signing cannot reach.
pub fn seed_watermark<S: KeyValueStore + ?Sized>(
    engine: &SlashingProtectionService<S>,
    key: u8,
    slot: Slot,
    epoch: Epoch,
) {
    let id = id_of(engine, key);
    let mut tx = engine.ledger().begin();
    tx.update_slot_watermark(id, slot).expect("raise slot watermark");
    tx.update_epoch_watermarks(id, epoch, epoch)
        .expect("raise epoch watermarks");
    tx.commit().expect("commit watermark");
}
