//! # Pruning Scenarios
//!
//! Retention arithmetic, the watermark floor it leaves behind, monotonicity
//! under repeated prunes and isolation between validators.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use qs_01_slashing_protection::{
        DenialReason, InMemoryKVStore, SigningDecision, SlashingProtection,
        SlashingProtectionConfig, SlashingProtectionError, SlashingProtectionService,
    };
    use rand::seq::SliceRandom;

    use crate::fixtures::{
        engine_over, id_of, memory_engine, pubkey, root, seed_watermark, sign_attestations,
        sign_blocks, MemoryEngine,
    };

    fn stored_slots(engine: &MemoryEngine, key: u8) -> Vec<u64> {
        let id = id_of(engine, key);
        let tx = engine.ledger().begin();
        tx.find_blocks(id).unwrap().iter().map(|b| b.slot).collect()
    }

    fn stored_targets(engine: &MemoryEngine, key: u8) -> Vec<u64> {
        let id = id_of(engine, key);
        let tx = engine.ledger().begin();
        tx.find_attestations(id)
            .unwrap()
            .iter()
            .map(|a| a.target_epoch)
            .collect()
    }

    /// Each key with blocks at 0..9 and attestations at 0..9, signed normally.
    fn populated_engine(keys: &[u8]) -> MemoryEngine {
        let engine = memory_engine(keys);
        for key in keys {
            sign_blocks(&engine, *key, 0..10);
            sign_attestations(&engine, *key, 0..10);
        }
        engine
    }

    #[test]
    fn test_keeps_last_five_slots_and_epochs() {
        let engine = populated_engine(&[1]);
        let id = id_of(&engine, 1);

        let outcome = engine.prune_for_validator(id, 5, 1).unwrap();

        assert_eq!(outcome.slot_watermark, Some(5));
        assert_eq!(outcome.epoch_watermark, Some(5));
        assert_eq!(outcome.blocks_deleted, 5);
        assert_eq!(outcome.attestations_deleted, 5);
        assert_eq!(stored_slots(&engine, 1), vec![5, 6, 7, 8, 9]);
        assert_eq!(stored_targets(&engine, 1), vec![5, 6, 7, 8, 9]);

        let watermark = engine.ledger().begin().get_watermark(id).unwrap().unwrap();
        assert_eq!(watermark.slot, Some(5));
        assert_eq!(watermark.source_epoch, Some(5));
        assert_eq!(watermark.target_epoch, Some(5));
    }

    #[test]
    fn test_pruned_range_stays_unsignable() {
        let engine = populated_engine(&[1]);
        let id = id_of(&engine, 1);
        engine.prune_for_validator(id, 5, 1).unwrap();

        // History at slot 3 is gone; the floor still refuses it.
        assert_eq!(
            engine.may_sign_block(&pubkey(1), 3, &root(99)).unwrap(),
            SigningDecision::Deny(DenialReason::BelowWatermark)
        );
        assert_eq!(
            engine.may_sign_attestation(&pubkey(1), 3, 4, &root(99)).unwrap(),
            SigningDecision::Deny(DenialReason::BelowWatermark)
        );
        assert!(engine.may_sign_block(&pubkey(1), 10, &root(10)).unwrap().is_permitted());
    }

    #[test]
    fn test_slots_to_keep_uses_slots_per_epoch() {
        let engine = populated_engine(&[1]);
        let id = id_of(&engine, 1);

        // 64 epochs / 32 slots per epoch = 2 slots kept. Attestations keep 64 epochs.
        let outcome = engine.prune_for_validator(id, 64, 32).unwrap();
        assert_eq!(stored_slots(&engine, 1), vec![8, 9]);
        assert_eq!(outcome.epoch_watermark, Some(0));
        assert_eq!(stored_targets(&engine, 1).len(), 10);
    }

    #[test]
    fn test_no_watermark_and_no_data_is_a_noop() {
        let store = Arc::new(InMemoryKVStore::new());
        let engine = engine_over(Arc::clone(&store), &[1]);
        let id = id_of(&engine, 1);
        let rows_before = store.len();

        let outcome = engine.prune_for_validator(id, 5, 1).unwrap();

        assert!(outcome.is_noop());
        assert_eq!(store.len(), rows_before);
        assert!(engine.ledger().begin().get_watermark(id).unwrap().is_none());
    }

    #[test]
    fn test_history_without_watermark_is_left_untouched() {
        let engine = memory_engine(&[1]);
        let id = id_of(&engine, 1);
        // Records inserted below the decision engine carry no floor.
        let mut tx = engine.ledger().begin();
        for slot in 0..5 {
            tx.insert_block(id, slot, &root(1)).unwrap();
            tx.insert_attestation(id, 1, 1 + slot, &root(1)).unwrap();
        }
        tx.commit().unwrap();

        assert!(engine.prune_for_validator(id, 1, 1).unwrap().is_noop());
        assert_eq!(stored_slots(&engine, 1).len(), 5);
        assert_eq!(stored_targets(&engine, 1).len(), 5);
    }

    #[test]
    fn test_scheduled_prune_of_signed_history() {
        let mut config = SlashingProtectionConfig::default();
        config.pruning.epochs_to_keep = 5;
        config.pruning.slots_per_epoch = 1;
        let engine =
            SlashingProtectionService::new(Arc::new(InMemoryKVStore::new()), config).unwrap();
        engine.register_validators(&[pubkey(1), pubkey(2)]).unwrap();
        sign_blocks(&engine, 1, 0..10);
        sign_attestations(&engine, 1, 0..10);

        let summary = engine.prune().unwrap();

        assert_eq!(summary.validators_pruned, 1);
        assert_eq!(summary.blocks_deleted, 5);
        assert_eq!(summary.attestations_deleted, 5);
        assert_eq!(stored_slots(&engine, 1), vec![5, 6, 7, 8, 9]);
        assert_eq!(stored_targets(&engine, 1), vec![5, 6, 7, 8, 9]);
        let id = id_of(&engine, 1);
        let watermark = engine.ledger().begin().get_watermark(id).unwrap().unwrap();
        assert_eq!(watermark.slot, Some(5));
        assert_eq!(watermark.target_epoch, Some(5));
    }

    #[test]
    fn test_higher_watermark_is_kept() {
        let engine = memory_engine(&[1]);
        sign_blocks(&engine, 1, 6..10);
        seed_watermark(&engine, 1, 8, 0);
        let id = id_of(&engine, 1);

        // Pruning point is 9 - 5 + 1 = 5, below the existing floor of 8.
        let outcome = engine.prune_for_validator(id, 5, 1).unwrap();

        assert_eq!(outcome.slot_watermark, Some(8));
        assert_eq!(outcome.blocks_deleted, 2);
        assert_eq!(stored_slots(&engine, 1), vec![8, 9]);
    }

    #[test]
    fn test_wider_window_after_narrow_prune_keeps_floor() {
        let engine = populated_engine(&[1]);
        let id = id_of(&engine, 1);

        let narrow = engine.prune_for_validator(id, 2, 1).unwrap();
        assert_eq!(narrow.slot_watermark, Some(8));
        assert_eq!(narrow.epoch_watermark, Some(8));

        let wide = engine.prune_for_validator(id, 5, 1).unwrap();
        assert_eq!(wide.slot_watermark, Some(8));
        assert_eq!(wide.epoch_watermark, Some(8));
        assert_eq!(wide.blocks_deleted, 0);
        assert_eq!(stored_slots(&engine, 1), vec![8, 9]);
        assert_eq!(stored_targets(&engine, 1), vec![8, 9]);

        let watermark = engine.ledger().begin().get_watermark(id).unwrap().unwrap();
        assert_eq!(watermark.slot, Some(8));
        assert_eq!(watermark.target_epoch, Some(8));
    }

    #[test]
    fn test_repeated_prunes_never_lower_watermark() {
        let engine = populated_engine(&[1]);
        let id = id_of(&engine, 1);

        let mut windows = vec![1u64, 2, 3, 5, 8, 13, 100, 10_000];
        windows.shuffle(&mut rand::thread_rng());

        let mut previous = 0;
        for epochs_to_keep in windows {
            engine.prune_for_validator(id, epochs_to_keep, 1).unwrap();
            let watermark = engine.ledger().begin().get_watermark(id).unwrap().unwrap();
            let slot = watermark.slot.unwrap();
            assert!(slot >= previous, "watermark fell from {} to {}", previous, slot);
            assert_eq!(watermark.target_epoch, Some(slot));
            previous = slot;
        }
        assert_eq!(previous, 9);
    }

    #[test]
    fn test_pruning_one_validator_leaves_others_alone() {
        let engine = populated_engine(&[1, 2]);
        let id_2 = id_of(&engine, 2);
        let before = engine.ledger().begin().get_watermark(id_2).unwrap();

        engine.prune_for_validator(id_of(&engine, 1), 1, 1).unwrap();

        assert_eq!(stored_slots(&engine, 1), vec![9]);
        assert_eq!(stored_slots(&engine, 2).len(), 10);
        assert_eq!(stored_targets(&engine, 2).len(), 10);
        assert_eq!(engine.ledger().begin().get_watermark(id_2).unwrap(), before);
    }

    #[test]
    fn test_zero_tunables_are_configuration_errors() {
        let engine = populated_engine(&[1]);
        let id = id_of(&engine, 1);

        for (epochs, slots) in [(0, 32), (10, 0)] {
            let result = engine.prune_for_validator(id, epochs, slots);
            assert!(matches!(
                result,
                Err(SlashingProtectionError::Configuration(_))
            ));
        }
        assert_eq!(stored_slots(&engine, 1).len(), 10);
    }
}
