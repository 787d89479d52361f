//! # Signing Flows
//!
//! Block and attestation rules through the public `SlashingProtection` port.

#[cfg(test)]
mod tests {
    use qs_01_slashing_protection::{
        DenialReason, SigningDecision, SlashingProtection, SlashingProtectionError,
    };

    use crate::fixtures::{memory_engine, pubkey, root, seed_watermark, sign_blocks};

    // =========================================================================
    // BLOCKS
    // =========================================================================

    #[test]
    fn test_double_block_proposal_is_denied() {
        let engine = memory_engine(&[1]);
        let key = pubkey(1);

        assert!(engine.may_sign_block(&key, 10, &root(1)).unwrap().is_permitted());
        assert_eq!(
            engine.may_sign_block(&key, 10, &root(2)).unwrap(),
            SigningDecision::Deny(DenialReason::DoubleBlockProposal)
        );
        // Re-signing the same block is idempotent.
        assert!(engine.may_sign_block(&key, 10, &root(1)).unwrap().is_permitted());
        let id = engine.validator_id(&key).unwrap();
        assert_eq!(engine.ledger().begin().find_blocks(id).unwrap().len(), 1);
    }

    #[test]
    fn test_blocks_below_watermark_are_denied_regardless_of_history() {
        let engine = memory_engine(&[1]);
        sign_blocks(&engine, 1, [20]);
        seed_watermark(&engine, 1, 15, 0);

        // Slot 14 has no history, but sits below the floor.
        assert_eq!(
            engine.may_sign_block(&pubkey(1), 14, &root(9)).unwrap(),
            SigningDecision::Deny(DenialReason::BelowWatermark)
        );
        assert!(engine.may_sign_block(&pubkey(1), 15, &root(9)).unwrap().is_permitted());
    }

    #[test]
    fn test_validators_do_not_share_history() {
        let engine = memory_engine(&[1, 2]);
        sign_blocks(&engine, 1, [5]);
        assert!(engine.may_sign_block(&pubkey(2), 5, &root(42)).unwrap().is_permitted());
    }

    // =========================================================================
    // ATTESTATIONS
    // =========================================================================

    #[test]
    fn test_double_vote_and_surround_scenario() {
        let engine = memory_engine(&[1]);
        let key = pubkey(1);

        assert!(engine
            .may_sign_attestation(&key, 5, 6, &root(1))
            .unwrap()
            .is_permitted());

        let double = engine.may_sign_attestation(&key, 5, 6, &root(2)).unwrap();
        assert_eq!(double, SigningDecision::Deny(DenialReason::DoubleVote));

        let surrounding = engine.may_sign_attestation(&key, 4, 7, &root(3)).unwrap();
        assert_eq!(
            surrounding,
            SigningDecision::Deny(DenialReason::SurroundingVote)
        );

        assert!(engine
            .may_sign_attestation(&key, 5, 6, &root(1))
            .unwrap()
            .is_permitted());
    }

    #[test]
    fn test_surrounded_vote_is_denied() {
        let engine = memory_engine(&[1]);
        let key = pubkey(1);

        assert!(engine
            .may_sign_attestation(&key, 2, 9, &root(1))
            .unwrap()
            .is_permitted());
        assert_eq!(
            engine.may_sign_attestation(&key, 3, 8, &root(2)).unwrap(),
            SigningDecision::Deny(DenialReason::SurroundedVote)
        );
    }

    #[test]
    fn test_overlapping_but_not_nested_votes_are_permitted() {
        let engine = memory_engine(&[1]);
        let key = pubkey(1);

        assert!(engine.may_sign_attestation(&key, 2, 5, &root(1)).unwrap().is_permitted());
        // Shares a source, so neither strictly surrounds the other.
        assert!(engine.may_sign_attestation(&key, 2, 7, &root(2)).unwrap().is_permitted());
        assert!(engine.may_sign_attestation(&key, 4, 8, &root(3)).unwrap().is_permitted());
    }

    #[test]
    fn test_source_after_target_is_a_denial_not_an_error() {
        let engine = memory_engine(&[1]);
        assert_eq!(
            engine.may_sign_attestation(&pubkey(1), 7, 6, &root(1)).unwrap(),
            SigningDecision::Deny(DenialReason::SourceAfterTarget)
        );
    }

    #[test]
    fn test_denied_requests_record_nothing() {
        let engine = memory_engine(&[1]);
        let key = pubkey(1);
        let id = engine.validator_id(&key).unwrap();

        engine.may_sign_attestation(&key, 5, 6, &root(1)).unwrap();
        engine.may_sign_attestation(&key, 4, 7, &root(2)).unwrap();
        engine.may_sign_attestation(&key, 9, 8, &root(3)).unwrap();

        let stored = engine.ledger().begin().find_attestations(id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].target_epoch, 6);
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    #[test]
    fn test_unregistered_key_is_an_error_not_a_permit() {
        let engine = memory_engine(&[1]);
        let result = engine.may_sign_block(&pubkey(9), 1, &root(1));
        assert!(matches!(
            result,
            Err(SlashingProtectionError::UnregisteredValidator { .. })
        ));
    }
}
