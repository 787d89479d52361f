//! # Interchange Export
//!
//! EIP-3076 style documents, from the engine over a durable store and from
//! the runtime.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use qs_01_slashing_protection::{
        FileBackedKVStore, InterchangeDocument, SlashingProtection, SlashingProtectionError,
        INTERCHANGE_FORMAT_VERSION,
    };
    use serde_json::Value;
    use signer_runtime::{SignerConfig, SignerRuntime};

    use crate::fixtures::{
        engine_over, id_of, memory_engine, pubkey, root, sign_attestations, sign_blocks,
    };

    fn export_json<P: SlashingProtection + ?Sized>(engine: &P) -> Value {
        let mut buffer = Vec::new();
        engine.export(&mut buffer).unwrap();
        serde_json::from_slice(&buffer).unwrap()
    }

    #[test]
    fn test_document_shape() {
        let engine = memory_engine(&[1]);
        engine.may_sign_block(&pubkey(1), 12, &root(0xab)).unwrap();
        engine
            .may_sign_attestation(&pubkey(1), 3, 4, &root(0xcd))
            .unwrap();

        let json = export_json(&engine);

        assert_eq!(
            json["metadata"]["interchange_format_version"],
            INTERCHANGE_FORMAT_VERSION
        );
        assert_eq!(
            json["metadata"]["genesis_validators_root"],
            format!("0x{}", "00".repeat(32))
        );

        let history = &json["data"][0];
        assert_eq!(history["pubkey"], format!("0x{}", "01".repeat(48)));
        assert_eq!(history["signed_blocks"][0]["slot"], "12");
        assert_eq!(
            history["signed_blocks"][0]["signing_root"],
            format!("0x{}", "ab".repeat(32))
        );
        assert_eq!(history["signed_attestations"][0]["source_epoch"], "3");
        assert_eq!(history["signed_attestations"][0]["target_epoch"], "4");
        assert_eq!(
            history["watermark"],
            serde_json::json!({ "slot": "0", "source_epoch": "0", "target_epoch": "0" })
        );
    }

    #[test]
    fn test_pruned_history_exports_its_watermark() {
        let engine = memory_engine(&[1]);
        sign_blocks(&engine, 1, 0..10);
        sign_attestations(&engine, 1, 0..10);
        engine.prune_for_validator(id_of(&engine, 1), 5, 1).unwrap();

        let mut buffer = Vec::new();
        engine.export(&mut buffer).unwrap();
        let document: InterchangeDocument = serde_json::from_slice(&buffer).unwrap();

        let history = &document.data[0];
        assert_eq!(history.signed_blocks.len(), 5);
        assert_eq!(history.signed_attestations.len(), 5);
        let watermark = history.watermark.as_ref().unwrap();
        assert_eq!(watermark.slot, Some(5));
        assert_eq!(watermark.target_epoch, Some(5));
    }

    #[test]
    fn test_export_from_reopened_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        {
            let engine = engine_over(Arc::new(FileBackedKVStore::open(&path).unwrap()), &[1, 2]);
            sign_blocks(&engine, 1, [7, 8]);
            sign_blocks(&engine, 2, [9]);
        }

        // A fresh instance registers nothing, yet exports every stored validator.
        let engine = engine_over(Arc::new(FileBackedKVStore::open(&path).unwrap()), &[]);
        let mut buffer = Vec::new();
        engine.export(&mut buffer).unwrap();
        let document: InterchangeDocument = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(document.data.len(), 2);
        assert_eq!(document.data[0].pubkey, pubkey(1));
        let slots: Vec<_> = document.data[0].signed_blocks.iter().map(|b| b.slot).collect();
        assert_eq!(slots, vec![7, 8]);
        assert_eq!(document.data[1].signed_blocks[0].signing_root, root(9));
    }

    #[test]
    fn test_runtime_export_uses_configured_genesis_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SignerConfig::default();
        config.storage.data_dir = dir.path().to_path_buf();
        config.validators = vec![pubkey(3).to_hex()];
        config
            .apply_env_from(|key| {
                (key == "QS_GENESIS_VALIDATORS_ROOT").then(|| format!("0x{}", "11".repeat(32)))
            })
            .unwrap();

        let runtime = SignerRuntime::open(config).unwrap();
        let engine = runtime.engine();
        engine.may_sign_block(&pubkey(3), 1, &root(1)).unwrap();

        let json = export_json(engine.as_ref());
        assert_eq!(
            json["metadata"]["genesis_validators_root"],
            format!("0x{}", "11".repeat(32))
        );
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_import_is_rejected() {
        let engine = memory_engine(&[1]);
        let mut buffer = Vec::new();
        engine.export(&mut buffer).unwrap();

        let result = engine.import(&mut buffer.as_slice());
        assert!(matches!(result, Err(SlashingProtectionError::ImportUnsupported)));
    }
}
