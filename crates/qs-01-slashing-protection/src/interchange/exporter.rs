use std::cell::RefCell;
use std::io::Write;

use serde::ser::{Error as _, SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};
use shared_types::{SigningRoot, ValidatorId, ValidatorPublicKey};
use tracing::info;

use super::model::{
    InterchangeMetadata, SignedAttestationRecord, SignedBlockRecord, ValidatorHistory,
    WatermarkRecord,
};
use crate::adapters::lock::ValidatorLockManager;
use crate::domain::errors::SlashingProtectionError;
use crate::ledger::LedgerStore;
use crate::ports::outbound::KeyValueStore;

/// Writes the ledger as an interchange document.
///
/// The document is streamed one validator at a time. Each validator's history
/// is read in its own transaction while holding both of its locks, so it
/// reflects a single point in that validator's timeline.
pub struct InterchangeExporter<'a, S: KeyValueStore + ?Sized> {
    ledger: &'a LedgerStore<S>,
    locks: &'a ValidatorLockManager,
    genesis_validators_root: &'a SigningRoot,
}

impl<'a, S: KeyValueStore + ?Sized> InterchangeExporter<'a, S> {
    pub fn new(
        ledger: &'a LedgerStore<S>,
        locks: &'a ValidatorLockManager,
        genesis_validators_root: &'a SigningRoot,
    ) -> Self {
        Self {
            ledger,
            locks,
            genesis_validators_root,
        }
    }

    pub fn export(&self, output: &mut dyn Write) -> Result<(), SlashingProtectionError> {
        let validators = self.ledger.begin().list_validators()?;
        let document = DocumentStream {
            exporter: self,
            validators: &validators,
            failure: RefCell::new(None),
        };

        let written = serde_json::to_writer_pretty(&mut *output, &document);
        if let Some(err) = document.failure.into_inner() {
            return Err(err);
        }
        written?;
        output.flush()?;

        info!("[slashing] Exported history of {} validators", validators.len());
        Ok(())
    }

    /// Read one validator's full history.
    pub fn load_history(
        &self,
        validator_id: ValidatorId,
        public_key: &ValidatorPublicKey,
    ) -> Result<ValidatorHistory, SlashingProtectionError> {
        self.locks.with_both_locks(validator_id, || {
            let tx = self.ledger.begin();
            let signed_blocks = tx
                .find_blocks(validator_id)?
                .iter()
                .map(SignedBlockRecord::from)
                .collect();
            let signed_attestations = tx
                .find_attestations(validator_id)?
                .iter()
                .map(SignedAttestationRecord::from)
                .collect();
            let watermark = tx.get_watermark(validator_id)?.as_ref().map(WatermarkRecord::from);

            Ok(ValidatorHistory {
                pubkey: public_key.clone(),
                signed_blocks,
                signed_attestations,
                watermark,
            })
        })
    }
}

/// Serializes the document while reading histories lazily.
///
/// A ledger failure aborts serialization; the original error is kept in
/// `failure` so the caller can return it instead of a serde message.
struct DocumentStream<'e, 'a, S: KeyValueStore + ?Sized> {
    exporter: &'e InterchangeExporter<'a, S>,
    validators: &'e [(ValidatorId, ValidatorPublicKey)],
    failure: RefCell<Option<SlashingProtectionError>>,
}

struct HistoryStream<'d, 'e, 'a, S: KeyValueStore + ?Sized>(&'d DocumentStream<'e, 'a, S>);

impl<S: KeyValueStore + ?Sized> Serialize for DocumentStream<'_, '_, S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let metadata = InterchangeMetadata::new(self.exporter.genesis_validators_root.clone());
        let mut document = serializer.serialize_struct("InterchangeDocument", 2)?;
        document.serialize_field("metadata", &metadata)?;
        document.serialize_field("data", &HistoryStream(self))?;
        document.end()
    }
}

impl<S: KeyValueStore + ?Sized> Serialize for HistoryStream<'_, '_, '_, S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let stream = self.0;
        let mut seq = serializer.serialize_seq(Some(stream.validators.len()))?;
        for (validator_id, public_key) in stream.validators {
            match stream.exporter.load_history(*validator_id, public_key) {
                Ok(history) => seq.serialize_element(&history)?,
                Err(err) => {
                    let message = err.to_string();
                    *stream.failure.borrow_mut() = Some(err);
                    return Err(Ser::Error::custom(message));
                }
            }
        }
        seq.end()
    }
}
