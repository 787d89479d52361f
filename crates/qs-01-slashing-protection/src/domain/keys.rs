//! # Storage Key Layout
//!
//! All keys are prefixed to namespace record types. Integers are big-endian so
//! that a prefix scan over one validator returns records in slot or
//! target-epoch order.
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `v:` | `v:{pubkey}` | validator id (u64 BE) |
//! | `i:` | `i:{id}` | pubkey bytes |
//! | `m:` | `m:next_validator_id` | next id (u64 BE) |
//! | `b:` | `b:{id}{slot}` | signing root bytes |
//! | `a:` | `a:{id}{target}` | bincode `(source, signing root)` |
//! | `w:` | `w:{id}b` | slot floor (u64 BE) |
//! | `w:` | `w:{id}a` | bincode `(source, target)` floors |

use shared_types::{DutyKind, ValidatorId, ValidatorPublicKey};

use super::errors::StoreError;

/// Key namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Public key → validator id.
    ValidatorByPublicKey,
    /// Validator id → public key.
    PublicKeyById,
    /// Engine metadata.
    Metadata,
    /// Signed blocks, ordered by slot within a validator.
    SignedBlock,
    /// Signed attestations, ordered by target epoch within a validator.
    SignedAttestation,
    /// Low-watermarks, one key per duty kind.
    Watermark,
}

impl KeyPrefix {
    /// Get the byte prefix for this key type.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::ValidatorByPublicKey => b"v:",
            KeyPrefix::PublicKeyById => b"i:",
            KeyPrefix::Metadata => b"m:",
            KeyPrefix::SignedBlock => b"b:",
            KeyPrefix::SignedAttestation => b"a:",
            KeyPrefix::Watermark => b"w:",
        }
    }

    /// Build a full key with the given suffix.
    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(suffix);
        key
    }

    /// `{prefix}{id}` - the scan prefix for one validator's records.
    pub fn validator_scope(&self, validator_id: ValidatorId) -> Vec<u8> {
        self.key(&validator_id.to_be_bytes())
    }

    /// `{prefix}{id}{n}` for slot- or epoch-indexed records.
    pub fn indexed(&self, validator_id: ValidatorId, index: u64) -> Vec<u8> {
        let mut key = self.validator_scope(validator_id);
        key.extend_from_slice(&index.to_be_bytes());
        key
    }
}

/// Metadata key holding the next validator id to allocate.
pub const NEXT_VALIDATOR_ID_KEY: &[u8] = b"m:next_validator_id";

pub fn validator_key(public_key: &ValidatorPublicKey) -> Vec<u8> {
    KeyPrefix::ValidatorByPublicKey.key(public_key.as_bytes())
}

pub fn public_key_key(validator_id: ValidatorId) -> Vec<u8> {
    KeyPrefix::PublicKeyById.validator_scope(validator_id)
}

pub fn block_key(validator_id: ValidatorId, slot: u64) -> Vec<u8> {
    KeyPrefix::SignedBlock.indexed(validator_id, slot)
}

pub fn attestation_key(validator_id: ValidatorId, target_epoch: u64) -> Vec<u8> {
    KeyPrefix::SignedAttestation.indexed(validator_id, target_epoch)
}

/// Floors are keyed by duty kind so that writers holding different
/// validator locks never touch the same key.
pub fn watermark_key(validator_id: ValidatorId, kind: DutyKind) -> Vec<u8> {
    let mut key = KeyPrefix::Watermark.validator_scope(validator_id);
    key.push(match kind {
        DutyKind::Block => b'b',
        DutyKind::Attestation => b'a',
    });
    key
}

/// Decode a big-endian u64 stored as a value.
pub fn decode_u64(bytes: &[u8], what: &'static str) -> Result<u64, StoreError> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::decode(what, format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(array))
}

/// Decode the trailing big-endian u64 of a `{prefix}{id}{n}` key.
pub fn decode_index(key: &[u8], what: &'static str) -> Result<u64, StoreError> {
    if key.len() < 8 {
        return Err(StoreError::decode(what, "key too short"));
    }
    decode_u64(&key[key.len() - 8..], what)
}

/// Decode the validator id of an `i:{id}` key.
pub fn decode_validator_id(key: &[u8]) -> Result<ValidatorId, StoreError> {
    let prefix_len = KeyPrefix::PublicKeyById.as_bytes().len();
    if key.len() != prefix_len + 8 {
        return Err(StoreError::decode("validator", "unexpected key length"));
    }
    decode_u64(&key[prefix_len..], "validator").map(ValidatorId)
}
