use serde::{Deserialize, Serialize};
use serde_with::{serde_as, serde_conv, skip_serializing_none, DisplayFromStr};
use shared_types::{Epoch, SigningRoot, Slot, ValidatorPublicKey};

use crate::domain::entities::{SignedAttestation, SignedBlock, SigningWatermark};

pub const INTERCHANGE_FORMAT_VERSION: &str = "5";

// The public key Display impl abbreviates; documents carry the full key.
serde_conv!(
    PublicKeyHex,
    ValidatorPublicKey,
    |key: &ValidatorPublicKey| key.to_hex(),
    |s: String| ValidatorPublicKey::from_hex(&s)
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchangeDocument {
    pub metadata: InterchangeMetadata,
    pub data: Vec<ValidatorHistory>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchangeMetadata {
    pub interchange_format_version: String,
    #[serde_as(as = "DisplayFromStr")]
    pub genesis_validators_root: SigningRoot,
}

impl InterchangeMetadata {
    pub fn new(genesis_validators_root: SigningRoot) -> Self {
        Self {
            interchange_format_version: INTERCHANGE_FORMAT_VERSION.to_string(),
            genesis_validators_root,
        }
    }
}

/// One validator's history.
#[serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorHistory {
    #[serde_as(as = "PublicKeyHex")]
    pub pubkey: ValidatorPublicKey,
    pub signed_blocks: Vec<SignedBlockRecord>,
    pub signed_attestations: Vec<SignedAttestationRecord>,
    pub watermark: Option<WatermarkRecord>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlockRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub slot: Slot,
    #[serde_as(as = "DisplayFromStr")]
    pub signing_root: SigningRoot,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAttestationRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub source_epoch: Epoch,
    #[serde_as(as = "DisplayFromStr")]
    pub target_epoch: Epoch,
    #[serde_as(as = "DisplayFromStr")]
    pub signing_root: SigningRoot,
}

#[serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkRecord {
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub slot: Option<Slot>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub source_epoch: Option<Epoch>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub target_epoch: Option<Epoch>,
}

impl From<&SignedBlock> for SignedBlockRecord {
    fn from(block: &SignedBlock) -> Self {
        Self {
            slot: block.slot,
            signing_root: block.signing_root.clone(),
        }
    }
}

impl From<&SignedAttestation> for SignedAttestationRecord {
    fn from(attestation: &SignedAttestation) -> Self {
        Self {
            source_epoch: attestation.source_epoch,
            target_epoch: attestation.target_epoch,
            signing_root: attestation.signing_root.clone(),
        }
    }
}

impl From<&SigningWatermark> for WatermarkRecord {
    fn from(watermark: &SigningWatermark) -> Self {
        Self {
            slot: watermark.slot,
            source_epoch: watermark.source_epoch,
            target_epoch: watermark.target_epoch,
        }
    }
}
