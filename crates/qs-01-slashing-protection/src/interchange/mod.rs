//! # Interchange Export
//!
//! EIP-3076 interchange documents, format version 5. Export only: importing
//! is rejected with `SlashingProtectionError::ImportUnsupported`.
//!
//! Reference: <https://eips.ethereum.org/EIPS/eip-3076>

mod exporter;
mod model;

pub use exporter::InterchangeExporter;
pub use model::{
    InterchangeDocument, InterchangeMetadata, SignedAttestationRecord, SignedBlockRecord,
    ValidatorHistory, WatermarkRecord, INTERCHANGE_FORMAT_VERSION,
};
