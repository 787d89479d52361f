//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Time**: `Slot`, `Epoch`
//! - **Identity**: `ValidatorPublicKey`, `ValidatorId`
//! - **Duties**: `SigningRoot`, `DutyKind`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::HexError;

// =============================================================================
// CLUSTER A: TIME
// =============================================================================

/// A slot number. At most one block may be proposed per validator per slot.
pub type Slot = u64;

/// An epoch number. Attestations reference a source and a target epoch.
pub type Epoch = u64;

// =============================================================================
// CLUSTER B: IDENTITY
// =============================================================================

/// Length of a compressed BLS12-381 public key.
pub const BLS_PUBLIC_KEY_LEN: usize = 48;

/// Stable integer identifier assigned to a validator at first registration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct ValidatorId(pub u64);

impl ValidatorId {
    /// Big-endian bytes, used to build ordered storage keys.
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public key bytes identifying a validator to the outside world.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValidatorPublicKey(Vec<u8>);

impl ValidatorPublicKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        parse_hex(s).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        to_prefixed_hex(&self.0)
    }

    /// Whether this is a compressed BLS public key.
    pub fn is_bls(&self) -> bool {
        self.0.len() == BLS_PUBLIC_KEY_LEN
    }
}

impl fmt::Debug for ValidatorPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorPublicKey({})", self)
    }
}

/// Abbreviated form for log lines: `0x1234abcd…`.
impl fmt::Display for ValidatorPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() <= 8 {
            write!(f, "{}", self.to_hex())
        } else {
            write!(f, "0x{}…", hex::encode(&self.0[..8]))
        }
    }
}

impl FromStr for ValidatorPublicKey {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// =============================================================================
// CLUSTER C: DUTIES
// =============================================================================

/// The signing root of a duty: the bytes the validator key would sign.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SigningRoot(Vec<u8>);

impl SigningRoot {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        parse_hex(s).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        to_prefixed_hex(&self.0)
    }
}

impl fmt::Debug for SigningRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningRoot({})", self.to_hex())
    }
}

impl fmt::Display for SigningRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for SigningRoot {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<Vec<u8>> for SigningRoot {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// The two duty kinds subject to slashing protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DutyKind {
    Block,
    Attestation,
}

impl DutyKind {
    /// Lowercase label for logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            DutyKind::Block => "block",
            DutyKind::Attestation => "attestation",
        }
    }
}

impl fmt::Display for DutyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// HEX HELPERS
// =============================================================================

/// Decode hex with an optional `0x` prefix.
pub fn parse_hex(s: &str) -> Result<Vec<u8>, HexError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(digits).map_err(|e| HexError::Invalid {
        input: s.to_string(),
        reason: e.to_string(),
    })
}

/// Encode as `0x`-prefixed lowercase hex.
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
