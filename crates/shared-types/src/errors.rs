//! # Error Types
//!
//! Errors shared by every crate that parses external input.

use thiserror::Error;

/// Hex decoding failures for public keys and signing roots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("Invalid hex string {input:?}: {reason}")]
    Invalid { input: String, reason: String },
}
