//! # Domain Layer
//!
//! Pure domain logic for slashing protection. Nothing here performs I/O.
//!
//! ## Modules
//!
//! - `entities` - SignedBlock, SignedAttestation, SigningWatermark
//! - `decision` - SigningDecision, DenialReason and the slashing rules
//! - `pruning` - Retention arithmetic and pruning configuration
//! - `config` - Engine configuration
//! - `keys` - Storage key layout
//! - `errors` - Domain error types

pub mod config;
pub mod decision;
pub mod entities;
pub mod errors;
pub mod keys;
pub mod pruning;
