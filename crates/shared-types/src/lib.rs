//! # Shared Types Crate
//!
//! Value types used on both sides of the slashing protection boundary.
//!
//! ## Design Principles
//!
//! - **Opaque bytes at the edge**: public keys and signing roots are carried as
//!   raw bytes and only rendered as `0x` hex for logs and interchange.
//! - **Integer identity inside**: every stored record refers to a validator by
//!   its compact [`ValidatorId`], never by its public key.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
