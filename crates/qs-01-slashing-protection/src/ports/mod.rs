//! # Ports Layer (Hexagonal Architecture)
//!
//! - `inbound` - the signing-decision API the host calls
//! - `outbound` - the key-value store the host provides

pub mod inbound;
pub mod outbound;
