//! # Adapters Layer
//!
//! - `storage` - `KeyValueStore` implementations
//! - `lock` - per-validator decision locks and the data-directory lock

pub mod lock;
pub mod storage;
