//! # Signer Runtime
//!
//! Hosts the slashing protection engine as a long-running process.
//!
//! ## Modules
//!
//! - `config` - Layered configuration (defaults, JSON file, `QS_*` env, CLI)
//! - `adapters/` - Storage backend selection and the RocksDB adapter
//! - `runtime` - Process-lifetime wiring and shutdown
//! - `scheduler` - Periodic pruning

pub mod adapters;
pub mod config;
pub mod runtime;
pub mod scheduler;

pub use config::{ConfigError, SignerConfig, StorageBackend, StorageConfig};
pub use runtime::{Engine, SignerRuntime};
pub use scheduler::PruningScheduler;
