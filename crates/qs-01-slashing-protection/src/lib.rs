//! # Slashing Protection Engine (qs-01)
//!
//! Decides whether a validator key may sign a block or attestation, records
//! every permitted duty durably, and prunes history behind a monotonic
//! low-watermark without weakening the decision.
//!
//! ## Architecture
//!
//! ```text
//! signing request ──→ SlashingProtectionService
//!                          │ 1. ValidatorLockManager::with_lock(id, kind)
//!                          │ 2. LedgerStore::begin()  (transaction)
//!                          │ 3. engine: watermark → history → rules
//!                          │ 4. commit on Permit, drop on Deny
//!                          ↓
//!                     Permit / Deny(reason)
//!
//! scheduler ──→ Pruner: raise watermark (tx 1) → delete below it (tx 2)
//! operator  ──→ InterchangeExporter: EIP-3076 v5 JSON document
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | No Double Block | One signing root per (validator, slot) |
//! | 2 | No Double Vote | One signing root per (validator, target epoch) |
//! | 3 | No Surround | No stored attestation interval strictly nests another |
//! | 4 | Watermark Floor | Duties below the watermark are always denied |
//! | 5 | Watermark Monotonicity | Watermarks are only ever raised |
//! | 6 | Atomic Decisions | A denial never mutates state; a permit is one commit |
//! | 7 | Serialized Decisions | One in-flight decision per (validator, duty kind) |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Records, decision rules, pruning arithmetic, errors, key layout
//! - `ports/` - Inbound API and the outbound key-value store trait
//! - `adapters/` - In-memory and file-backed stores, lock managers
//! - `ledger/` - Transactional record store over a `KeyValueStore`
//! - `service/` - Decision engine, pruner and the service facade
//! - `interchange/` - EIP-3076 export
//!
//! ## Usage
//!
//! ```ignore
//! use qs_01_slashing_protection::{InMemoryKVStore, SlashingProtection, SlashingProtectionService};
//!
//! let service = SlashingProtectionService::new(Arc::new(InMemoryKVStore::new()), config)?;
//! service.register_validators(&[pubkey.clone()])?;
//!
//! match service.may_sign_block(&pubkey, 42, &signing_root)? {
//!     SigningDecision::Permit => { /* sign */ }
//!     SigningDecision::Deny(reason) => { /* refuse, HTTP 403 */ }
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod interchange;
pub mod ledger;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::lock::ValidatorLockManager;
#[cfg(feature = "locking")]
pub use adapters::lock::{DatabaseLock, LockError};
pub use adapters::storage::{FileBackedKVStore, InMemoryKVStore};
pub use domain::config::SlashingProtectionConfig;
pub use domain::decision::{DenialReason, SigningDecision};
pub use domain::entities::{SignedAttestation, SignedBlock, SigningWatermark};
pub use domain::errors::{
    KVStoreError, SlashingProtectionError, SlashingProtectionResult, StoreError,
};
pub use domain::pruning::{PruneOutcome, PruneSummary, PruningConfig};
pub use interchange::{InterchangeDocument, InterchangeExporter, INTERCHANGE_FORMAT_VERSION};
pub use ledger::{LedgerStore, LedgerTransaction};
pub use ports::inbound::SlashingProtection;
pub use ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
pub use service::SlashingProtectionService;
