//! # Ledger Store
//!
//! Durable, transactional storage of signed blocks, signed attestations and
//! watermarks over any `KeyValueStore`.
//!
//! Every operation runs inside a caller-supplied [`LedgerTransaction`], so the
//! decision engine and the pruner compose their own atomic units of work. A
//! transaction buffers its writes and flushes them as one batch on
//! `commit()`. Dropping it uncommitted is a rollback.
//!
//! ## Constraints
//!
//! Inserts reject, as `StoreError::ConstraintViolation`:
//! - a record for an unregistered validator id
//! - a second, distinct signing root for the same slot or target epoch
//! - an attestation with `source_epoch > target_epoch`

mod transaction;

pub use transaction::LedgerTransaction;

use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::{ValidatorId, ValidatorPublicKey};
use tracing::info;

use crate::domain::errors::StoreError;
use crate::ports::outbound::KeyValueStore;

/// Entry point to the ledger: hands out transactions.
pub struct LedgerStore<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    /// Serializes id allocation between concurrent registrations.
    registration: Mutex<()>,
}

impl<S: KeyValueStore + ?Sized> LedgerStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            registration: Mutex::new(()),
        }
    }

    /// Start a transaction.
    pub fn begin(&self) -> LedgerTransaction<'_, S> {
        LedgerTransaction::new(self.store.as_ref())
    }

    /// Register public keys in one transaction. Idempotent.
    ///
    /// Returns the id of every key, in input order.
    pub fn register_validators(
        &self,
        public_keys: &[ValidatorPublicKey],
    ) -> Result<Vec<ValidatorId>, StoreError> {
        let _allocation = self.registration.lock();
        let mut tx = self.begin();
        let before = tx.next_validator_id()?;
        let ids = tx.register_validators(public_keys)?;
        let after = tx.next_validator_id()?;
        tx.commit()?;

        if after > before {
            info!(
                "[slashing] Registered {} new validators ({} keys configured)",
                after - before,
                public_keys.len()
            );
        }
        Ok(ids)
    }
}
