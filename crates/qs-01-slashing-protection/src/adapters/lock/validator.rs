//! # Validator Lock Manager
//!
//! One mutex per `(validator, duty kind)`. The check-and-record body of a
//! decision, and each prune sub-step, run while holding it, so the "does a
//! record exist" read and the "insert" write of one validator never race.
//!
//! Block and attestation locks of one validator, and the locks of different
//! validators, never contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use shared_types::{DutyKind, ValidatorId};
use tracing::trace;

use crate::domain::errors::StoreError;

type LockKey = (ValidatorId, DutyKind);

/// Hands out per-(validator, kind) locks with a bounded wait.
pub struct ValidatorLockManager {
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl ValidatorLockManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `body` while holding the lock for `(validator_id, kind)`.
    ///
    /// If the lock is not acquired within the timeout, `body` is not run and
    /// `StoreError::LockTimeout` is returned.
    pub fn with_lock<T, E, F>(&self, validator_id: ValidatorId, kind: DutyKind, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<StoreError>,
    {
        let slot = self.slot(validator_id, kind);
        let Some(_guard) = slot.try_lock_for(self.timeout) else {
            return Err(StoreError::LockTimeout {
                validator_id,
                kind,
                waited: self.timeout,
            }
            .into());
        };
        trace!("[slashing] Holding {} lock of validator {}", kind, validator_id);
        body()
    }

    /// Run `body` holding both locks of a validator, block first.
    ///
    /// Every caller takes the pair in the same order, so this never deadlocks
    /// against another two-lock holder.
    pub fn with_both_locks<T, E, F>(&self, validator_id: ValidatorId, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<StoreError>,
    {
        self.with_lock(validator_id, DutyKind::Block, || {
            self.with_lock(validator_id, DutyKind::Attestation, body)
        })
    }

    fn slot(&self, validator_id: ValidatorId, kind: DutyKind) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry((validator_id, kind))
            .or_default()
            .clone()
    }
}
