//! # Locking
//!
//! ## Modules
//!
//! - `validator`: per-(validator, duty kind) decision locks
//! - `flock`: process-level lock on the data directory, using fs2
//! - `security`: stale-lock detection and timeouts

#[cfg(feature = "locking")]
mod flock;
#[cfg(feature = "locking")]
mod security;
mod validator;

#[cfg(feature = "locking")]
pub use flock::{DatabaseLock, LockError};
pub use validator::ValidatorLockManager;
