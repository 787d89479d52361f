//! # Data Directory Lock
//!
//! The per-validator locks only serialize decisions inside one process. Two
//! signer processes on the same ledger would each hold their own lock map, so
//! the runtime takes this exclusive lock on `<data_dir>/LOCK` for its whole
//! lifetime.
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on Windows).

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;
use tracing::{info, warn};

use super::security::{is_process_running, validate_lock_path, DEFAULT_LOCK_TIMEOUT};

/// Errors from data-directory locking.
#[derive(Debug, Error)]
pub enum LockError {
    /// Lock file could not be created.
    #[error("Failed to create lock file: {0}")]
    CreateFailed(#[source] io::Error),
    /// The data directory is locked by another signer.
    #[error("Data directory already in use{} ({})", .pid.map(|p| format!(" by process {}", p)).unwrap_or_default(), .path.display())]
    AlreadyLocked { pid: Option<u32>, path: PathBuf },
    /// Failed to write the PID to the lock file.
    #[error("Failed to write PID to lock file: {0}")]
    WriteFailed(#[source] io::Error),
}

/// Exclusive lock on a data directory, released on drop.
///
/// ```ignore
/// let _lock = DatabaseLock::acquire(Path::new("/var/lib/signer"))?;
/// // Lock is held until `_lock` goes out of scope
/// ```
#[derive(Debug)]
pub struct DatabaseLock {
    file: File,
    path: PathBuf,
    pid: u32,
}

impl DatabaseLock {
    const LOCK_FILE: &'static str = "LOCK";

    /// Acquire the lock, waiting up to the default timeout.
    pub fn acquire(data_dir: &Path) -> Result<Self, LockError> {
        Self::acquire_with_timeout(data_dir, DEFAULT_LOCK_TIMEOUT)
    }

    /// Acquire the lock, retrying with exponential backoff until `timeout`.
    ///
    /// A lock file left by a crashed process is not an obstacle: the OS drops
    /// the flock with its holder, and the file is simply locked again.
    pub fn acquire_with_timeout(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let deadline = Instant::now() + timeout;
        let lock_path = data_dir.join(Self::LOCK_FILE);
        let mut retry_delay = Duration::from_millis(50);

        std::fs::create_dir_all(data_dir).map_err(LockError::CreateFailed)?;

        loop {
            if lock_path.exists() && !validate_lock_path(data_dir, &lock_path) {
                return Err(LockError::CreateFailed(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "Lock path escapes data directory",
                )));
            }

            // Not truncated before the lock is held: the holder's PID must
            // stay readable.
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&lock_path)
                .map_err(LockError::CreateFailed)?;

            match file.try_lock_exclusive() {
                Ok(()) => {
                    let pid = std::process::id();
                    let mut locked_file = file;
                    locked_file.set_len(0).map_err(LockError::WriteFailed)?;
                    writeln!(locked_file, "{}", pid).map_err(LockError::WriteFailed)?;
                    locked_file.sync_all().map_err(LockError::WriteFailed)?;

                    info!("[slashing] 🔒 Acquired data directory lock {}", lock_path.display());
                    return Ok(Self {
                        file: locked_file,
                        path: lock_path,
                        pid,
                    });
                }
                Err(_) => {
                    let existing_pid = Self::read_existing_pid(&lock_path);

                    if let Some(pid) = existing_pid.filter(|pid| !is_process_running(*pid)) {
                        // flock is released when its holder dies, so the
                        // descriptor lives on in another process.
                        warn!(
                            "[slashing] Lock file names dead process {} but is still held",
                            pid
                        );
                    }

                    if Instant::now() >= deadline {
                        return Err(LockError::AlreadyLocked {
                            pid: existing_pid,
                            path: lock_path,
                        });
                    }

                    drop(file);
                    std::thread::sleep(retry_delay);
                    retry_delay = (retry_delay * 2).min(Duration::from_millis(500));
                }
            }
        }
    }

    /// PID of the process holding the lock.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for DatabaseLock {
    fn drop(&mut self) {
        // The file stays: unlinking it would let a waiter lock an orphaned
        // inode while a newcomer locks a fresh file.
        #[allow(clippy::incompatible_msrv)]
        let _ = FileExt::unlock(&self.file);
    }
}
