//! # Lock Security
//!
//! - **Timeout Protection**: acquisition never blocks indefinitely
//! - **Path Containment**: the lock file must resolve inside the data directory

use std::path::Path;
use std::time::Duration;

/// Default wait for the data-directory lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Whether a process with the given PID is still running.
pub fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        Path::new(&format!("/proc/{}", pid)).exists()
    }

    #[cfg(not(unix))]
    {
        // Assume alive; the lock then simply times out.
        let _ = pid;
        true
    }
}

/// Whether `lock_path` resolves to a location inside `data_dir`.
pub fn validate_lock_path(data_dir: &Path, lock_path: &Path) -> bool {
    match (lock_path.canonicalize(), data_dir.canonicalize()) {
        (Ok(lock), Ok(dir)) => lock.starts_with(dir),
        _ => false,
    }
}
