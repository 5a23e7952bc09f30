// SPDX-License-Identifier: GPL-3.0-only
//! Single-instance guard
//!
//! A desktop autostart entry and a systemd user unit can both launch the
//! daemon. Only the instance holding the lock may watch for hotplug events,
//! otherwise every plug would trigger two overlays.
//!
//! A lock that cannot be taken at all (no runtime directory under a system
//! service manager, read-only filesystem) does not stop the daemon: it runs
//! unguarded and logs a warning.

use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use crate::error::InstanceError;

const LOCK_FILE: &str = "hotplug-alert.lock";

/// Held for the lifetime of the process; the lock drops with the file
#[derive(Debug)]
pub struct InstanceLock {
    _file: File,
}

impl InstanceLock {
    /// Take the exclusive lock in `runtime_dir`, without blocking
    pub fn acquire(runtime_dir: &Path) -> Result<Self, InstanceError> {
        let path = runtime_dir.join(LOCK_FILE);

        let file = File::create(&path).map_err(|source| InstanceError::Lock {
            path: path.clone(),
            source,
        })?;

        // flock is per open file description, so a second open in the same
        // process conflicts too
        let lock_result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };

        if lock_result != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
                return Err(InstanceError::AlreadyRunning(path));
            }
            return Err(InstanceError::Lock { path, source: err });
        }

        info!("Acquired instance lock {}", path.display());
        Ok(Self { _file: file })
    }

    /// Like `acquire`, but only another running instance is an error
    ///
    /// Returns `None` when the lock file itself is unusable.
    pub fn acquire_or_skip(runtime_dir: &Path) -> Result<Option<Self>, InstanceError> {
        match Self::acquire(runtime_dir) {
            Ok(lock) => Ok(Some(lock)),
            Err(InstanceError::Lock { path, source }) => {
                warn!(
                    "Running without instance lock, cannot lock {}: {}",
                    path.display(),
                    source
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
