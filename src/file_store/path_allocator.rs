use crate::error::{Result, StoreError};
use crate::file_store::constants::DB_EXTENSION;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Lock-probing filename allocation.
///
/// Paths have the form `<dir>/<prefix>_<pid>-<n>.db`. `acquire` probes
/// `n = 0, 1, 2, …` and claims the first candidate whose exclusive
/// advisory `flock` succeeds, so two live writer processes sharing a
/// directory never own the same file. The lock rides on a dedicated file
/// handle kept in a process-wide table and is dropped on `release` or
/// when the allocator itself is dropped.
///
/// The table mutex also serializes probing, so two threads of one process
/// cannot claim the same candidate.
pub struct PathAllocator {
    dir: PathBuf,
    locks: Mutex<HashMap<PathBuf, File>>,
}

impl PathAllocator {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Allocates and locks the first free `<prefix>_<pid>-<n>.db` path.
    pub fn acquire(&self, prefix: &str, pid: &str) -> Result<PathBuf> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());

        let mut n = 0u32;
        loop {
            let path = self
                .dir
                .join(format!("{prefix}_{pid}-{n}.{DB_EXTENSION}"));

            if !locks.contains_key(&path) {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(&path)?;

                match try_lock_exclusive(&file) {
                    Ok(true) => {
                        debug!("claimed dict path {}", path.display());
                        locks.insert(path.clone(), file);
                        return Ok(path);
                    }
                    // Held by another live process; probe the next slot.
                    Ok(false) => {}
                    Err(source) => return Err(StoreError::Lock { path, source }),
                }
            }

            n += 1;
        }
    }

    /// Unlocks and closes the handle for `path`, if this process holds it.
    pub fn release(&self, path: &Path) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.remove(path);
    }

    /// Drops every held lock. Used when the registry reinitializes after a
    /// PID change.
    pub fn release_all(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.clear();
    }
}

/// Attempts a non-blocking exclusive `flock`. `Ok(false)` means another
/// process holds the lock; anything else failing is a real error.
#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> std::io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }

    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Ok(false)
    } else {
        Err(err)
    }
}

// Without advisory locks every candidate is considered free; single-writer
// ownership must then be arranged by the deployment.
#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> std::io::Result<bool> {
    Ok(true)
}
