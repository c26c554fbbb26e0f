//! Advisory locks on workbook sidecar files
//!
//! A workbook `model.xlsx` is locked through `model.xlsx.lock` rather than
//! the workbook itself: saves replace the workbook by rename, which would
//! leave a lock on the old inode behind. The sidecar is never deleted, so
//! every process contends on the same file.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Error, Result};
use crate::options::{SessionOptions, DEFAULT_LOCK_POLL_INTERVAL, DEFAULT_LOCK_TIMEOUT};

/// Lock flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// One holder, required for anything that writes
    Exclusive,
    /// Any number of readers, excluded by an exclusive holder
    Shared,
}

/// Acquires sidecar locks with a bounded wait
#[derive(Debug, Clone, Copy)]
pub struct LockCoordinator {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for LockCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT, DEFAULT_LOCK_POLL_INTERVAL)
    }
}

impl LockCoordinator {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            // A zero interval would spin
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn from_options(options: &SessionOptions) -> Self {
        Self::new(options.lock_timeout, options.lock_poll_interval)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sidecar path for a workbook: the file name with `.lock` appended
    ///
    /// ```
    /// use sheetwarden::LockCoordinator;
    /// use std::path::Path;
    ///
    /// assert_eq!(
    ///     LockCoordinator::lock_path(Path::new("models/q3.xlsx")),
    ///     Path::new("models/q3.xlsx.lock")
    /// );
    /// ```
    pub fn lock_path(path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Lock `path`, waiting up to the timeout while another holder has it
    ///
    /// Fails with [`Error::Lock`] once the timeout passes. Any other error
    /// opening or locking the sidecar is returned immediately.
    pub fn acquire(&self, path: &Path, mode: LockMode) -> Result<LockHandle> {
        let lock_path = Self::lock_path(path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        let started = Instant::now();
        let contended = fs2::lock_contended_error().kind();
        loop {
            let attempt = match mode {
                LockMode::Exclusive => fs2::FileExt::try_lock_exclusive(&file),
                LockMode::Shared => fs2::FileExt::try_lock_shared(&file),
            };
            match attempt {
                Ok(()) => {
                    debug!(
                        "Acquired {:?} lock on {} after {:?}",
                        mode,
                        lock_path.display(),
                        started.elapsed()
                    );
                    return Ok(LockHandle {
                        file: Some(file),
                        path: path.to_path_buf(),
                        lock_path,
                        mode,
                    });
                }
                Err(e) if e.kind() == contended || e.kind() == io::ErrorKind::WouldBlock => {
                    let waited = started.elapsed();
                    if waited >= self.timeout {
                        debug!("Gave up on lock {} after {:?}", lock_path.display(), waited);
                        return Err(Error::Lock {
                            path: lock_path,
                            waited,
                        });
                    }
                    thread::sleep(self.poll_interval.min(self.timeout - waited));
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }
}

/// A held lock, released on [`LockHandle::release`] or drop
#[derive(Debug)]
pub struct LockHandle {
    file: Option<File>,
    path: PathBuf,
    lock_path: PathBuf,
    mode: LockMode,
}

impl LockHandle {
    /// The workbook path this lock guards
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Release the lock. Later calls do nothing.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            // Closing the descriptor drops the lock even if unlock fails
            if let Err(e) = fs2::FileExt::unlock(&file) {
                debug!("Unlock of {} failed: {}", self.lock_path.display(), e);
            }
            debug!("Released lock on {}", self.lock_path.display());
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator(timeout_ms: u64) -> LockCoordinator {
        LockCoordinator::new(Duration::from_millis(timeout_ms), Duration::from_millis(10))
    }

    #[test]
    fn test_second_exclusive_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.xlsx");

        let first = coordinator(100).acquire(&path, LockMode::Exclusive).unwrap();
        let started = Instant::now();
        let err = coordinator(150)
            .acquire(&path, LockMode::Exclusive)
            .unwrap_err();

        assert!(matches!(err, Error::Lock { .. }));
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert!(first.is_held());
    }

    #[test]
    fn test_release_is_idempotent_and_frees_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.xlsx");
        let locks = coordinator(100);

        let mut first = locks.acquire(&path, LockMode::Exclusive).unwrap();
        first.release();
        first.release();
        assert!(!first.is_held());

        let second = locks.acquire(&path, LockMode::Exclusive).unwrap();
        assert_eq!(second.path(), path.as_path());
    }

    #[test]
    fn test_drop_releases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.xlsx");
        let locks = coordinator(100);

        drop(locks.acquire(&path, LockMode::Exclusive).unwrap());
        locks.acquire(&path, LockMode::Exclusive).unwrap();
    }

    #[test]
    fn test_shared_locks_coexist_but_block_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.xlsx");
        let locks = coordinator(60);

        let _a = locks.acquire(&path, LockMode::Shared).unwrap();
        let _b = locks.acquire(&path, LockMode::Shared).unwrap();
        let err = locks.acquire(&path, LockMode::Exclusive).unwrap_err();
        assert!(matches!(err, Error::Lock { .. }));
    }

    #[test]
    fn test_sidecar_survives_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.xlsx");

        let mut handle = coordinator(50).acquire(&path, LockMode::Exclusive).unwrap();
        handle.release();
        assert!(LockCoordinator::lock_path(&path).exists());
        assert!(!path.exists());
    }
}
