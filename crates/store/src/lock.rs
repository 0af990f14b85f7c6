use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

/// Crash-safe per-job mutual exclusion.
///
/// Acquisition is a single atomic `create_dir`: the filesystem either
/// creates the lock directory (we own it) or fails with
/// `AlreadyExists` (someone else does). There is no check-then-create
/// window. Locks do not expire; a lock left behind by a killed
/// process must be removed by an operator.
pub struct LockManager {
    dir: PathBuf,
}

impl LockManager {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn lock_path(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{job_id}.lock"))
    }

    /// Attempts to acquire the lock for a job id.
    ///
    /// Returns `None` when the lock is already held. The returned
    /// guard releases on drop, so the lock cannot outlive the
    /// invocation that acquired it on any exit path.
    pub fn acquire(self: &Arc<Self>, job_id: &str) -> io::Result<Option<LockGuard>> {
        let path = self.lock_path(job_id);
        match std::fs::create_dir(&path) {
            Ok(()) => {
                debug!(%job_id, path = %path.display(), "Lock acquired");
                Ok(Some(LockGuard {
                    manager: Arc::clone(self),
                    job_id: job_id.to_string(),
                    released: false,
                }))
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(%job_id, path = %path.display(), "Lock busy");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Removes the lock for a job id. Safe to call when the lock was
    /// never held.
    pub fn release(&self, job_id: &str) {
        let path = self.lock_path(job_id);
        match std::fs::remove_dir(&path) {
            Ok(()) => debug!(%job_id, "Lock released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(%job_id, error = %e, "Failed to remove lock directory"),
        }
    }

    /// Whether the lock directory currently exists (diagnostics only;
    /// never use this to decide whether to acquire).
    pub fn is_held(&self, job_id: &str) -> bool {
        self.lock_path(job_id).exists()
    }
}

/// Owned lock handle. Dropping it releases the lock, which covers
/// normal completion, stage failure, and task teardown during process
/// shutdown alike.
pub struct LockGuard {
    manager: Arc<LockManager>,
    job_id: String,
    released: bool,
}

impl LockGuard {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Explicit early release; drop becomes a no-op afterwards.
    pub fn release(mut self) {
        self.manager.release(&self.job_id);
        self.released = true;
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released {
            self.manager.release(&self.job_id);
        }
    }
}
