use std::time::Duration;

use parking_lot::lock_api::{RawMutex as _, RawMutexTimed};
use parking_lot::RawMutex;
use thiserror::Error;

/// Default bounded wait for lock acquisition.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Lock acquisition did not succeed within the bounded wait.
///
/// Never retried internally; surfaced directly to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("could not acquire the document lock within {timeout:?}")]
pub struct LockTimeout {
    pub timeout: Duration,
}

/// The document-scoped exclusive lock collaborator.
///
/// One lock serializes every writer of a document. Acquisition blocks up to
/// the given timeout; it is not a spin.
pub trait DocumentLock: Send + Sync {
    /// Block until the lock is held, at most `timeout`. Returns whether the
    /// lock was acquired.
    fn try_acquire(&self, timeout: Duration) -> bool;

    /// Release a previously acquired lock.
    fn release(&self);
}

/// Acquire `lock` with a bounded wait, returning an RAII guard.
pub fn acquire(lock: &dyn DocumentLock, timeout: Duration) -> Result<LockGuard<'_>, LockTimeout> {
    if lock.try_acquire(timeout) {
        Ok(LockGuard { lock })
    } else {
        Err(LockTimeout { timeout })
    }
}

/// Holds the document lock; releases it on drop.
///
/// Mutating operations keep their guard for the whole critical section, so an
/// error anywhere in the write phase still releases the lock on unwind or
/// early return.
pub struct LockGuard<'a> {
    lock: &'a dyn DocumentLock,
}

impl std::fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").finish_non_exhaustive()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// An in-process document lock.
///
/// Suitable when every writer of the grid lives in one process (tests, single
/// embedding application). Multi-process deployments supply their own
/// [`DocumentLock`] over whatever mutual exclusion the platform offers.
pub struct ProcessLock {
    raw: RawMutex,
}

impl ProcessLock {
    pub const fn new() -> Self {
        Self { raw: RawMutex::INIT }
    }
}

impl Default for ProcessLock {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLock for ProcessLock {
    fn try_acquire(&self, timeout: Duration) -> bool {
        self.raw.try_lock_for(timeout)
    }

    fn release(&self) {
        // Safety: `release` is only reached through a `LockGuard`, which is
        // only handed out after a successful `try_acquire` on this lock.
        unsafe { self.raw.unlock() }
    }
}
