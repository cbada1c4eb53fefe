// The external lock contract a `Cond` releases and re-acquires around a wait.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// A lock that can be acquired and released without a guard.
///
/// This is the lock guarding the caller's condition. A [`Cond`](crate::Cond)
/// never takes it on its own: it releases it while blocked inside a wait and
/// takes it back before returning.
pub trait Locker {
    /// Blocks until the lock is acquired.
    fn lock(&self);

    /// Releases the lock.
    ///
    /// Calling this without holding the lock is a programming error and
    /// implementations are free to panic.
    fn unlock(&self);
}

impl<L: Locker + ?Sized> Locker for &L {
    #[inline]
    fn lock(&self) {
        (**self).lock();
    }

    #[inline]
    fn unlock(&self) {
        (**self).unlock();
    }
}

impl<L: Locker + ?Sized> Locker for Arc<L> {
    #[inline]
    fn lock(&self) {
        (**self).lock();
    }

    #[inline]
    fn unlock(&self) {
        (**self).unlock();
    }
}

impl<L: Locker + ?Sized> Locker for Box<L> {
    #[inline]
    fn lock(&self) {
        (**self).lock();
    }

    #[inline]
    fn unlock(&self) {
        (**self).unlock();
    }
}

/// `RawLock` is a blocking, non-reentrant lock that protects no data.
///
/// Threads that find it held sleep on an internal `Condvar` instead of
/// spinning, so it is safe to hold for as long as the caller's critical
/// section needs.
pub struct RawLock {
    /// `true` while some thread holds the lock.
    locked: Mutex<bool>,

    /// Wakes one sleeping thread whenever the lock is released.
    released: Condvar,
}

impl RawLock {
    /// Creates a new unlocked `RawLock`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locked: Mutex::new(false),
            released: Condvar::new(),
        }
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// Returns `false` if the lock is already held.
    pub fn try_lock(&self) -> bool {
        let mut locked = self.state();
        if *locked {
            return false;
        }
        *locked = true;
        true
    }

    /// Returns `true` if some thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        *self.state()
    }

    fn state(&self) -> MutexGuard<'_, bool> {
        self.locked.lock().unwrap_or_else(|poisoned| {
            warn!("recovering poisoned RawLock state");
            poisoned.into_inner()
        })
    }
}

impl Locker for RawLock {
    fn lock(&self) {
        let mut locked = self.state();
        while *locked {
            locked = self
                .released
                .wait(locked)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *locked = true;
    }

    fn unlock(&self) {
        let mut locked = self.state();
        if !*locked {
            drop(locked);
            error!("unlock of unlocked RawLock");
            panic!("contextcond: unlock of unlocked RawLock");
        }
        *locked = false;
        drop(locked);

        self.released.notify_one();
    }
}

impl Default for RawLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}
