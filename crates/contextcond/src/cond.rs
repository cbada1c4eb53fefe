// Implements a condition variable whose waits can be cancelled.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam::channel::Receiver;

use crate::context::Context;
use crate::error::{WaitResult, WaitTimeoutResult};
use crate::generation::WakeState;
use crate::locker::{Locker, RawLock};

/// `Cond` lets threads sleep until a shared condition changes, with waits
/// that can also end through a [`Context`].
///
/// A `Cond` is bound to an external [`Locker`] that guards the caller's
/// condition. Every wait must be entered with that lock held; the wait
/// releases it while blocked and always holds it again on return, whether
/// the thread was woken or cancelled.
///
/// Wakeups carry no data and no ordering: [`Cond::signal`] wakes at most one
/// registered waiter, [`Cond::broadcast`] wakes every registered waiter.
/// Neither remembers a wakeup for threads that register later, so callers
/// should re-check their condition in a loop (see [`Cond::wait_while`]).
///
/// `Cond` is neither `Clone` nor `Copy`; share it by reference or `Arc`:
///
/// ```compile_fail
/// use ewe_contextcond::Cond;
///
/// let cond = Cond::with_own_lock();
/// let _copy = cond.clone();
/// ```
pub struct Cond<L = RawLock> {
    /// The caller's lock, released around every blocking wait.
    locker: L,

    /// Waiter count and current wake generation.
    ///
    /// Only held for constant-time bookkeeping, never while blocked.
    state: Mutex<WakeState>,
}

// --- constructors

impl Cond<RawLock> {
    /// Creates a `Cond` that owns a fresh, unlocked [`RawLock`].
    #[must_use]
    pub const fn with_own_lock() -> Self {
        Self::new(RawLock::new())
    }
}

impl Default for Cond<RawLock> {
    fn default() -> Self {
        Self::with_own_lock()
    }
}

impl<L> Cond<L> {
    /// Creates a `Cond` bound to `locker`.
    ///
    /// Pass `&lock` or an `Arc` to keep ownership of the lock outside the
    /// `Cond`.
    #[must_use]
    pub const fn new(locker: L) -> Self {
        Self {
            locker,
            state: Mutex::new(WakeState::new()),
        }
    }

    /// Returns the external lock this `Cond` is bound to.
    #[inline]
    #[must_use]
    pub fn locker(&self) -> &L {
        &self.locker
    }

    /// Returns how many threads are currently registered inside a wait.
    ///
    /// The value is a snapshot and may be stale as soon as it is returned.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.state().waiters()
    }

    fn state(&self) -> MutexGuard<'_, WakeState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("recovering poisoned Cond state");
            poisoned.into_inner()
        })
    }
}

// --- core implementation methods

impl<L: Locker> Cond<L> {
    /// Wakes every thread currently waiting on this `Cond`.
    ///
    /// Threads that start waiting after this call are not affected. Holding
    /// the external lock while calling is allowed but not required.
    pub fn broadcast(&self) {
        let (woken, retired) = self.state().broadcast();

        // Closing the retired generation unparks its waiters, so it happens
        // after the bookkeeping lock is released.
        drop(retired);

        if woken > 0 {
            debug!(waiters = woken, "broadcast closed wake generation");
        }
    }

    /// Wakes one thread waiting on this `Cond`, if there is any.
    ///
    /// Which waiter wakes is unspecified. While a previous signal is still
    /// unconsumed this call does nothing. Holding the external lock while
    /// calling is allowed but not required.
    pub fn signal(&self) {
        let buffered = self.state().signal();
        if buffered {
            debug!("signal buffered wake token");
        }
    }

    /// Releases the external lock, sleeps until woken by [`Cond::signal`]
    /// or [`Cond::broadcast`], then takes the lock again before returning.
    ///
    /// # Panics
    ///
    /// Panics if the external lock panics on release, which [`RawLock`]
    /// does when it is not held. The waiter is counted back out first, so
    /// a caught panic leaves the `Cond` usable.
    pub fn wait(&self) {
        let outcome = self.wait_context(&Context::background());
        debug_assert!(outcome.is_ok(), "background context fired");
    }

    /// Like [`Cond::wait`], but also returns when `ctx` fires.
    ///
    /// The external lock is held again on every return path.
    ///
    /// # Errors
    ///
    /// Returns the reason `ctx` fired if it did so before a wakeup was
    /// observed.
    pub fn wait_context(&self, ctx: &Context) -> WaitResult {
        let registration = Registration::enter(self);

        // Only release once counted in, so a signal racing with the release
        // still finds this waiter.
        self.locker.unlock();

        let outcome = ctx.block_on(&registration.wake);
        drop(registration);

        self.locker.lock();

        if let Err(err) = &outcome {
            debug!(%err, "wait ended without a wakeup");
        }
        outcome
    }

    /// Like [`Cond::wait`], but gives up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> WaitTimeoutResult {
        let (ctx, _cancel) = Context::with_timeout(&Context::background(), timeout);
        WaitTimeoutResult::new(self.wait_context(&ctx).is_err())
    }

    /// Waits for as long as `condition` returns `true`.
    ///
    /// `condition` is only ever called with the external lock held.
    pub fn wait_while<F>(&self, mut condition: F)
    where
        F: FnMut() -> bool,
    {
        while condition() {
            self.wait();
        }
    }

    /// Waits for as long as `condition` returns `true` or until `ctx` fires.
    ///
    /// # Errors
    ///
    /// Returns the reason `ctx` fired while `condition` still held.
    pub fn wait_context_while<F>(&self, ctx: &Context, mut condition: F) -> WaitResult
    where
        F: FnMut() -> bool,
    {
        while condition() {
            self.wait_context(ctx)?;
        }
        Ok(())
    }

    /// Acquires the external lock and returns a guard that releases it on
    /// drop.
    pub fn lock(&self) -> CondGuard<'_, L> {
        self.locker.lock();
        CondGuard { cond: self }
    }
}

/// One waiter's slot in the wake bookkeeping.
///
/// Counted in on creation and out on drop, so a panic between the two (an
/// external lock refusing to unlock) cannot leave a phantom waiter behind.
struct Registration<'a> {
    state: &'a Mutex<WakeState>,
    wake: Receiver<()>,
}

impl<'a> Registration<'a> {
    fn enter<L>(cond: &'a Cond<L>) -> Self {
        let wake = cond.state().register();
        Self {
            state: &cond.state,
            wake,
        }
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let drained = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unregister();
        if drained {
            debug!("last waiter drained an unconsumed wake token");
        }
    }
}

impl<L: fmt::Debug> fmt::Debug for Cond<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cond")
            .field("locker", &self.locker)
            .field("waiters", &self.waiters())
            .finish_non_exhaustive()
    }
}

/// RAII guard over the external lock of a [`Cond`].
///
/// Created by [`Cond::lock`]. Waiting through the guard keeps the
/// "held on entry, held on return" contract visible in the types.
#[must_use = "if unused the external lock will immediately unlock"]
pub struct CondGuard<'a, L: Locker> {
    cond: &'a Cond<L>,
}

impl<'a, L: Locker> CondGuard<'a, L> {
    /// Returns the `Cond` this guard belongs to.
    #[inline]
    #[must_use]
    pub fn cond(&self) -> &'a Cond<L> {
        self.cond
    }

    /// See [`Cond::wait`].
    pub fn wait(&mut self) {
        self.cond.wait();
    }

    /// See [`Cond::wait_context`].
    ///
    /// # Errors
    ///
    /// Returns the reason `ctx` fired if it did so before a wakeup.
    pub fn wait_context(&mut self, ctx: &Context) -> WaitResult {
        self.cond.wait_context(ctx)
    }

    /// See [`Cond::wait_timeout`].
    pub fn wait_timeout(&mut self, timeout: Duration) -> WaitTimeoutResult {
        self.cond.wait_timeout(timeout)
    }

    /// See [`Cond::wait_while`].
    pub fn wait_while<F>(&mut self, condition: F)
    where
        F: FnMut() -> bool,
    {
        self.cond.wait_while(condition);
    }

    /// See [`Cond::wait_context_while`].
    ///
    /// # Errors
    ///
    /// Returns the reason `ctx` fired while `condition` still held.
    pub fn wait_context_while<F>(&mut self, ctx: &Context, condition: F) -> WaitResult
    where
        F: FnMut() -> bool,
    {
        self.cond.wait_context_while(ctx, condition)
    }
}

impl<L: Locker> Drop for CondGuard<'_, L> {
    #[inline]
    fn drop(&mut self) {
        self.cond.locker.unlock();
    }
}

impl<L: Locker + fmt::Debug> fmt::Debug for CondGuard<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CondGuard")
            .field("cond", self.cond)
            .finish()
    }
}
