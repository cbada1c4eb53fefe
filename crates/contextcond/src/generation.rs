// Wake-signal state machine shared by every waiter of a `Cond`.
//
// A generation is a one-slot channel. Signal buffers at most one token into
// it, broadcast drops its only sender so that every receiver observes the
// disconnect together, then installs a fresh generation for later waiters.

use crossbeam::channel::{self, Receiver, Sender};

/// One generation of waiters.
#[derive(Debug)]
pub(crate) struct Generation {
    sender: Sender<()>,
    receiver: Receiver<()>,
}

impl Generation {
    fn new() -> Self {
        let (sender, receiver) = channel::bounded(1);
        Self { sender, receiver }
    }

    /// Buffers a wake token unless one is already pending.
    fn offer(&self) -> bool {
        self.sender.try_send(()).is_ok()
    }

    /// Takes back a pending token, if any.
    fn drain(&self) -> bool {
        self.receiver.try_recv().is_ok()
    }

    fn subscribe(&self) -> Receiver<()> {
        self.receiver.clone()
    }
}

/// Bookkeeping guarded by the internal mutex of a `Cond`.
///
/// `waiters` counts every thread between registration and unregistration,
/// including ones already woken but not yet back out.
#[derive(Debug)]
pub(crate) struct WakeState {
    waiters: usize,
    current: Option<Generation>,
}

impl WakeState {
    pub(crate) const fn new() -> Self {
        Self {
            waiters: 0,
            current: None,
        }
    }

    pub(crate) fn waiters(&self) -> usize {
        self.waiters
    }

    /// Counts a new waiter in and hands back the receiver it must block on.
    ///
    /// The first waiter ever creates the initial generation.
    pub(crate) fn register(&mut self) -> Receiver<()> {
        let generation = self.current.get_or_insert_with(Generation::new);
        self.waiters += 1;
        generation.subscribe()
    }

    /// Counts a waiter out.
    ///
    /// When the last waiter leaves, a token it did not consume is taken back
    /// so it cannot wake whoever registers next. Returns `true` if a token
    /// was drained.
    pub(crate) fn unregister(&mut self) -> bool {
        debug_assert!(self.waiters > 0, "unregister without a registered waiter");
        self.waiters -= 1;

        if self.waiters > 0 {
            return false;
        }

        self.current.as_ref().is_some_and(Generation::drain)
    }

    /// Delivers at most one pending token to the current generation.
    ///
    /// Returns `true` if a new token was buffered.
    pub(crate) fn signal(&self) -> bool {
        if self.waiters == 0 {
            return false;
        }
        self.current.as_ref().is_some_and(Generation::offer)
    }

    /// Starts a new generation and hands back the one it replaces.
    ///
    /// Returns how many waiters were counted in at the time. The retired
    /// generation holds the only sender of its channel: dropping it
    /// disconnects every receiver handed out by `register`.
    pub(crate) fn broadcast(&mut self) -> (usize, Option<Generation>) {
        if self.waiters == 0 {
            return (0, None);
        }

        let retired = self.current.replace(Generation::new());
        (self.waiters, retired)
    }

    #[cfg(test)]
    pub(crate) fn has_pending_token(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|generation| !generation.receiver.is_empty())
    }
}
