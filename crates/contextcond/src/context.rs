// Cancellation signals that can interrupt a pending wait.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Select, Sender, TryRecvError};

use crate::error::{WaitError, WaitResult};

/// A single cancellation point.
///
/// The trigger is the only sender of `fired`. Cancelling drops it, which
/// disconnects every clone of `fired` at once.
#[derive(Debug)]
struct CancelNode {
    trigger: spin::Mutex<Option<Sender<()>>>,
    fired: Receiver<()>,
}

impl CancelNode {
    fn new() -> Self {
        let (trigger, fired) = channel::bounded(0);
        Self {
            trigger: spin::Mutex::new(Some(trigger)),
            fired,
        }
    }

    /// Returns `true` only for the call that actually fired the node.
    fn cancel(&self) -> bool {
        let trigger = self.trigger.lock().take();
        trigger.is_some()
    }

    fn is_cancelled(&self) -> bool {
        self.trigger.lock().is_none()
    }
}

/// `Context` carries a cancellation signal into
/// [`Cond::wait_context`](crate::Cond::wait_context).
///
/// A context fires when any [`CancelHandle`] along its chain is cancelled or
/// when its deadline passes. Children inherit everything their parent
/// observes, so cancelling a parent cancels all of its children.
///
/// Contexts are cheap to clone; clones observe the same signals.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancellers: Vec<Arc<CancelNode>>,
    deadline: Option<Instant>,
}

/// Fires the [`Context`] it was created with.
///
/// Dropping the handle does not cancel anything.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    node: Arc<CancelNode>,
}

impl CancelHandle {
    /// Cancels the associated context and every context derived from it.
    ///
    /// Cancelling more than once has no further effect.
    pub fn cancel(&self) {
        if self.node.cancel() {
            debug!("context cancelled");
        }
    }

    /// Returns `true` once [`CancelHandle::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.node.is_cancelled()
    }
}

// --- constructors

impl Context {
    /// Returns a context that never fires.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a context that fires when the returned handle is cancelled or
    /// when `parent` fires.
    #[must_use]
    pub fn with_cancel(parent: &Context) -> (Context, CancelHandle) {
        let node = Arc::new(CancelNode::new());
        let mut child = parent.clone();
        child.cancellers.push(Arc::clone(&node));
        (child, CancelHandle { node })
    }

    /// Derives a cancellable context that also fires at `deadline`.
    ///
    /// The child never outlives its parent's deadline: the earlier of the
    /// two wins.
    #[must_use]
    pub fn with_deadline(parent: &Context, deadline: Instant) -> (Context, CancelHandle) {
        let (mut child, handle) = Self::with_cancel(parent);
        child.deadline = Some(match parent.deadline {
            Some(inherited) => inherited.min(deadline),
            None => deadline,
        });
        (child, handle)
    }

    /// Derives a cancellable context that fires after `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(parent: &Context, timeout: Duration) -> (Context, CancelHandle) {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(parent, deadline),
            // Too far in the future to represent, so only the parent's limits apply.
            None => Self::with_cancel(parent),
        }
    }
}

// --- core implementation methods

impl Context {
    /// Returns the instant at which this context fires on its own, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why this context fired, or `None` while it is still live.
    ///
    /// Cancellation takes precedence over an expired deadline.
    #[must_use]
    pub fn err(&self) -> Option<WaitError> {
        if self.cancellers.iter().any(|node| node.is_cancelled()) {
            return Some(WaitError::Cancelled);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(WaitError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Returns `true` once the context has fired.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Blocks until `wake` yields a token, `wake` is disconnected, or this
    /// context fires, whichever is observed first.
    pub(crate) fn block_on(&self, wake: &Receiver<()>) -> WaitResult {
        if self.cancellers.is_empty() && self.deadline.is_none() {
            // A token and a closed generation are both a wakeup.
            if wake.recv().is_err() {
                debug!("woken by a closed generation");
            }
            return Ok(());
        }

        let timer = self.deadline.map(channel::at);

        let mut select = Select::new();
        let wake_index = select.recv(wake);
        for node in &self.cancellers {
            select.recv(&node.fired);
        }
        if let Some(timer) = &timer {
            select.recv(timer);
        }

        loop {
            let index = select.ready();

            if index == wake_index {
                match wake.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => return Ok(()),
                    // Another waiter took the token first.
                    Err(TryRecvError::Empty) => continue,
                }
            }

            if let Some(err) = self.err() {
                return Err(err);
            }
        }
    }
}
