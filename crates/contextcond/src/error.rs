use thiserror::Error;

/// Outcome of a cancellable wait: `Ok(())` when woken by
/// [`Cond::signal`](crate::Cond::signal) or [`Cond::broadcast`](crate::Cond::broadcast),
/// otherwise the reason the [`Context`](crate::Context) fired.
pub type WaitResult = anyhow::Result<(), WaitError>;

/// Why a cancellable wait returned without being woken.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitError {
    #[error("wait was cancelled")]
    Cancelled,

    #[error("wait deadline exceeded")]
    DeadlineExceeded,
}

impl WaitError {
    /// Returns `true` if the wait ended because a deadline passed.
    #[inline]
    #[must_use]
    pub const fn is_deadline(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }
}

/// Result of a timed wait.
///
/// Returned by [`Cond::wait_timeout`](crate::Cond::wait_timeout) to tell
/// whether the wait timed out or was woken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeoutResult(bool);

impl WaitTimeoutResult {
    /// Returns `true` if the wait timed out.
    #[inline]
    #[must_use]
    pub const fn timed_out(&self) -> bool {
        self.0
    }

    #[inline]
    pub(crate) const fn new(timed_out: bool) -> Self {
        Self(timed_out)
    }
}
