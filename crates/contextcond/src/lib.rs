//! A condition variable with cancellable waits.
//!
//! [`Cond`] offers the classic `wait`/`signal`/`broadcast` contract over an
//! external lock, plus [`Cond::wait_context`], which also returns when a
//! [`Context`] is cancelled or its deadline passes. The outcome tells the two
//! apart: `Ok(())` for a wakeup, [`WaitError`] for cancellation.
//!
//! Wakeups are delivered through a generation channel: `signal` buffers at
//! most one token into the current generation, `broadcast` closes it and
//! starts a new one. A waiter that leaves last takes back any token nobody
//! consumed, so a later waiter never wakes from an old signal.
//!
//! # Examples
//!
//! ```
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use std::thread;
//!
//! use ewe_contextcond::Cond;
//!
//! let cond = Arc::new(Cond::with_own_lock());
//! let ready = Arc::new(AtomicBool::new(false));
//!
//! let waiter = {
//!     let cond = Arc::clone(&cond);
//!     let ready = Arc::clone(&ready);
//!     thread::spawn(move || {
//!         let mut guard = cond.lock();
//!         guard.wait_while(|| !ready.load(Ordering::Relaxed));
//!     })
//! };
//!
//! let guard = cond.lock();
//! ready.store(true, Ordering::Relaxed);
//! drop(guard);
//! cond.broadcast();
//!
//! waiter.join().unwrap();
//! ```
//!
//! Waiting with a deadline:
//!
//! ```
//! use std::time::Duration;
//!
//! use ewe_contextcond::{Cond, Context, WaitError};
//!
//! let cond = Cond::with_own_lock();
//! let (ctx, _cancel) = Context::with_timeout(&Context::background(), Duration::from_millis(10));
//!
//! let mut guard = cond.lock();
//! assert_eq!(guard.wait_context(&ctx), Err(WaitError::DeadlineExceeded));
//! ```
//!
//! # Features
//!
//! - `standard` (default): warnings and errors are logged through `tracing`.
//! - `debug_trace`: additionally logs wakeups, drains and cancellations.

#[macro_use]
mod logs;

mod cond;
mod context;
mod error;
mod generation;
mod locker;

pub use cond::{Cond, CondGuard};
pub use context::{CancelHandle, Context};
pub use error::{WaitError, WaitResult, WaitTimeoutResult};
pub use locker::{Locker, RawLock};
