//! Shared helpers for the integration tests.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ewe_contextcond::{Cond, Locker};

/// How long a helper polls before declaring the scenario stuck.
pub const SETTLE_LIMIT: Duration = Duration::from_secs(5);

/// Blocks until `cond` reports exactly `expected` registered waiters.
///
/// # Panics
///
/// Panics if the count is not reached within [`SETTLE_LIMIT`].
pub fn wait_for_waiters<L: Locker>(cond: &Cond<L>, expected: usize) {
    let deadline = Instant::now() + SETTLE_LIMIT;
    while cond.waiters() != expected {
        assert!(
            Instant::now() < deadline,
            "expected {expected} waiters, found {}",
            cond.waiters()
        );
        thread::sleep(Duration::from_millis(1));
    }
}

/// Blocks until `counter` reaches `expected`.
///
/// # Panics
///
/// Panics if the value is not reached within [`SETTLE_LIMIT`].
pub fn wait_for_count(counter: &AtomicUsize, expected: usize) {
    let deadline = Instant::now() + SETTLE_LIMIT;
    while counter.load(Ordering::SeqCst) != expected {
        assert!(
            Instant::now() < deadline,
            "counter stuck at {} instead of {expected}",
            counter.load(Ordering::SeqCst)
        );
        thread::sleep(Duration::from_millis(1));
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone, Copy)]
pub struct StressConfig {
    /// Number of threads to spawn
    thread_count: usize,
    /// Number of iterations per thread
    iterations: usize,
}

impl StressConfig {
    /// Defaults to 4 threads running 1000 iterations each.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            thread_count: 4,
            iterations: 1000,
        }
    }

    #[must_use]
    pub const fn threads(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    #[must_use]
    pub const fn iterations(mut self, count: usize) -> Self {
        self.iterations = count;
        self
    }

    #[must_use]
    pub const fn get_thread_count(&self) -> usize {
        self.thread_count
    }

    #[must_use]
    pub const fn get_iterations(&self) -> usize {
        self.iterations
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Totals collected by a [`StressHarness`] run.
#[derive(Debug, Clone)]
pub struct StressResult {
    pub successes: usize,
    pub failures: usize,
    pub duration: Duration,
}

impl StressResult {
    #[must_use]
    pub const fn total_operations(&self) -> usize {
        self.successes + self.failures
    }
}

/// Spawns the configured threads and runs `operation(thread_id, iteration)`
/// for every iteration of every thread.
pub struct StressHarness {
    config: StressConfig,
}

impl StressHarness {
    #[must_use]
    pub const fn new(config: StressConfig) -> Self {
        Self { config }
    }

    /// # Panics
    ///
    /// Panics if any worker thread panics.
    pub fn run<F>(self, operation: F) -> StressResult
    where
        F: Fn(usize, usize) -> bool + Send + Sync + 'static,
    {
        let start = Instant::now();
        let operation = Arc::new(operation);

        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..self.config.get_thread_count())
            .map(|thread_id| {
                let operation = Arc::clone(&operation);
                let successes = Arc::clone(&successes);
                let failures = Arc::clone(&failures);
                let iterations = self.config.get_iterations();

                thread::spawn(move || {
                    for iteration in 0..iterations {
                        if operation(thread_id, iteration) {
                            successes.fetch_add(1, Ordering::Relaxed);
                        } else {
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Thread panicked during stress test");
        }

        StressResult {
            successes: successes.load(Ordering::Relaxed),
            failures: failures.load(Ordering::Relaxed),
            duration: start.elapsed(),
        }
    }
}
