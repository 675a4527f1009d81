//! Run cancellation infrastructure
//!
//! A single [`CancellationToken`] is created per clinic run and cloned into
//! every worker at spawn time. Workers check it at each suspension point and
//! sleep through [`CancellationToken::wait_timeout`], so cancelling the token
//! wakes every timed delay at once.
//!
//! # Example
//!
//! ```rust
//! use clinic_sim::CancellationToken;
//! use std::time::Duration;
//!
//! let token = CancellationToken::new();
//! let worker_token = token.clone();
//!
//! let handle = std::thread::spawn(move || {
//!     // Returns early once the token is cancelled
//!     worker_token.wait_timeout(Duration::from_secs(30))
//! });
//!
//! token.cancel();
//! assert!(handle.join().unwrap());
//! ```

use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a run was cancelled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancellationReason {
    /// [`Clinic::shutdown`](crate::Clinic::shutdown) was called
    Shutdown,
    /// The clinic was dropped while still running
    Dropped,
    /// A worker thread could not be spawned during start
    SpawnFailed,
}

impl std::fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancellationReason::Shutdown => write!(f, "clinic shut down"),
            CancellationReason::Dropped => write!(f, "clinic dropped while running"),
            CancellationReason::SpawnFailed => write!(f, "clinic failed to start"),
        }
    }
}

type Callback = Box<dyn FnOnce() + Send>;

/// Internal state for a cancellation token
struct CancellationTokenInner {
    cancelled: AtomicBool,
    callbacks: Mutex<Vec<Callback>>,
    reason: RwLock<Option<CancellationReason>>,
    /// Sleepers park here until cancellation or their deadline
    sleep_lock: Mutex<()>,
    sleepers: Condvar,
}

/// A thread-safe cancellation token shared by every worker of a run
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationTokenInner>,
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

impl CancellationToken {
    /// Create a new cancellation token (not cancelled)
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner {
                cancelled: AtomicBool::new(false),
                callbacks: Mutex::new(Vec::new()),
                reason: RwLock::new(None),
                sleep_lock: Mutex::new(()),
                sleepers: Condvar::new(),
            }),
        }
    }

    /// Cancel this token with [`CancellationReason::Shutdown`]
    ///
    /// Idempotent: only the first call sets the reason and runs callbacks.
    pub fn cancel(&self) {
        self.cancel_with_reason(CancellationReason::Shutdown);
    }

    /// Cancel this token with a specific reason
    ///
    /// Wakes every thread parked in [`wait_timeout`](Self::wait_timeout),
    /// then runs the registered callbacks once. The first reason wins.
    pub fn cancel_with_reason(&self, reason: CancellationReason) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        *self.inner.reason.write() = Some(reason);

        {
            // Taking the lock orders this notify after any sleeper's flag check
            let _guard = self.inner.sleep_lock.lock();
            self.inner.sleepers.notify_all();
        }

        let callbacks = std::mem::take(&mut *self.inner.callbacks.lock());
        for callback in callbacks {
            callback();
        }
    }

    /// Check if this token has been cancelled
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Returns the cancellation reason (if cancelled)
    pub fn reason(&self) -> Option<CancellationReason> {
        *self.inner.reason.read()
    }

    /// Sleep for `timeout` or until the token is cancelled.
    ///
    /// Returns `true` if the wait ended because of cancellation, `false` if
    /// the full timeout elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.inner.sleep_lock.lock();
        loop {
            if self.is_cancelled() {
                return true;
            }
            match deadline {
                Some(deadline) => {
                    if self
                        .inner
                        .sleepers
                        .wait_until(&mut guard, deadline)
                        .timed_out()
                    {
                        return self.is_cancelled();
                    }
                }
                None => self.inner.sleepers.wait(&mut guard),
            }
        }
    }

    /// Registers a callback to run once when the token is cancelled.
    ///
    /// If the token is already cancelled the callback runs immediately on
    /// the calling thread.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut callbacks = self.inner.callbacks.lock();
            // Checked under the lock so a concurrent cancel drains this callback
            if !self.is_cancelled() {
                callbacks.push(Box::new(callback));
                return;
            }
        }
        callback();
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_cancellation_token_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());

        // Idempotent - can call multiple times
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancellation_token_clone() {
        let token = CancellationToken::new();
        let clone = token.clone();

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_cancel_reason_first_wins() {
        let token = CancellationToken::new();
        token.cancel_with_reason(CancellationReason::Shutdown);
        token.cancel_with_reason(CancellationReason::Dropped);

        assert_eq!(token.reason(), Some(CancellationReason::Shutdown));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(CancellationReason::Shutdown.to_string(), "clinic shut down");
        assert_eq!(
            CancellationReason::SpawnFailed.to_string(),
            "clinic failed to start"
        );
    }

    #[test]
    fn test_wait_timeout_elapses() {
        let token = CancellationToken::new();
        let start = Instant::now();

        assert!(!token.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_timeout_wakes_on_cancel() {
        let token = CancellationToken::new();
        let sleeper = token.clone();

        let handle = thread::spawn(move || {
            let start = Instant::now();
            let cancelled = sleeper.wait_timeout(Duration::from_secs(30));
            (cancelled, start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        token.cancel();

        let (cancelled, waited) = handle.join().unwrap();
        assert!(cancelled);
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn test_wait_timeout_after_cancel_returns_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(token.wait_timeout(Duration::from_secs(30)));
    }

    #[test]
    fn test_on_cancel_callback_executed_once() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        token.on_cancel(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        token.cancel();
        token.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_plain_cancel_reports_shutdown() {
        let token = CancellationToken::new();
        assert_eq!(token.reason(), None);
        token.cancel();
        assert_eq!(token.reason(), Some(CancellationReason::Shutdown));
    }

    #[test]
    fn test_on_cancel_immediate_execution_if_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = Arc::clone(&called);
        token.on_cancel(move || {
            called_clone.store(true, Ordering::SeqCst);
        });

        assert!(called.load(Ordering::SeqCst));
    }
}
