//! Cooperative cancellation for blocking buffer calls.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A monitor whose blocked threads can be woken from outside.
pub(crate) trait Interrupt: Send + Sync {
    /// Wakes every thread blocked on the monitor so it re-checks its token.
    fn interrupt(&self);
}

/// A cancellation signal shared between threads.
///
/// A token starts out live and can be cancelled exactly once; it never
/// becomes live again. Buffer handles bound to a token (see
/// [`RingBuffer::with_cancel`](crate::RingBuffer::with_cancel)) fail their
/// blocking calls with [`BufferError::Cancelled`](crate::BufferError::Cancelled)
/// once it fires, and threads already blocked are woken immediately.
///
/// Child tokens form a tree: cancelling a token cancels all of its
/// descendants, while cancelling a child leaves its parent and siblings
/// untouched.
///
/// # Example
///
/// ```
/// use prodcon_buffer::CancelToken;
///
/// let root = CancelToken::new();
/// let worker = root.child_token();
///
/// worker.cancel();
/// assert!(!root.is_cancelled());
///
/// let other = root.child_token();
/// root.cancel();
/// assert!(other.is_cancelled());
/// ```
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    state: Mutex<TokenState>,
    sleepers: Condvar,
}

#[derive(Default)]
struct TokenState {
    next_id: u64,
    waiters: Vec<(u64, Weak<dyn Interrupt>)>,
    children: Vec<Weak<TokenInner>>,
}

impl CancelToken {
    /// Creates a new, live token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that is cancelled together with this one.
    ///
    /// If this token is already cancelled the child starts out cancelled.
    pub fn child_token(&self) -> CancelToken {
        let child = CancelToken::new();
        let mut state = self.inner.state.lock();
        if self.is_cancelled() {
            child.inner.cancelled.store(true, Ordering::SeqCst);
        } else {
            state.children.retain(|c| c.strong_count() > 0);
            state.children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    /// Returns true once the token (or one of its ancestors) was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Cancels the token and every descendant.
    ///
    /// Threads blocked in a bound buffer call or in [`sleep`](Self::sleep)
    /// wake up right away. Cancelling twice is a no-op.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Sleeps for `duration` unless the token is cancelled first.
    ///
    /// Returns `true` if the full duration elapsed and `false` if the sleep
    /// was cut short (or never started) because of cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut state = self.inner.state.lock();
        while !self.is_cancelled() {
            if self
                .inner
                .sleepers
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return !self.is_cancelled();
            }
        }
        false
    }

    /// Registers a monitor to be interrupted on cancellation.
    ///
    /// The registration is removed when the returned guard drops.
    pub(crate) fn register(&self, waiter: Weak<dyn Interrupt>) -> Registration {
        let mut state = self.inner.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.waiters.push((id, waiter));
        Registration {
            token: self.clone(),
            id,
        }
    }
}

impl TokenInner {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        // Collect under the token lock, wake without it: interrupt() takes
        // the buffer lock, and waiters register while holding that lock.
        let (waiters, children) = {
            let mut state = self.state.lock();
            self.sleepers.notify_all();
            let waiters: Vec<Arc<dyn Interrupt>> = state
                .waiters
                .iter()
                .filter_map(|(_, w)| w.upgrade())
                .collect();
            (waiters, std::mem::take(&mut state.children))
        };

        for waiter in waiters {
            waiter.interrupt();
        }
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Keeps a monitor registered with a token for the duration of one call.
pub(crate) struct Registration {
    token: CancelToken,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let id = self.id;
        self.token
            .inner
            .state
            .lock()
            .waiters
            .retain(|(waiter_id, _)| *waiter_id != id);
    }
}
