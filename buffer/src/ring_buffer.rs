//! Blocking circular buffer guarded by a single monitor.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::bounded::BoundedBuffer;
use crate::cancel::{CancelToken, Interrupt, Registration};
use crate::error::{BufferError, Result};
use crate::policy::{Elastic, Fixed, GrowthPolicy};

/// Capacity used when a buffer is created with capacity 0.
pub const DEFAULT_CAPACITY: usize = 10;

/// A ring buffer that blocks producers while full.
pub type FixedRingBuffer<T> = RingBuffer<T, Fixed>;

/// A ring buffer that doubles its capacity at 75% load.
pub type ElasticRingBuffer<T> = RingBuffer<T, Elastic>;

/// A thread-safe blocking ring buffer.
///
/// `RingBuffer<T, P>` stores elements in a circular array protected by one
/// mutex and two condition variables. `produce` blocks while the buffer is
/// full, `consume` blocks while it is empty, and every mutation wakes all
/// waiters, which then re-check their condition under the lock.
///
/// The growth policy `P` runs inside the same critical section as the
/// insertion it precedes. When it asks for a larger capacity the live
/// elements are copied, in FIFO order, to the front of a new array, so no
/// other thread ever sees a half-grown buffer.
///
/// # Semantics
///
/// - **Produce**: Rejects `None`, grows if the policy says so, blocks when full
/// - **Consume**: Blocks when empty, returns the oldest element
/// - **Cancel**: Handles bound with [`with_cancel`](Self::with_cancel) stop
///   blocking with [`BufferError::Cancelled`] once their token fires
///
/// # Example
///
/// ```
/// use prodcon_buffer::{BoundedBuffer, FixedRingBuffer};
/// use std::thread;
///
/// let buf = FixedRingBuffer::<i32>::new(4);
/// let producer_buf = buf.clone();
///
/// // Producer thread (blocks whenever four items are waiting)
/// let producer = thread::spawn(move || {
///     for i in 0..10 {
///         producer_buf.produce(i).unwrap();
///     }
/// });
///
/// let items: Vec<i32> = (0..10).map(|_| buf.consume().unwrap()).collect();
///
/// producer.join().unwrap();
/// assert_eq!(items, (0..10).collect::<Vec<_>>());
/// ```
pub struct RingBuffer<T, P = Fixed> {
    inner: Arc<RingBufferInner<T, P>>,
    cancel: Option<CancelToken>,
}

struct RingBufferInner<T, P> {
    state: Mutex<RingBufferState<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    policy: P,
}

struct RingBufferState<T> {
    slots: Vec<Option<T>>,
    head: usize,  // next slot to consume
    tail: usize,  // last slot produced into
    count: usize, // live elements
}

impl<T> RingBufferState<T> {
    fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        RingBufferState {
            slots,
            head: 0,
            tail: capacity - 1,
            count: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn push(&mut self, item: T) {
        self.tail = (self.tail + 1) % self.capacity();
        self.slots[self.tail] = Some(item);
        self.count += 1;
    }

    /// Removes the head element; `None` only when empty.
    fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        item
    }

    /// Moves the live elements to the front of a new array of `new_capacity`.
    fn relinearize(&mut self, new_capacity: usize) {
        let old_capacity = self.capacity();
        let mut slots = Vec::with_capacity(new_capacity);
        for i in 0..self.count {
            slots.push(self.slots[(self.head + i) % old_capacity].take());
        }
        slots.resize_with(new_capacity, || None);

        self.slots = slots;
        self.head = 0;
        self.tail = (self.count + new_capacity - 1) % new_capacity;
    }

    fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let capacity = self.capacity();
        (0..self.count).filter_map(move |i| self.slots[(self.head + i) % capacity].as_ref())
    }
}

impl<T: Send, P: Send + Sync> Interrupt for RingBufferInner<T, P> {
    fn interrupt(&self) {
        // Holding the lock orders this wakeup after any waiter's token check.
        let _state = self.state.lock();
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

impl<T, P> Clone for RingBuffer<T, P> {
    fn clone(&self) -> Self {
        RingBuffer {
            inner: Arc::clone(&self.inner),
            cancel: self.cancel.clone(),
        }
    }
}

impl<T, P: GrowthPolicy + Default> Default for RingBuffer<T, P> {
    fn default() -> Self {
        Self::with_policy(DEFAULT_CAPACITY, P::default())
    }
}

impl<T> RingBuffer<T, Fixed> {
    /// Creates a fixed-capacity buffer.
    ///
    /// A capacity of 0 is replaced with [`DEFAULT_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, Fixed)
    }
}

impl<T> RingBuffer<T, Elastic> {
    /// Creates an elastic buffer starting at `capacity`.
    ///
    /// A capacity of 0 is replaced with [`DEFAULT_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, Elastic::default())
    }
}

impl<T, P: GrowthPolicy> RingBuffer<T, P> {
    /// Creates a buffer with a custom growth policy.
    ///
    /// A capacity of 0 is replaced with [`DEFAULT_CAPACITY`].
    pub fn with_policy(capacity: usize, policy: P) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };

        RingBuffer {
            inner: Arc::new(RingBufferInner {
                state: Mutex::new(RingBufferState::with_capacity(capacity)),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
                policy,
            }),
            cancel: None,
        }
    }

    /// Returns a handle to the same buffer whose blocking calls honor `token`.
    ///
    /// Other handles, including `self`, are not affected by the token.
    pub fn with_cancel(&self, token: CancelToken) -> Self {
        RingBuffer {
            inner: Arc::clone(&self.inner),
            cancel: Some(token),
        }
    }

    /// Returns the token this handle is bound to, if any.
    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }

    /// Returns the growth policy.
    pub fn policy(&self) -> &P {
        &self.inner.policy
    }

    fn grow_if_needed(&self, state: &mut RingBufferState<T>) {
        let capacity = state.capacity();
        let Some(new_capacity) = self.inner.policy.grow_to(state.count, capacity) else {
            return;
        };
        if new_capacity <= capacity {
            return;
        }
        state.relinearize(new_capacity);
        debug!(
            from = capacity,
            to = new_capacity,
            size = state.count,
            "buffer resized"
        );
    }

    fn notify_all(&self) {
        self.inner.not_full.notify_all();
        self.inner.not_empty.notify_all();
    }
}

impl<T: Send + 'static, P: GrowthPolicy> RingBuffer<T, P> {
    /// Blocks on `cond` once, failing instead if the bound token has fired.
    fn wait(
        &self,
        state: &mut MutexGuard<'_, RingBufferState<T>>,
        cond: &Condvar,
        registration: &mut Option<Registration>,
    ) -> Result<()> {
        if let Some(token) = &self.cancel {
            if registration.is_none() {
                let waiter = Arc::downgrade(&self.inner) as Weak<dyn Interrupt>;
                *registration = Some(token.register(waiter));
            }
            if token.is_cancelled() {
                return Err(BufferError::Cancelled);
            }
        }
        cond.wait(state);
        Ok(())
    }
}

impl<T: Clone, P> RingBuffer<T, P> {
    /// Returns a copy of the stored elements, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        let state = self.inner.state.lock();
        state.iter().cloned().collect()
    }
}

impl<T: Send + 'static, P: GrowthPolicy> BoundedBuffer<T> for RingBuffer<T, P> {
    fn produce(&self, item: impl Into<Option<T>>) -> Result<()> {
        let Some(item) = item.into() else {
            return Err(BufferError::InvalidArgument(
                "cannot produce an absent item".into(),
            ));
        };

        let mut state = self.inner.state.lock();
        self.grow_if_needed(&mut state);

        let mut registration = None;
        while state.is_full() {
            trace!(capacity = state.capacity(), "buffer full, producer waiting");
            self.wait(&mut state, &self.inner.not_full, &mut registration)?;
        }

        state.push(item);
        self.notify_all();
        Ok(())
    }

    fn consume(&self) -> Result<T> {
        let mut state = self.inner.state.lock();

        let mut registration = None;
        loop {
            if let Some(item) = state.pop() {
                self.notify_all();
                return Ok(item);
            }
            trace!("buffer empty, consumer waiting");
            self.wait(&mut state, &self.inner.not_empty, &mut registration)?;
        }
    }

    fn is_full(&self) -> bool {
        self.inner.state.lock().is_full()
    }

    fn is_empty(&self) -> bool {
        self.inner.state.lock().is_empty()
    }

    fn size(&self) -> usize {
        self.inner.state.lock().count
    }

    fn capacity(&self) -> usize {
        self.inner.state.lock().capacity()
    }
}

impl<T, P: fmt::Debug> fmt::Debug for RingBuffer<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("RingBuffer")
            .field("size", &state.count)
            .field("capacity", &state.capacity())
            .field("policy", &self.inner.policy)
            .field("cancel", &self.cancel)
            .finish()
    }
}
