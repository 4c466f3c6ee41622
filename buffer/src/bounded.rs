//! The bounded buffer contract.

use crate::error::Result;

/// Operations every bounded buffer provides.
///
/// `produce` and `consume` block: a producer waits while the buffer is full,
/// a consumer waits while it is empty. Elements come out in exactly the
/// order they went in, no matter which threads move them.
///
/// The observers (`is_full`, `is_empty`, `size`, `capacity`) are snapshots
/// taken under the buffer's lock. The state may change as soon as they
/// return, so they must not be used to predict whether a following
/// `produce` or `consume` will block.
pub trait BoundedBuffer<T> {
    /// Stores an element, blocking until a slot is free.
    ///
    /// Fails with [`BufferError::InvalidArgument`](crate::BufferError::InvalidArgument)
    /// when `item` is `None`, before blocking or touching any state.
    fn produce(&self, item: impl Into<Option<T>>) -> Result<()>;

    /// Removes and returns the oldest element, blocking until one exists.
    fn consume(&self) -> Result<T>;

    /// Returns true if `size() == capacity()`.
    fn is_full(&self) -> bool;

    /// Returns true if `size() == 0`.
    fn is_empty(&self) -> bool;

    /// Returns the number of stored elements.
    fn size(&self) -> usize;

    /// Returns the current maximum number of elements.
    fn capacity(&self) -> usize;
}
