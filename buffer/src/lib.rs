//! Thread-safe bounded buffers for decoupling producers from consumers.
//!
//! This crate provides a blocking ring buffer behind the [`BoundedBuffer`]
//! contract, in two flavors selected by a [`GrowthPolicy`]:
//!
//! - [`FixedRingBuffer<T>`]: A fixed-size buffer that blocks producers when full
//! - [`ElasticRingBuffer<T>`]: A buffer that doubles its capacity at 75% load
//!
//! # Buffer Types
//!
//! ## FixedRingBuffer (Fixed, Blocking)
//!
//! [`FixedRingBuffer<T>`] provides backpressure: `produce` waits for a free
//! slot and `consume` waits for an element.
//!
//! ```
//! use prodcon_buffer::{BoundedBuffer, FixedRingBuffer};
//!
//! let buf = FixedRingBuffer::<&str>::new(3);
//! buf.produce("One").unwrap();
//! buf.produce("Two").unwrap();
//! buf.produce("Three").unwrap();
//! assert!(buf.is_full());  // Next produce would block
//!
//! assert_eq!(buf.consume().unwrap(), "One");
//! ```
//!
//! ## ElasticRingBuffer (Growable)
//!
//! [`ElasticRingBuffer<T>`] checks its load before every insertion and grows
//! once it reaches [`LOAD_FACTOR_THRESHOLD`]. Growth keeps FIFO order.
//!
//! ```
//! use prodcon_buffer::{BoundedBuffer, ElasticRingBuffer};
//!
//! let buf = ElasticRingBuffer::<i32>::new(4);
//! for i in 0..4 {
//!     buf.produce(i).unwrap();
//! }
//! assert_eq!(buf.capacity(), 8);
//! assert_eq!(buf.consume().unwrap(), 0);
//! ```
//!
//! # Absent Items
//!
//! `produce` takes anything convertible into `Option<T>`. Passing `None`
//! fails with [`BufferError::InvalidArgument`] without blocking.
//!
//! # Cancellation
//!
//! A handle bound to a [`CancelToken`] with
//! [`RingBuffer::with_cancel`] fails its blocking calls with
//! [`BufferError::Cancelled`] once the token fires. Cancelled calls never
//! insert or remove anything.
//!
//! ```
//! use prodcon_buffer::{BoundedBuffer, BufferError, CancelToken, FixedRingBuffer};
//! use std::thread;
//!
//! let buf = FixedRingBuffer::<i32>::new(1);
//! let token = CancelToken::new();
//! let consumer = buf.with_cancel(token.clone());
//!
//! let handle = thread::spawn(move || consumer.consume());
//! token.cancel();
//! assert_eq!(handle.join().unwrap(), Err(BufferError::Cancelled));
//! ```
//!
//! # Thread Safety
//!
//! All buffer types are `Send + Sync` and can be safely shared between threads
//! using `Clone` (which shares the underlying buffer via `Arc`).
//!
//! # Workers
//!
//! The [`worker`] module provides [`Producer`] and [`Consumer`] loops that
//! drive a buffer for a fixed number of calls with a pause between them.

mod bounded;
mod cancel;
mod error;
mod policy;
mod ring_buffer;
pub mod worker;

pub use bounded::BoundedBuffer;
pub use cancel::CancelToken;
pub use error::{BufferError, Result};
pub use policy::{EXPANSION_MULTIPLIER, Elastic, Fixed, GrowthPolicy, LOAD_FACTOR_THRESHOLD};
pub use ring_buffer::{DEFAULT_CAPACITY, ElasticRingBuffer, FixedRingBuffer, RingBuffer};
pub use worker::{Consumer, Delay, Producer, WorkerReport};
