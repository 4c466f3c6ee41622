//! Producer and consumer loops driving a shared buffer.
//!
//! Each worker issues a fixed number of `produce` or `consume` calls and
//! pauses between them. A worker holding a [`CancelToken`] stops as soon as
//! the token fires, whether it is blocked in the buffer or pausing, and
//! reports that instead of failing.

use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::bounded::BoundedBuffer;
use crate::cancel::CancelToken;
use crate::error::{BufferError, Result};

/// Pause a worker takes after each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    /// Go straight to the next call.
    None,
    /// Sleep for a fixed duration.
    Fixed(Duration),
    /// Sleep for a random duration in `min..max`.
    Jitter { min: Duration, max: Duration },
}

impl Default for Delay {
    /// 10..50 ms of jitter.
    fn default() -> Self {
        Delay::Jitter {
            min: Duration::from_millis(10),
            max: Duration::from_millis(50),
        }
    }
}

impl Delay {
    /// Builds a delay from milliseconds, with 0 meaning no pause.
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Delay::None
        } else {
            Delay::Fixed(Duration::from_millis(ms))
        }
    }

    fn sample(&self) -> Duration {
        match *self {
            Delay::None => Duration::ZERO,
            Delay::Fixed(d) => d,
            Delay::Jitter { min, max } if max > min => rand::thread_rng().gen_range(min..max),
            Delay::Jitter { min, .. } => min,
        }
    }
}

/// Outcome of one worker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    /// Worker name.
    pub name: String,
    /// Calls that completed.
    pub completed: usize,
    /// Whether the run ended because of cancellation.
    pub cancelled: bool,
}

impl WorkerReport {
    fn new(name: &str) -> Self {
        WorkerReport {
            name: name.to_string(),
            completed: 0,
            cancelled: false,
        }
    }
}

/// Pacing and cancellation shared by both worker kinds.
#[derive(Debug, Clone, Default)]
struct Pace {
    delay: Delay,
    cancel: Option<CancelToken>,
}

impl Pace {
    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Sleeps for one delay; false if cancelled meanwhile.
    fn pause(&self) -> bool {
        let duration = self.delay.sample();
        if duration.is_zero() {
            return !self.is_cancelled();
        }
        match &self.cancel {
            Some(token) => token.sleep(duration),
            None => {
                thread::sleep(duration);
                true
            }
        }
    }
}

/// Produces `"{name}-Data-{i}"` for `i` in `1..=target`.
///
/// To let cancellation interrupt a blocked `produce`, pass a buffer handle
/// bound to the same token (see
/// [`RingBuffer::with_cancel`](crate::RingBuffer::with_cancel)).
///
/// # Example
///
/// ```
/// use prodcon_buffer::{BoundedBuffer, Delay, FixedRingBuffer, Producer};
///
/// let buf = FixedRingBuffer::<String>::new(4);
/// let report = Producer::new(buf.clone(), "P1", 3)
///     .with_delay(Delay::None)
///     .run()
///     .unwrap();
///
/// assert_eq!(report.completed, 3);
/// assert_eq!(buf.consume().unwrap(), "P1-Data-1");
/// ```
#[derive(Debug)]
pub struct Producer<B> {
    buffer: B,
    name: String,
    target: usize,
    pace: Pace,
}

impl<B: BoundedBuffer<String>> Producer<B> {
    /// Creates a producer that pauses with the default jitter.
    pub fn new(buffer: B, name: impl Into<String>, target: usize) -> Self {
        Producer {
            buffer,
            name: name.into(),
            target,
            pace: Pace::default(),
        }
    }

    /// Sets the pause after each item.
    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.pace.delay = delay;
        self
    }

    /// Stops the run once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.pace.cancel = Some(token);
        self
    }

    /// Runs the loop to completion or cancellation.
    ///
    /// Cancellation is reported, not returned as an error.
    pub fn run(self) -> Result<WorkerReport> {
        info!(worker = %self.name, target = self.target, "producer started");
        let mut report = WorkerReport::new(&self.name);

        for seq in 1..=self.target {
            if self.pace.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let item = format!("{}-Data-{}", self.name, seq);
            match self.buffer.produce(item) {
                Ok(()) => {
                    debug!(worker = %self.name, seq, "produced");
                    report.completed += 1;
                }
                Err(BufferError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(err) => return Err(err),
            }

            if !self.pace.pause() {
                report.cancelled = true;
                break;
            }
        }

        if report.cancelled {
            warn!(worker = %self.name, completed = report.completed, "producer cancelled, stopping");
        } else {
            info!(worker = %self.name, completed = report.completed, "producer finished");
        }
        Ok(report)
    }
}

/// Consumes `target` items from a buffer.
///
/// As with [`Producer`], bind the buffer handle to the worker's token for a
/// blocked `consume` to observe cancellation.
#[derive(Debug)]
pub struct Consumer<B> {
    buffer: B,
    name: String,
    target: usize,
    pace: Pace,
}

impl<B: BoundedBuffer<String>> Consumer<B> {
    /// Creates a consumer that does not pause between items.
    pub fn new(buffer: B, name: impl Into<String>, target: usize) -> Self {
        Consumer {
            buffer,
            name: name.into(),
            target,
            pace: Pace {
                delay: Delay::None,
                cancel: None,
            },
        }
    }

    /// Sets the pause after each item.
    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.pace.delay = delay;
        self
    }

    /// Stops the run once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.pace.cancel = Some(token);
        self
    }

    /// Runs the loop, discarding the items.
    pub fn run(self) -> Result<WorkerReport> {
        self.run_with(|_| {})
    }

    /// Runs the loop, handing every consumed item to `on_item`.
    pub fn run_with<F>(self, mut on_item: F) -> Result<WorkerReport>
    where
        F: FnMut(String),
    {
        info!(worker = %self.name, target = self.target, "consumer started");
        let mut report = WorkerReport::new(&self.name);

        for _ in 0..self.target {
            if self.pace.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match self.buffer.consume() {
                Ok(item) => {
                    debug!(worker = %self.name, %item, "consumed");
                    report.completed += 1;
                    on_item(item);
                }
                Err(BufferError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(err) => return Err(err),
            }

            if !self.pace.pause() {
                report.cancelled = true;
                break;
            }
        }

        if report.cancelled {
            warn!(worker = %self.name, completed = report.completed, "consumer cancelled, stopping");
        } else {
            info!(worker = %self.name, completed = report.completed, "consumer finished");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ElasticRingBuffer, FixedRingBuffer};
    use std::time::Instant;

    #[test]
    fn test_delay_from_millis() {
        assert_eq!(Delay::from_millis(0), Delay::None);
        assert_eq!(
            Delay::from_millis(5),
            Delay::Fixed(Duration::from_millis(5))
        );
    }

    #[test]
    fn test_delay_sample_in_range() {
        let delay = Delay::default();
        for _ in 0..100 {
            let d = delay.sample();
            assert!(d >= Duration::from_millis(10));
            assert!(d < Duration::from_millis(50));
        }
    }

    #[test]
    fn test_degenerate_jitter() {
        let delay = Delay::Jitter {
            min: Duration::from_millis(3),
            max: Duration::from_millis(3),
        };
        assert_eq!(delay.sample(), Duration::from_millis(3));
    }

    #[test]
    fn test_producer_labels() {
        let buf = FixedRingBuffer::<String>::new(5);
        let report = Producer::new(buf.clone(), "P1", 3)
            .with_delay(Delay::None)
            .run()
            .unwrap();

        assert_eq!(
            report,
            WorkerReport {
                name: "P1".into(),
                completed: 3,
                cancelled: false,
            }
        );
        assert_eq!(buf.snapshot(), vec!["P1-Data-1", "P1-Data-2", "P1-Data-3"]);
    }

    #[test]
    fn test_consumer_collects_in_order() {
        let buf = ElasticRingBuffer::<String>::new(2);
        Producer::new(buf.clone(), "P", 5)
            .with_delay(Delay::None)
            .run()
            .unwrap();

        let mut items = Vec::new();
        let report = Consumer::new(buf.clone(), "C", 5)
            .run_with(|item| items.push(item))
            .unwrap();

        assert_eq!(report.completed, 5);
        assert_eq!(items, (1..=5).map(|i| format!("P-Data-{}", i)).collect::<Vec<_>>());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_blocked_consumer_cancelled() {
        let buf = FixedRingBuffer::<String>::new(2);
        let token = CancelToken::new();
        let consumer = Consumer::new(buf.with_cancel(token.clone()), "C", 3).with_cancel(token.clone());

        let handle = thread::spawn(move || consumer.run());
        thread::sleep(Duration::from_millis(50));
        token.cancel();

        let report = handle.join().unwrap().unwrap();
        assert!(report.cancelled);
        assert_eq!(report.completed, 0);
    }

    #[test]
    fn test_blocked_producer_cancelled() {
        let buf = FixedRingBuffer::<String>::new(2);
        let token = CancelToken::new();
        let producer = Producer::new(buf.with_cancel(token.clone()), "P", 5)
            .with_delay(Delay::None)
            .with_cancel(token.clone());

        let handle = thread::spawn(move || producer.run());
        thread::sleep(Duration::from_millis(50));
        token.cancel();

        let report = handle.join().unwrap().unwrap();
        assert!(report.cancelled);
        assert_eq!(report.completed, 2);
        assert_eq!(buf.size(), 2);
    }

    #[test]
    fn test_cancel_interrupts_pause() {
        let buf = ElasticRingBuffer::<String>::new(4);
        let token = CancelToken::new();
        let producer = Producer::new(buf.with_cancel(token.clone()), "P", 100)
            .with_delay(Delay::Fixed(Duration::from_secs(10)))
            .with_cancel(token.clone());

        let handle = thread::spawn(move || producer.run());
        thread::sleep(Duration::from_millis(50));
        let start = Instant::now();
        token.cancel();

        let report = handle.join().unwrap().unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(report.cancelled);
        assert_eq!(report.completed, 1);
    }

    #[test]
    fn test_cancelled_before_start() {
        let buf = FixedRingBuffer::<String>::new(2);
        let token = CancelToken::new();
        token.cancel();

        let report = Producer::new(buf.clone(), "P", 3)
            .with_cancel(token)
            .run()
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.completed, 0);
        assert!(buf.is_empty());
    }
}
