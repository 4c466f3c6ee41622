//! Runs a scenario on worker threads.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use prodcon_buffer::{
    BoundedBuffer, CancelToken, Consumer, ElasticRingBuffer, FixedRingBuffer, GrowthPolicy,
    Producer, RingBuffer, WorkerReport,
};
use tracing::{debug, info};

use crate::config::{BufferKind, ScenarioConfig};

/// What a finished run looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub kind: BufferKind,
    pub produced: usize,
    pub consumed: usize,
    pub final_size: usize,
    pub initial_capacity: usize,
    pub final_capacity: usize,
    pub cancelled: Vec<String>,
    pub elapsed: Duration,
}

/// Runs `config` to completion, or until its timeout cancels the workers.
pub fn run(config: &ScenarioConfig) -> Result<RunSummary> {
    config.check();
    match config.kind {
        BufferKind::Fixed => run_with(FixedRingBuffer::new(config.capacity), config),
        BufferKind::Elastic => run_with(ElasticRingBuffer::new(config.capacity), config),
    }
}

fn run_with<P: GrowthPolicy>(buffer: RingBuffer<String, P>, config: &ScenarioConfig) -> Result<RunSummary> {
    let root = CancelToken::new();
    let initial_capacity = buffer.capacity();
    let start = Instant::now();
    info!(
        kind = ?config.kind,
        capacity = initial_capacity,
        producers = config.producers,
        consumers = config.consumers,
        items = config.items,
        "starting run"
    );

    let mut producers = Vec::with_capacity(config.producers);
    for i in 1..=config.producers {
        let token = root.child_token();
        let producer = Producer::new(buffer.with_cancel(token.clone()), format!("P{}", i), config.items)
            .with_delay(config.producer_delay())
            .with_cancel(token);
        producers.push(spawn(format!("producer-{}", i), move || producer.run())?);
    }

    let mut consumers = Vec::with_capacity(config.consumers);
    for (i, target) in config.consumer_targets().into_iter().enumerate() {
        let token = root.child_token();
        let consumer = Consumer::new(buffer.with_cancel(token.clone()), format!("C{}", i + 1), target)
            .with_delay(config.consumer_delay())
            .with_cancel(token);
        consumers.push(spawn(format!("consumer-{}", i + 1), move || consumer.run())?);
    }

    let done = CancelToken::new();
    let watchdog = config.timeout_ms.map(|ms| {
        let done = done.clone();
        let root = root.clone();
        thread::spawn(move || {
            if done.sleep(Duration::from_millis(ms)) {
                info!(timeout_ms = ms, "timeout reached, cancelling workers");
                root.cancel();
            }
        })
    });

    let producer_reports = join_all(producers)?;
    let consumer_reports = join_all(consumers)?;

    done.cancel();
    if let Some(watchdog) = watchdog {
        watchdog.join().map_err(|_| anyhow!("watchdog thread panicked"))?;
    }

    let cancelled = producer_reports
        .iter()
        .chain(&consumer_reports)
        .filter(|r| r.cancelled)
        .map(|r| r.name.clone())
        .collect();

    let summary = RunSummary {
        kind: config.kind,
        produced: producer_reports.iter().map(|r| r.completed).sum(),
        consumed: consumer_reports.iter().map(|r| r.completed).sum(),
        final_size: buffer.size(),
        initial_capacity,
        final_capacity: buffer.capacity(),
        cancelled,
        elapsed: start.elapsed(),
    };
    debug!(?summary, "run finished");
    Ok(summary)
}

fn spawn<F>(name: String, f: F) -> Result<JoinHandle<prodcon_buffer::Result<WorkerReport>>>
where
    F: FnOnce() -> prodcon_buffer::Result<WorkerReport> + Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .with_context(|| format!("failed to spawn {}", name))
}

fn join_all(handles: Vec<JoinHandle<prodcon_buffer::Result<WorkerReport>>>) -> Result<Vec<WorkerReport>> {
    handles
        .into_iter()
        .map(|handle| -> Result<WorkerReport> {
            let report = handle
                .join()
                .map_err(|_| anyhow!("worker thread panicked"))??;
            Ok(report)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(kind: BufferKind, capacity: usize) -> ScenarioConfig {
        ScenarioConfig {
            kind,
            capacity,
            producer_delay_ms: Some(0),
            consumer_delay_ms: Some(0),
            ..ScenarioConfig::default()
        }
    }

    #[test]
    fn test_one_to_one() {
        let summary = run(&quick(BufferKind::Fixed, 5)).unwrap();
        assert_eq!(summary.produced, 10);
        assert_eq!(summary.consumed, 10);
        assert_eq!(summary.final_size, 0);
        assert_eq!(summary.final_capacity, 5);
        assert!(summary.cancelled.is_empty());
    }

    #[test]
    fn test_many_to_many() {
        let config = ScenarioConfig {
            producers: 3,
            consumers: 2,
            items: 7,
            ..quick(BufferKind::Fixed, 2)
        };
        let summary = run(&config).unwrap();
        assert_eq!(summary.produced, 21);
        assert_eq!(summary.consumed, 21);
        assert_eq!(summary.final_size, 0);
    }

    #[test]
    fn test_elastic_grows_without_consumers() {
        let config = ScenarioConfig {
            consumers: 0,
            items: 20,
            ..quick(BufferKind::Elastic, 2)
        };
        let summary = run(&config).unwrap();
        assert_eq!(summary.produced, 20);
        assert_eq!(summary.final_size, 20);
        assert_eq!(summary.initial_capacity, 2);
        assert_eq!(summary.final_capacity, 32);
    }

    #[test]
    fn test_timeout_cancels_stalled_producer() {
        let config = ScenarioConfig {
            consumers: 0,
            timeout_ms: Some(100),
            ..quick(BufferKind::Fixed, 2)
        };
        let summary = run(&config).unwrap();
        assert_eq!(summary.produced, 2);
        assert_eq!(summary.final_size, 2);
        assert_eq!(summary.cancelled, vec!["P1".to_string()]);
        assert!(summary.elapsed >= Duration::from_millis(100));
        assert!(summary.elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_unused_when_run_finishes() {
        let config = ScenarioConfig {
            timeout_ms: Some(10_000),
            ..quick(BufferKind::Fixed, 5)
        };
        let summary = run(&config).unwrap();
        assert!(summary.cancelled.is_empty());
        assert!(summary.elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_zero_capacity_uses_default() {
        let summary = run(&quick(BufferKind::Fixed, 0)).unwrap();
        assert_eq!(summary.initial_capacity, prodcon_buffer::DEFAULT_CAPACITY);
    }
}
