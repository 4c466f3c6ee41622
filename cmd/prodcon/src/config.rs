//! Scenario configuration.
//!
//! A scenario can be loaded from a YAML file; every field is optional:
//!
//! ```yaml
//! kind: elastic
//! capacity: 2
//! producers: 1
//! consumers: 1
//! items: 10
//! producer_delay_ms: 50
//! consumer_delay_ms: 200
//! timeout_ms: 5000
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use prodcon_buffer::{DEFAULT_CAPACITY, Delay};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which buffer a scenario runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BufferKind {
    /// Fixed capacity, producers block when full.
    #[default]
    Fixed,
    /// Capacity doubles at 75% load.
    Elastic,
}

/// A producer/consumer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub kind: BufferKind,
    /// Initial capacity; 0 selects the buffer default.
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,
    /// Items per producer.
    pub items: usize,
    /// Pause after each produce. Unset means 10..50 ms of jitter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer_delay_ms: Option<u64>,
    /// Pause after each consume. Unset means no pause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_delay_ms: Option<u64>,
    /// Cancel every worker after this long.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            kind: BufferKind::Fixed,
            capacity: DEFAULT_CAPACITY,
            producers: 1,
            consumers: 1,
            items: 10,
            producer_delay_ms: None,
            consumer_delay_ms: None,
            timeout_ms: None,
        }
    }
}

impl ScenarioConfig {
    /// Loads a scenario from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid scenario {}", path.display()))
    }

    /// Parses a scenario from YAML text.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// One fast producer against one slow consumer on a small fixed buffer.
    pub fn demo() -> Self {
        ScenarioConfig {
            kind: BufferKind::Fixed,
            capacity: 5,
            producers: 1,
            consumers: 1,
            items: 10,
            producer_delay_ms: Some(50),
            consumer_delay_ms: Some(100),
            timeout_ms: None,
        }
    }

    /// A size-3 fixed buffer with a consumer slow enough to fill it.
    pub fn fixed_demo() -> Self {
        ScenarioConfig {
            capacity: 3,
            items: 5,
            producer_delay_ms: Some(100),
            consumer_delay_ms: Some(300),
            ..Self::demo()
        }
    }

    /// A size-2 elastic buffer that has to grow to keep up.
    pub fn elastic_demo() -> Self {
        ScenarioConfig {
            kind: BufferKind::Elastic,
            capacity: 2,
            items: 10,
            producer_delay_ms: Some(50),
            consumer_delay_ms: Some(200),
            ..Self::demo()
        }
    }

    /// Total number of items all producers create.
    pub fn total_items(&self) -> usize {
        self.producers * self.items
    }

    /// Splits the total evenly over the consumers, remainder first.
    pub fn consumer_targets(&self) -> Vec<usize> {
        if self.consumers == 0 {
            return Vec::new();
        }
        let total = self.total_items();
        let base = total / self.consumers;
        let extra = total % self.consumers;
        (0..self.consumers)
            .map(|i| base + usize::from(i < extra))
            .collect()
    }

    pub fn producer_delay(&self) -> Delay {
        self.producer_delay_ms.map_or_else(Delay::default, Delay::from_millis)
    }

    pub fn consumer_delay(&self) -> Delay {
        self.consumer_delay_ms.map_or(Delay::None, Delay::from_millis)
    }

    /// Logs setups that can only end through the timeout.
    pub fn check(&self) {
        if self.timeout_ms.is_some() {
            return;
        }
        let stalls = match self.kind {
            BufferKind::Fixed => self.total_items() > self.capacity + self.consumer_targets().iter().sum::<usize>(),
            BufferKind::Elastic => false,
        };
        if stalls {
            warn!("producers will block forever without enough consumers; set timeout_ms");
        }
        if self.consumers > 0 && self.producers == 0 {
            warn!("consumers have nothing to wait for");
        }
    }
}
