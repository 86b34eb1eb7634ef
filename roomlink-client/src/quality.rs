//! Connection quality classification
//!
//! Every heartbeat round trip is classified with fixed thresholds:
//!
//! | latency          | level     |
//! |------------------|-----------|
//! | `< 50ms`         | Excellent |
//! | `50ms .. 150ms`  | Good      |
//! | `150ms .. 300ms` | Fair      |
//! | `>= 300ms`       | Poor      |
//!
//! The current quality is the classification of the most recent sample, not
//! an average. `LatencyWindow` keeps a bounded history for consumers that
//! want to smooth the number themselves.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Discrete connection quality, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    /// Under 50ms
    Excellent,
    /// 50ms up to 150ms
    Good,
    /// 150ms up to 300ms
    Fair,
    /// 300ms and above
    Poor,
}

impl Default for QualityLevel {
    /// Assumed until the first pong arrives
    fn default() -> Self {
        QualityLevel::Good
    }
}

/// Map a round-trip time to a quality level
pub fn classify(latency: Duration) -> QualityLevel {
    match latency.as_millis() {
        0..=49 => QualityLevel::Excellent,
        50..=149 => QualityLevel::Good,
        150..=299 => QualityLevel::Fair,
        _ => QualityLevel::Poor,
    }
}

/// Bounded ring of recent round-trip samples
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl LatencyWindow {
    /// Keep at most `capacity` samples (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a sample, evicting the oldest when full
    pub fn push(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<Duration> {
        self.samples.back().copied()
    }

    /// Quality of the most recent sample
    pub fn quality(&self) -> Option<QualityLevel> {
        self.latest().map(classify)
    }

    /// Samples oldest first
    pub fn samples(&self) -> Vec<Duration> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
