use std::collections::VecDeque;

use crate::Millis;

/// Number of samples kept for the rate window.
pub const SAMPLE_WINDOW: usize = 50;

// Spans shorter than this would divide by a near-zero denominator.
const MIN_RATE_SPAN_MS: Millis = 1_000;
const MS_PER_MINUTE: f64 = 60_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub at_ms: Millis,
    pub count: usize,
}

/// Output consumed by the live progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Progress {
    pub total: usize,
    pub rate_per_minute: f64,
}

/// Throughput over a sliding window of cumulative result-set sizes.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    window: VecDeque<Sample>,
    capacity: usize,
    last_rate: Option<f64>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::with_capacity(SAMPLE_WINDOW)
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            last_rate: None,
        }
    }

    /// Record the cumulative count observed at `at_ms` and return the
    /// updated progress. Oldest samples are evicted once the window is full.
    pub fn sample(&mut self, at_ms: Millis, count: usize) -> Progress {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(Sample { at_ms, count });

        let rate_per_minute = match (self.window.front(), self.window.back()) {
            (Some(first), Some(last)) if last.at_ms.saturating_sub(first.at_ms) >= MIN_RATE_SPAN_MS => {
                let minutes = (last.at_ms - first.at_ms) as f64 / MS_PER_MINUTE;
                let rate = (last.count as f64 - first.count as f64) / minutes;
                self.last_rate = Some(rate);
                rate
            }
            _ => self.last_rate.unwrap_or(0.0),
        };

        Progress {
            total: count,
            rate_per_minute,
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            total: self.window.back().map_or(0, |sample| sample.count),
            rate_per_minute: self.last_rate.unwrap_or(0.0),
        }
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.window.iter()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
