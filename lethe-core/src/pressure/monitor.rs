//! Pressure classification, prediction and sample history

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Samples used for usage prediction
pub const PREDICTION_WINDOW: usize = 5;

/// Discrete memory pressure level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl PressureLevel {
    /// Classify a usage fraction; each bound is exclusive
    pub fn from_usage(usage: f64) -> Self {
        if usage > 0.9 {
            PressureLevel::Critical
        } else if usage > 0.75 {
            PressureLevel::High
        } else if usage > 0.5 {
            PressureLevel::Medium
        } else {
            PressureLevel::Low
        }
    }

    /// Whether an eviction cycle should run at this level
    pub fn requires_eviction(&self) -> bool {
        *self != PressureLevel::Low
    }
}

/// One pressure sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPressureEvent {
    /// Sample time (ms since epoch)
    pub timestamp: u64,

    /// Used fraction of capacity
    pub current_usage: f64,

    /// Extrapolated usage for the next sample (0.0-1.0)
    pub predicted_usage: f64,

    /// Classification of `current_usage`
    pub pressure_level: PressureLevel,
}

impl MemoryPressureEvent {
    /// Build an event, classifying `current_usage`
    pub fn new(timestamp: u64, current_usage: f64, predicted_usage: f64) -> Self {
        Self {
            timestamp,
            current_usage,
            predicted_usage,
            pressure_level: PressureLevel::from_usage(current_usage),
        }
    }
}

/// Records pressure samples and extrapolates usage
#[derive(Debug, Clone)]
pub struct PressureMonitor {
    history: VecDeque<MemoryPressureEvent>,
    history_limit: usize,
}

impl PressureMonitor {
    /// Create a monitor keeping at most `history_limit` samples
    pub fn new(history_limit: usize) -> Self {
        let history_limit = history_limit.max(1);
        Self {
            history: VecDeque::with_capacity(history_limit),
            history_limit,
        }
    }

    /// Linear extrapolation over the last few recorded samples
    ///
    /// `last + (last - first) / n`, clamped to `[0, 1]`; 0.0 with fewer
    /// than two samples.
    pub fn predict(&self) -> f64 {
        let n = self.history.len().min(PREDICTION_WINDOW);
        if n < 2 {
            return 0.0;
        }

        let window: Vec<&MemoryPressureEvent> =
            self.history.iter().skip(self.history.len() - n).collect();
        let first = window[0].current_usage;
        let last = window[n - 1].current_usage;
        let avg_delta = (last - first) / n as f64;

        (last + avg_delta).clamp(0.0, 1.0)
    }

    /// Classify `usage`, predict from prior samples, and record the event
    pub fn sample(&mut self, usage: f64, now: u64) -> MemoryPressureEvent {
        let event = MemoryPressureEvent::new(now, usage, self.predict());
        self.record(event.clone());
        event
    }

    fn record(&mut self, event: MemoryPressureEvent) {
        while self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(event);
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&MemoryPressureEvent> {
        self.history.back()
    }

    /// Recorded samples, oldest first
    pub fn history(&self) -> Vec<MemoryPressureEvent> {
        self.history.iter().cloned().collect()
    }

    /// Number of recorded samples
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether no samples are recorded
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
