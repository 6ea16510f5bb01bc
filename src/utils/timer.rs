//! Timing helpers for runs and rounds

use std::time::{Duration, Instant};

/// Labelled timer for a single span of work
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Stop the timer, logging the elapsed time at debug level
    pub fn stop(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::debug!("{}: {}ms", self.label, elapsed.as_millis());
        elapsed
    }
}

/// Cumulative lap recorder, one lap per round
#[derive(Debug)]
pub struct RoundClock {
    start: Instant,
    laps: Vec<(u32, Duration)>,
}

impl RoundClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            laps: Vec::new(),
        }
    }

    /// Mark the end of `round`
    pub fn lap(&mut self, round: u32) {
        self.laps.push((round, self.start.elapsed()));
    }

    pub fn total(&self) -> Duration {
        self.start.elapsed()
    }

    /// Per-round durations (not cumulative)
    pub fn round_times(&self) -> Vec<(u32, Duration)> {
        let mut prev = Duration::ZERO;
        self.laps
            .iter()
            .map(|&(round, cumulative)| {
                let lap = cumulative.saturating_sub(prev);
                prev = cumulative;
                (round, lap)
            })
            .collect()
    }

    pub fn format(&self) -> String {
        let mut output = String::new();
        for (round, duration) in self.round_times() {
            output.push_str(&format!("round {}: {}ms\n", round, duration.as_millis()));
        }
        output.push_str(&format!("total: {}ms", self.total().as_millis()));
        output
    }
}

impl Default for RoundClock {
    fn default() -> Self {
        Self::new()
    }
}
