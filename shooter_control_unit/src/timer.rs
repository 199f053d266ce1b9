//! Cycle timer and dt computation.
//!
//! The PID engine integrates over the real time between two command cycles.
//! The timer is read at PID time and restarted right after, so one dt covers
//! the actuation delay plus the wait for the next datagram.
//!
//! dt is taken at millisecond resolution, floored at `min_dt_ms` so the
//! derivative term never divides by zero, and optionally capped at
//! `max_dt_ms` after long pauses between commands.

use std::time::{Duration, Instant};

use shooter_common::control_unit::config::ControlConfig;

/// Source of elapsed time for the control cycle.
pub trait CycleTimer {
    /// Time since the last [`restart`](Self::restart).
    fn elapsed(&self) -> Duration;

    /// Start a new measurement interval.
    fn restart(&mut self);

    /// Current instant on this timer's clock.
    fn now(&self) -> Instant;
}

/// Wall-clock timer on the monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTimer {
    start: Instant,
}

impl MonotonicTimer {
    /// Timer started now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleTimer for MonotonicTimer {
    #[inline]
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    #[inline]
    fn restart(&mut self) {
        self.start = Instant::now();
    }

    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic timer: every interval lasts exactly `step`.
///
/// Time advances by one step on each restart, so `now()` moves forward
/// one step per command cycle. Used by tests and benchmarks.
#[derive(Debug, Clone, Copy)]
pub struct FixedStepTimer {
    step: Duration,
    base: Instant,
    ticks: u32,
}

impl FixedStepTimer {
    /// Timer whose every interval is `step`.
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            base: Instant::now(),
            ticks: 0,
        }
    }

    /// Advance the clock by `n` steps without restarting the interval.
    pub fn advance(&mut self, n: u32) {
        self.ticks = self.ticks.saturating_add(n);
    }
}

impl CycleTimer for FixedStepTimer {
    #[inline]
    fn elapsed(&self) -> Duration {
        self.step
    }

    #[inline]
    fn restart(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    #[inline]
    fn now(&self) -> Instant {
        self.base + self.step.saturating_mul(self.ticks)
    }
}

/// Converts elapsed time into the dt fed to the PID engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeStep {
    min_ms: u64,
    max_ms: Option<u64>,
}

impl TimeStep {
    /// Bounds in milliseconds. `min_ms` is raised to at least 1.
    pub fn new(min_ms: u64, max_ms: Option<u64>) -> Self {
        let min_ms = min_ms.max(1);
        Self {
            min_ms,
            max_ms: max_ms.map(|m| m.max(min_ms)),
        }
    }

    /// Bounds from the `[control]` config section.
    pub fn from_config(cfg: &ControlConfig) -> Self {
        Self::new(cfg.min_dt_ms, cfg.max_dt_ms)
    }

    /// dt in seconds for `elapsed`, and whether it had to be bounded.
    ///
    /// Elapsed time is truncated to whole milliseconds first.
    pub fn seconds(&self, elapsed: Duration) -> (f64, bool) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let mut clamped = false;
        let mut bounded = ms;
        if bounded < self.min_ms {
            bounded = self.min_ms;
            clamped = true;
        }
        if let Some(max) = self.max_ms {
            if bounded > max {
                bounded = max;
                clamped = true;
            }
        }
        (bounded as f64 / 1000.0, clamped)
    }
}
