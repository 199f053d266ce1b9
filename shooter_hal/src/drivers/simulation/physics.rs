//! Encoder and r-axis travel models.
//!
//! Motors are first-order: counts per second are proportional to the applied
//! duty. The r axis is mechanically bounded by its two limit switches; the
//! counter keeps its own zero so that an encoder reset moves the origin, not
//! the carriage.

use std::time::Duration;
use tracing::trace;

/// Tunables for the simulated mechanism.
#[derive(Debug, Clone, Copy)]
pub struct SimulationParams {
    /// Theta encoder speed at duty 1.0 [counts/s].
    pub theta_counts_per_sec: f64,
    /// r encoder speed at duty 1.0 [counts/s].
    pub r_counts_per_sec: f64,
    /// Mechanical r position of the positive limit switch [counts].
    pub r_positive_limit: f64,
    /// Mechanical r position of the negative limit switch [counts].
    pub r_negative_limit: f64,
    /// Mechanical r position at power-up [counts].
    pub r_start: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            theta_counts_per_sec: 40_960.0,
            r_counts_per_sec: 20_000.0,
            r_positive_limit: 8_000.0,
            r_negative_limit: -8_000.0,
            r_start: 0.0,
        }
    }
}

/// One quadrature counter with a resettable origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncoderSimulator {
    /// Mechanical position [counts].
    mechanical: f64,
    /// Mechanical position of the counter's zero [counts].
    origin: f64,
}

impl EncoderSimulator {
    /// Counter positioned at `mechanical` with zero at 0.
    pub fn at(mechanical: f64) -> Self {
        Self {
            mechanical,
            origin: 0.0,
        }
    }

    /// Counter value as the hardware would report it.
    #[inline]
    pub fn pulses(&self) -> i32 {
        let counts = (self.mechanical - self.origin).trunc();
        counts.clamp(i32::MIN as f64, i32::MAX as f64) as i32
    }

    /// Mechanical position [counts].
    #[inline]
    pub fn mechanical(&self) -> f64 {
        self.mechanical
    }

    /// Move the counter zero to the current mechanical position.
    pub fn reset(&mut self) {
        self.origin = self.mechanical;
    }

    /// Overwrite the counter value without moving the mechanism.
    pub fn set_pulses(&mut self, pulses: i32) {
        self.origin = self.mechanical - pulses as f64;
    }

    /// Advance by `velocity` [counts/s] over `dt`.
    pub fn advance(&mut self, velocity: f64, dt: Duration) {
        self.mechanical += velocity * dt.as_secs_f64();
    }

    pub(crate) fn clamp_mechanical(&mut self, min: f64, max: f64) {
        self.mechanical = self.mechanical.clamp(min, max);
    }
}

/// r-axis carriage between two limit switches.
#[derive(Debug, Clone, Copy)]
pub struct RAxisTravel {
    encoder: EncoderSimulator,
    positive_limit: f64,
    negative_limit: f64,
    counts_per_sec: f64,
}

impl RAxisTravel {
    /// Carriage built from the simulation parameters.
    pub fn new(params: &SimulationParams) -> Self {
        Self {
            encoder: EncoderSimulator::at(params.r_start),
            positive_limit: params.r_positive_limit,
            negative_limit: params.r_negative_limit,
            counts_per_sec: params.r_counts_per_sec,
        }
    }

    /// Drive for `dt` with the given direction and duty; stops at the limits.
    pub fn drive(&mut self, forward: bool, duty: f64, dt: Duration) {
        let sign = if forward { 1.0 } else { -1.0 };
        self.encoder.advance(sign * duty * self.counts_per_sec, dt);
        self.encoder
            .clamp_mechanical(self.negative_limit, self.positive_limit);
        trace!(
            "r carriage at {:.0} counts (pulses={})",
            self.encoder.mechanical(),
            self.encoder.pulses()
        );
    }

    /// SW1 state.
    #[inline]
    pub fn at_positive_limit(&self) -> bool {
        self.encoder.mechanical() >= self.positive_limit
    }

    /// SW2 state.
    #[inline]
    pub fn at_negative_limit(&self) -> bool {
        self.encoder.mechanical() <= self.negative_limit
    }

    /// Counter attached to the carriage.
    #[inline]
    pub fn encoder(&self) -> &EncoderSimulator {
        &self.encoder
    }

    /// Mutable counter attached to the carriage.
    #[inline]
    pub fn encoder_mut(&mut self) -> &mut EncoderSimulator {
        &mut self.encoder
    }
}
