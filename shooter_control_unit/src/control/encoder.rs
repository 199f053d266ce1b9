//! Encoder sampling: raw pulse counts → angle in degrees.
//!
//! Counters are never reset here, so angles are not wrapped to one
//! revolution and may exceed ±360°.

use shooter_common::consts::PID_AXES;
use shooter_common::hal::driver::HalDriver;
use shooter_common::hal::types::AxisIndex;

/// Convert a pulse count to degrees.
#[inline]
pub fn pulses_to_degrees(pulses: i32, counts_per_rev: f64) -> f64 {
    pulses as f64 / counts_per_rev * 360.0
}

/// Pulse counts and angles of all encoder axes for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EncoderSnapshot {
    pulses: [i32; PID_AXES],
    angles: [f64; PID_AXES],
}

impl EncoderSnapshot {
    /// Pulse count of encoder `axis` (1-based). Unwired axes read 0.
    #[inline]
    pub fn pulses(&self, axis: AxisIndex) -> i32 {
        axis.checked_sub(1)
            .and_then(|i| self.pulses.get(i))
            .copied()
            .unwrap_or(0)
    }

    /// Angle [deg] of encoder `axis` (1-based). Unwired axes read 0.
    #[inline]
    pub fn angle(&self, axis: AxisIndex) -> f64 {
        axis.checked_sub(1)
            .and_then(|i| self.angles.get(i))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Reads every encoder counter and scales it to degrees.
#[derive(Debug, Clone, Copy)]
pub struct EncoderSampler {
    counts_per_rev: f64,
}

impl EncoderSampler {
    /// Sampler for encoders with `counts_per_rev` counts per revolution.
    pub fn new(counts_per_rev: f64) -> Self {
        Self { counts_per_rev }
    }

    /// Build a snapshot from already-read pulse counts (axis 1 first).
    pub fn snapshot_from(&self, pulses: [i32; PID_AXES]) -> EncoderSnapshot {
        EncoderSnapshot {
            pulses,
            angles: pulses.map(|p| pulses_to_degrees(p, self.counts_per_rev)),
        }
    }

    /// Read encoders 1..=6 from the driver.
    pub fn sample<D: HalDriver + ?Sized>(&self, hal: &mut D) -> EncoderSnapshot {
        let mut pulses = [0i32; PID_AXES];
        for (i, p) in pulses.iter_mut().enumerate() {
            *p = hal.read_pulses(i + 1);
        }
        self.snapshot_from(pulses)
    }
}
