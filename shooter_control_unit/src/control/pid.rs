//! Incremental PID controller with trapezoidal integration.
//!
//! The controller output is a running sum: each cycle adds
//! `Kp·e + Ki·∫e + Kd·ė` to the previous output instead of replacing it.
//! The mechanism was tuned against this behaviour, so it is kept as is.
//!
//! ```text
//! error      = target - measured
//! integral  += (error + prev_error) * dt / 2
//! derivative = (error - prev_error) / dt
//! output    += kp*error + ki*integral + kd*derivative
//! prev_error = error
//! ```
//!
//! The integral is never reset or clamped; the output is bounded only
//! downstream, in the output stage.

use shooter_common::consts::PID_AXES;
use shooter_common::control_unit::config::GainConfig;
use shooter_common::hal::types::AxisIndex;

/// PID gains for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
}

/// Per-axis gain lookup: process-wide defaults plus explicit overrides.
#[derive(Debug, Clone)]
pub struct GainTable {
    default: PidGains,
    per_axis: [Option<PidGains>; PID_AXES],
}

impl GainTable {
    /// Every axis uses `default`.
    pub fn uniform(default: PidGains) -> Self {
        Self {
            default,
            per_axis: [None; PID_AXES],
        }
    }

    /// Build from the `[gains]` config section.
    ///
    /// Override fields left unset inherit the process-wide value.
    /// Out-of-range axes are ignored (config validation rejects them).
    pub fn from_config(cfg: &GainConfig) -> Self {
        let default = PidGains {
            kp: cfg.kp,
            ki: cfg.ki,
            kd: cfg.kd,
        };
        let mut table = Self::uniform(default);
        for ov in &cfg.axis {
            let gains = PidGains {
                kp: ov.kp.unwrap_or(default.kp),
                ki: ov.ki.unwrap_or(default.ki),
                kd: ov.kd.unwrap_or(default.kd),
            };
            table.set(ov.axis, gains);
        }
        table
    }

    /// Override the gains of one axis.
    pub fn set(&mut self, axis: AxisIndex, gains: PidGains) {
        if let Some(slot) = axis.checked_sub(1).and_then(|i| self.per_axis.get_mut(i)) {
            *slot = Some(gains);
        }
    }

    /// Gains in effect for `axis`.
    #[inline]
    pub fn gains_for(&self, axis: AxisIndex) -> PidGains {
        axis.checked_sub(1)
            .and_then(|i| self.per_axis.get(i))
            .copied()
            .flatten()
            .unwrap_or(self.default)
    }
}

/// Incremental PID state for one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IncrementalPid {
    error: f64,
    prev_error: f64,
    integral: f64,
    derivative: f64,
    output: f64,
}

impl IncrementalPid {
    /// Run one control step and return the accumulated output.
    ///
    /// A non-positive or non-finite `dt` leaves the state untouched and
    /// returns the previous output.
    pub fn update(&mut self, gains: &PidGains, target: f64, measured: f64, dt: f64) -> f64 {
        if !(dt > 0.0 && dt.is_finite()) {
            return self.output;
        }

        let error = target - measured;
        self.integral += (error + self.prev_error) * dt / 2.0;
        self.derivative = (error - self.prev_error) / dt;
        self.output += gains.kp * error + gains.ki * self.integral + gains.kd * self.derivative;
        self.prev_error = error;
        self.error = error;

        self.output
    }

    /// Zero the accumulated output (dead-band). Error history is kept.
    #[inline]
    pub fn suppress_output(&mut self) {
        self.output = 0.0;
    }

    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Error of the last step.
    #[inline]
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Integral accumulator.
    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Derivative of the last step.
    #[inline]
    pub fn derivative(&self) -> f64 {
        self.derivative
    }

    /// Accumulated output.
    #[inline]
    pub fn output(&self) -> f64 {
        self.output
    }
}

/// One controller per encoder axis, indexed 1..=6.
#[derive(Debug, Clone, Default)]
pub struct ControllerBank {
    controllers: [IncrementalPid; PID_AXES],
}

impl ControllerBank {
    /// All controllers zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller of `axis`, if it is an encoder axis.
    #[inline]
    pub fn get(&self, axis: AxisIndex) -> Option<&IncrementalPid> {
        axis.checked_sub(1).and_then(|i| self.controllers.get(i))
    }

    /// Mutable controller of `axis`, if it is an encoder axis.
    #[inline]
    pub fn get_mut(&mut self, axis: AxisIndex) -> Option<&mut IncrementalPid> {
        axis.checked_sub(1).and_then(|i| self.controllers.get_mut(i))
    }

    /// Iterate `(axis, controller)` for axes 1..=6.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (AxisIndex, &mut IncrementalPid)> {
        self.controllers
            .iter_mut()
            .enumerate()
            .map(|(i, c)| (i + 1, c))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
