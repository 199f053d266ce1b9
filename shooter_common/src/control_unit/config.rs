//! Configuration structures for the Control Unit.
//!
//! All config types use `serde::Deserialize` for TOML loading. Every section
//! defaults to the values the deployed firmware was built with, so an empty
//! file (or no file) yields a working configuration.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    ACTUATION_DELAY_MS, BIND_ADDR, COUNTS_PER_REV, DEAD_BAND_DEG, DEAD_BAND_HOLD_DUTY, DEG_LIMIT,
    FEED_DUTY, IDLE_POLL_MS, JAM_DUTY, KD_DEFAULT, KI_DEFAULT, KP_DEFAULT, MIN_DT_MS, PID_AXES,
    PWM_LIMIT, R_HOLD_THRESHOLD_COUNTS, R_SEEK_DUTY, RECEIVE_PORT, RECV_BUFFER_LEN, SEEK_POLL_MS,
};
use crate::hal::types::AxisIndex;

// ─── Top-Level Config ───────────────────────────────────────────────

/// Top-level Control Unit configuration.
///
/// Loaded from TOML at startup and immutable afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlUnitConfig {
    /// Service identity and log level.
    pub shared: SharedConfig,
    /// Command socket.
    pub network: NetworkConfig,
    /// Driver selection.
    pub hal: HalConfig,
    /// Scaling, output limits and cycle timing.
    pub control: ControlConfig,
    /// PID gains.
    pub gains: GainConfig,
    /// Theta dead-band.
    pub dead_band: DeadBandConfig,
    /// r-axis homing and holding.
    pub r_axis: RAxisConfig,
    /// Feed conveyor.
    pub feed: FeedConfig,
    /// Jam-prevention motor.
    pub jam: JamConfig,
}

impl ControlUnitConfig {
    /// Validate parameter bounds and cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let c = &self.control;
        if !(c.pwm_limit > 0.0 && c.pwm_limit <= 1.0) {
            return invalid(format!("control.pwm_limit {} out of range (0, 1]", c.pwm_limit));
        }
        if !(c.deg_limit > 0.0 && c.deg_limit.is_finite()) {
            return invalid(format!("control.deg_limit {} must be > 0", c.deg_limit));
        }
        if !(c.counts_per_rev > 0.0 && c.counts_per_rev.is_finite()) {
            return invalid(format!(
                "control.counts_per_rev {} must be > 0",
                c.counts_per_rev
            ));
        }
        if c.min_dt_ms == 0 {
            return invalid("control.min_dt_ms must be >= 1".to_string());
        }
        match c.max_dt_ms {
            Some(max) if max < c.min_dt_ms => {
                return invalid(format!(
                    "control.max_dt_ms {max} below min_dt_ms {}",
                    c.min_dt_ms
                ));
            }
            _ => {}
        }
        if c.idle_poll_ms == 0 {
            return invalid("control.idle_poll_ms must be >= 1".to_string());
        }

        if self.network.recv_buffer_len == 0 {
            return invalid("network.recv_buffer_len must be >= 1".to_string());
        }

        self.gains.validate()?;

        if !is_pid_axis(self.dead_band.axis) {
            return invalid(format!(
                "dead_band.axis {} out of range [1, {PID_AXES}]",
                self.dead_band.axis
            ));
        }
        if !(self.dead_band.threshold_deg >= 0.0) {
            return invalid(format!(
                "dead_band.threshold_deg {} must be >= 0",
                self.dead_band.threshold_deg
            ));
        }

        if !is_pid_axis(self.r_axis.encoder) {
            return invalid(format!(
                "r_axis.encoder {} out of range [1, {PID_AXES}]",
                self.r_axis.encoder
            ));
        }
        if self.r_axis.hold_threshold_counts < 0 {
            return invalid(format!(
                "r_axis.hold_threshold_counts {} must be >= 0",
                self.r_axis.hold_threshold_counts
            ));
        }
        if self.r_axis.seek_poll_ms == 0 {
            return invalid("r_axis.seek_poll_ms must be >= 1".to_string());
        }

        for (name, duty) in [
            ("dead_band.hold_duty", self.dead_band.hold_duty),
            ("r_axis.seek_duty", self.r_axis.seek_duty),
            ("feed.duty", self.feed.duty),
            ("jam.duty", self.jam.duty),
        ] {
            if !(duty >= 0.0 && duty.is_finite()) {
                return invalid(format!("{name} {duty} must be >= 0"));
            }
        }

        Ok(())
    }
}

fn invalid(msg: String) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(msg))
}

#[inline]
fn is_pid_axis(axis: AxisIndex) -> bool {
    (1..=PID_AXES).contains(&axis)
}

// ─── Sections ───────────────────────────────────────────────────────

/// Command socket configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Local address the command socket binds to.
    pub bind_addr: String,
    /// Local UDP port for command datagrams.
    pub receive_port: u16,
    /// Receive buffer size [bytes]; longer datagrams are truncated.
    pub recv_buffer_len: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: BIND_ADDR.to_string(),
            receive_port: RECEIVE_PORT,
            recv_buffer_len: RECV_BUFFER_LEN,
        }
    }
}

/// Driver selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HalConfig {
    /// Registered driver name.
    pub driver: String,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            driver: "simulation".to_string(),
        }
    }
}

/// Scaling, output limits and cycle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Encoder counts per revolution.
    pub counts_per_rev: f64,
    /// Output normalisation divisor.
    pub deg_limit: f64,
    /// Absolute duty ceiling, applied to every channel.
    pub pwm_limit: f64,
    /// Wait between the PID step and actuation [ms].
    pub actuation_delay_ms: u64,
    /// Smallest admissible time step [ms].
    pub min_dt_ms: u64,
    /// Largest admissible time step [ms] (`None` = unbounded).
    pub max_dt_ms: Option<u64>,
    /// Receive timeout while idle [ms].
    pub idle_poll_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            counts_per_rev: COUNTS_PER_REV,
            deg_limit: DEG_LIMIT,
            pwm_limit: PWM_LIMIT,
            actuation_delay_ms: ACTUATION_DELAY_MS,
            min_dt_ms: MIN_DT_MS,
            max_dt_ms: None,
            idle_poll_ms: IDLE_POLL_MS,
        }
    }
}

/// Process-wide PID gains with optional per-axis overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GainConfig {
    /// Default proportional gain.
    pub kp: f64,
    /// Default integral gain.
    pub ki: f64,
    /// Default derivative gain.
    pub kd: f64,
    /// Per-axis overrides (`[[gains.axis]]`).
    pub axis: Vec<AxisGainOverride>,
}

impl Default for GainConfig {
    fn default() -> Self {
        Self {
            kp: KP_DEFAULT,
            ki: KI_DEFAULT,
            kd: KD_DEFAULT,
            axis: Vec::new(),
        }
    }
}

impl GainConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, gain) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !gain.is_finite() {
                return invalid(format!("gains.{name} must be finite"));
            }
        }
        let mut seen = [false; PID_AXES + 1];
        for ov in &self.axis {
            if !is_pid_axis(ov.axis) {
                return invalid(format!(
                    "gains.axis {} out of range [1, {PID_AXES}]",
                    ov.axis
                ));
            }
            if seen[ov.axis] {
                return invalid(format!("gains.axis {} overridden twice", ov.axis));
            }
            seen[ov.axis] = true;
            for gain in [ov.kp, ov.ki, ov.kd].into_iter().flatten() {
                if !gain.is_finite() {
                    return invalid(format!("gains.axis {} has a non-finite gain", ov.axis));
                }
            }
        }
        Ok(())
    }
}

/// Gains for one axis. Unset fields fall back to the process-wide default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxisGainOverride {
    /// Axis index (1..=6).
    pub axis: AxisIndex,
    /// Proportional gain.
    #[serde(default)]
    pub kp: Option<f64>,
    /// Integral gain.
    #[serde(default)]
    pub ki: Option<f64>,
    /// Derivative gain.
    #[serde(default)]
    pub kd: Option<f64>,
}

/// Dead-band around the theta target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadBandConfig {
    /// Axis whose error is checked.
    pub axis: AxisIndex,
    /// Error magnitude [deg] at or below which output is suppressed.
    pub threshold_deg: f64,
    /// Feed duty applied while inside the band.
    pub hold_duty: f64,
}

impl Default for DeadBandConfig {
    fn default() -> Self {
        Self {
            axis: 1,
            threshold_deg: DEAD_BAND_DEG,
            hold_duty: DEAD_BAND_HOLD_DUTY,
        }
    }
}

/// r-axis homing and holding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RAxisConfig {
    /// Encoder wired to the r axis.
    pub encoder: AxisIndex,
    /// Duty used for seeking and holding.
    pub seek_duty: f64,
    /// Hold drives while `|pulses| <= hold_threshold_counts`.
    pub hold_threshold_counts: i32,
    /// Receive timeout while a seek is running [ms].
    pub seek_poll_ms: u64,
    /// Abort a seek after this long [ms] (`None` = wait for the switch).
    pub seek_timeout_ms: Option<u64>,
}

impl Default for RAxisConfig {
    fn default() -> Self {
        Self {
            encoder: 3,
            seek_duty: R_SEEK_DUTY,
            hold_threshold_counts: R_HOLD_THRESHOLD_COUNTS,
            seek_poll_ms: SEEK_POLL_MS,
            seek_timeout_ms: None,
        }
    }
}

/// Feed conveyor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Duty for feed modes 1 and 2.
    pub duty: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { duty: FEED_DUTY }
    }
}

/// Jam-prevention motor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JamConfig {
    /// Duty applied every cycle.
    pub duty: f64,
}

impl Default for JamConfig {
    fn default() -> Self {
        Self { duty: JAM_DUTY }
    }
}
