//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `HalDriver` trait to provide
//! software-emulated encoders, limit switches and motor channels for
//! development and testing without the main board.

use super::physics::{EncoderSimulator, RAxisTravel, SimulationParams};
use shooter_common::consts::PID_AXES;
use shooter_common::hal::driver::{HalDriver, HalError};
use shooter_common::hal::types::{ActuationFrame, AxisIndex, DriveChannel, SwitchBank};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Encoder wired to the theta motor (MD1).
const THETA_ENCODER: AxisIndex = 1;
/// Encoder wired to the r-axis carriage (MD5).
const R_ENCODER: AxisIndex = 3;

/// How simulated time advances.
#[derive(Debug, Clone, Copy)]
pub enum SimClock {
    /// Integrate the previous frame over the wall-clock time since it was applied.
    Realtime,
    /// Each applied frame is held for exactly this long before the next read.
    Fixed(Duration),
}

/// Simulation driver implementing the HalDriver trait.
pub struct SimulationDriver {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    /// Initialized flag
    initialized: bool,
    /// Mechanism parameters
    params: SimulationParams,
    /// Time base
    clock: SimClock,
    /// Counters for the encoders without a modelled carriage (index 0 unused)
    encoders: [EncoderSimulator; PID_AXES + 1],
    /// r-axis carriage (drives encoder 3)
    r_axis: RAxisTravel,
    /// Switches forced on by tests or operators
    forced_switches: SwitchBank,
    /// Most recently applied frame
    last_frame: ActuationFrame,
    /// Wall-clock time of the last apply (realtime clock only)
    last_apply: Option<Instant>,
    /// Number of frames applied
    frames_applied: u64,
}

impl SimulationDriver {
    /// Create a new simulation driver with default parameters and a realtime clock.
    pub fn new() -> Self {
        Self::with_params(SimulationParams::default(), SimClock::Realtime)
    }

    /// Create a simulation driver with explicit parameters and time base.
    pub fn with_params(params: SimulationParams, clock: SimClock) -> Self {
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            initialized: false,
            params,
            clock,
            encoders: [EncoderSimulator::default(); PID_AXES + 1],
            r_axis: RAxisTravel::new(&params),
            forced_switches: SwitchBank::empty(),
            last_frame: ActuationFrame::stopped(),
            last_apply: None,
            frames_applied: 0,
        }
    }

    /// Force switches on in addition to the modelled limit switches.
    pub fn force_switches(&mut self, switches: SwitchBank) {
        self.forced_switches = switches;
    }

    /// Overwrite an encoder counter without moving the mechanism.
    pub fn set_pulses(&mut self, axis: AxisIndex, pulses: i32) {
        if let Some(enc) = self.encoder_mut(axis) {
            enc.set_pulses(pulses);
        }
    }

    /// Most recently applied frame.
    pub fn last_frame(&self) -> &ActuationFrame {
        &self.last_frame
    }

    /// Number of frames applied since construction.
    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }

    /// Mechanical r-axis position [counts].
    pub fn r_mechanical(&self) -> f64 {
        self.r_axis.encoder().mechanical()
    }

    fn encoder_mut(&mut self, axis: AxisIndex) -> Option<&mut EncoderSimulator> {
        match axis {
            R_ENCODER => Some(self.r_axis.encoder_mut()),
            1..=PID_AXES => Some(&mut self.encoders[axis]),
            _ => None,
        }
    }

    /// Integrate `frame` over `dt`.
    fn integrate(&mut self, frame: &ActuationFrame, dt: Duration) {
        if dt.is_zero() {
            return;
        }
        let theta = frame.get(DriveChannel::Md1);
        let sign = if theta.direction { 1.0 } else { -1.0 };
        self.encoders[THETA_ENCODER].advance(sign * theta.duty * self.params.theta_counts_per_sec, dt);

        let r = frame.get(DriveChannel::Md5);
        self.r_axis.drive(r.direction, r.duty, dt);
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HalDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&mut self) -> Result<(), HalError> {
        if self.params.r_negative_limit >= self.params.r_positive_limit {
            return Err(HalError::InitFailed(format!(
                "r-axis limits inverted: negative {} >= positive {}",
                self.params.r_negative_limit, self.params.r_positive_limit
            )));
        }
        info!(
            "Simulation driver initialized: clock={:?}, r travel [{}, {}] counts",
            self.clock, self.params.r_negative_limit, self.params.r_positive_limit
        );
        self.initialized = true;
        Ok(())
    }

    fn read_pulses(&mut self, axis: AxisIndex) -> i32 {
        match axis {
            R_ENCODER => self.r_axis.encoder().pulses(),
            1..=PID_AXES => self.encoders[axis].pulses(),
            _ => {
                warn!("Read of unwired encoder {}", axis);
                0
            }
        }
    }

    fn reset_pulses(&mut self, axis: AxisIndex) {
        debug!("Encoder {} reset", axis);
        if let Some(enc) = self.encoder_mut(axis) {
            enc.reset();
        }
    }

    fn read_switches(&mut self) -> SwitchBank {
        let mut bank = SwitchBank::empty();
        bank.set(SwitchBank::POSITIVE_LIMIT, self.r_axis.at_positive_limit());
        bank.set(SwitchBank::NEGATIVE_LIMIT, self.r_axis.at_negative_limit());
        bank | self.forced_switches
    }

    fn apply(&mut self, frame: &ActuationFrame) {
        if !self.initialized {
            warn!("Frame applied before init");
        }
        match self.clock {
            SimClock::Fixed(step) => {
                self.integrate(frame, step);
            }
            SimClock::Realtime => {
                let now = Instant::now();
                if let Some(last) = self.last_apply {
                    let prev = self.last_frame;
                    self.integrate(&prev, now.duration_since(last));
                }
                self.last_apply = Some(now);
            }
        }
        self.last_frame = *frame;
        self.frames_applied += 1;
        trace!("Frame {} applied: {:?}", self.frames_applied, frame);
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        info!("Shutting down simulation driver");
        self.last_frame = ActuationFrame::stopped();
        self.initialized = false;
        Ok(())
    }
}
