//! Output safety pipeline and actuation frame assembly.
//!
//! Every duty that reaches the driver passes through [`clamp_duty`], so no
//! channel can ever exceed `pwm_limit`, regardless of how large the
//! accumulated controller output has grown.
//!
//! Channel map:
//!
//! | Channel | Source                                     |
//! |---------|--------------------------------------------|
//! | MD1     | theta PID (axis 1)                         |
//! | MD2     | feed mode, dead-band hold overrides duty   |
//! | MD3/MD4 | unusable, always stopped                   |
//! | MD5     | r-axis state machine                       |
//! | MD6     | mirrors MD1                                |
//! | MD7     | jam prevention, fixed duty every cycle     |
//! | MD8     | sorting feed, follows feed mode            |

use shooter_common::control_unit::command::FeedMode;
use shooter_common::control_unit::config::ControlUnitConfig;
use shooter_common::hal::types::{ActuationFrame, DriveChannel, OutputPair};

/// Process-wide output limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputLimits {
    /// Controller output mapped to 100% duty.
    pub deg_limit: f64,
    /// Absolute duty ceiling.
    pub pwm_limit: f64,
}

impl OutputLimits {
    /// Limits from the `[control]` config section.
    pub fn from_config(cfg: &ControlUnitConfig) -> Self {
        Self {
            deg_limit: cfg.control.deg_limit,
            pwm_limit: cfg.control.pwm_limit,
        }
    }
}

/// Bound a duty to `[0, pwm_limit]`. Non-finite input yields 0.
#[inline]
pub fn clamp_duty(duty: f64, pwm_limit: f64) -> f64 {
    if !duty.is_finite() {
        return 0.0;
    }
    duty.abs().min(pwm_limit).max(0.0)
}

/// Convert signed controller output into a direction flag and bounded duty.
///
/// `direction = output/deg_limit > 0`, `duty = min(|output/deg_limit|, pwm_limit)`.
/// A non-finite output is treated as zero.
#[inline]
pub fn limit_output(output: f64, limits: &OutputLimits) -> OutputPair {
    let normalized = output / limits.deg_limit;
    if !normalized.is_finite() {
        return OutputPair::STOPPED;
    }
    OutputPair::new(normalized > 0.0, clamp_duty(normalized, limits.pwm_limit))
}

/// Fixed-duty output, bounded like every other channel.
#[inline]
pub fn fixed_output(direction: bool, duty: f64, limits: &OutputLimits) -> OutputPair {
    OutputPair::new(direction, clamp_duty(duty, limits.pwm_limit))
}

/// Direction that follows the sign of a command and holds on zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectionLatch {
    forward: bool,
}

impl DirectionLatch {
    /// Positive → forward, negative → reverse, zero → unchanged.
    #[inline]
    pub fn follow_sign(&mut self, value: i32) -> bool {
        if value > 0 {
            self.forward = true;
        } else if value < 0 {
            self.forward = false;
        }
        self.forward
    }

    /// Force a direction.
    #[inline]
    pub fn set(&mut self, forward: bool) {
        self.forward = forward;
    }

    /// Current direction.
    #[inline]
    pub fn forward(&self) -> bool {
        self.forward
    }
}

/// Fixed duties used when assembling a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDuties {
    /// Feed duty for feed modes 1/2.
    pub feed: f64,
    /// Feed duty while theta is inside the dead-band.
    pub dead_band_hold: f64,
    /// Jam-prevention duty.
    pub jam: f64,
}

impl FixedDuties {
    /// Duties from the config.
    pub fn from_config(cfg: &ControlUnitConfig) -> Self {
        Self {
            feed: cfg.feed.duty,
            dead_band_hold: cfg.dead_band.hold_duty,
            jam: cfg.jam.duty,
        }
    }
}

/// Everything the frame assembly needs from one cycle.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs {
    /// Limited theta output (axis 1).
    pub theta: OutputPair,
    /// r-axis drive from the state machine (duty not yet limited).
    pub r_axis: OutputPair,
    /// Feed mode from slot 2.
    pub feed_mode: FeedMode,
    /// Theta error inside the dead-band this cycle.
    pub dead_band_hold: bool,
    /// Jam direction command (slot 7).
    pub jam_command: i32,
}

/// Builds actuation frames and owns the channel direction latches.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    limits: OutputLimits,
    duties: FixedDuties,
    feed_direction: DirectionLatch,
    jam_direction: DirectionLatch,
}

impl FrameAssembler {
    /// Assembler with all latches in reverse.
    pub fn new(limits: OutputLimits, duties: FixedDuties) -> Self {
        Self {
            limits,
            duties,
            feed_direction: DirectionLatch::default(),
            jam_direction: DirectionLatch::default(),
        }
    }

    /// Output limits in use.
    #[inline]
    pub fn limits(&self) -> &OutputLimits {
        &self.limits
    }

    /// Build the frame for one command cycle.
    pub fn assemble(&mut self, inputs: &FrameInputs) -> ActuationFrame {
        let limits = self.limits;
        let mut frame = ActuationFrame::stopped();

        let theta = OutputPair::new(
            inputs.theta.direction,
            clamp_duty(inputs.theta.duty, limits.pwm_limit),
        );
        frame.set(DriveChannel::Md1, theta);
        frame.set(DriveChannel::Md6, theta);

        let (feed, sort) = match inputs.feed_mode {
            FeedMode::Forward => {
                self.feed_direction.set(true);
                (self.duties.feed, self.duties.feed)
            }
            FeedMode::Reverse => {
                self.feed_direction.set(false);
                (self.duties.feed, self.duties.feed)
            }
            FeedMode::Stop | FeedMode::Unknown(_) => (0.0, 0.0),
        };
        let feed = if inputs.dead_band_hold {
            self.duties.dead_band_hold
        } else {
            feed
        };
        frame.set(
            DriveChannel::Md2,
            fixed_output(self.feed_direction.forward(), feed, &limits),
        );
        frame.set(DriveChannel::Md8, fixed_output(false, sort, &limits));

        frame.set(
            DriveChannel::Md5,
            fixed_output(inputs.r_axis.direction, inputs.r_axis.duty, &limits),
        );

        let jam_forward = self.jam_direction.follow_sign(inputs.jam_command);
        frame.set(
            DriveChannel::Md7,
            fixed_output(jam_forward, self.duties.jam, &limits),
        );

        frame
    }
}
