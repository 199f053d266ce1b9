//! r-axis homing and positioning state machine.
//!
//! The r axis has no trusted absolute encoder mapping, so ground truth comes
//! from its two limit switches:
//!
//! | Mode | Behaviour                                                        |
//! |------|------------------------------------------------------------------|
//! | `+1` | drive forward until SW1, then zero the encoder                   |
//! | `-1` | drive reverse until SW2, then zero the encoder                   |
//! | `+2` | drive reverse while `|pulses| <= threshold`, else stop           |
//! | `-2` | drive forward while `|pulses| <= threshold`, else stop           |
//! | else | undriven                                                         |
//!
//! On the very first tick the sign of the r target selects a one-shot initial
//! seek (no encoder reset). That resolution sets the homing-done flag and
//! never runs again.
//!
//! Seeks are sub-states that persist across ticks: each tick checks the
//! switch once and returns a drive command, so the caller never blocks and
//! other channels keep being actuated. A started seek is latched until its
//! switch triggers or the optional timeout expires.

use std::time::{Duration, Instant};

use shooter_common::control_unit::command::RAxisMode;
use shooter_common::control_unit::config::RAxisConfig;
use shooter_common::hal::types::{OutputPair, SwitchBank};

/// Which limit switch a seek is heading for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    /// Toward SW1, motor forward.
    Positive,
    /// Toward SW2, motor reverse.
    Negative,
}

impl SeekDirection {
    #[inline]
    fn forward(self) -> bool {
        matches!(self, Self::Positive)
    }

    #[inline]
    fn switch(self) -> SwitchBank {
        match self {
            Self::Positive => SwitchBank::POSITIVE_LIMIT,
            Self::Negative => SwitchBank::NEGATIVE_LIMIT,
        }
    }
}

/// An active seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seek {
    /// Zero the encoder when the switch triggers (not for the initial seek).
    pub reset_origin: bool,
    /// When the seek started.
    pub started: Instant,
}

/// r-axis state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RAxisState {
    /// Before the first tick.
    Uninitialized,
    /// Heading for the positive limit switch.
    SeekPositive(Seek),
    /// Heading for the negative limit switch.
    SeekNegative(Seek),
    /// Bang-bang hold near the positive-limit origin.
    HoldNearPositive,
    /// Bang-bang hold near the negative-limit origin.
    HoldNearNegative,
    /// Undriven.
    Idle,
}

impl RAxisState {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::SeekPositive(_) => "SEEK_POSITIVE",
            Self::SeekNegative(_) => "SEEK_NEGATIVE",
            Self::HoldNearPositive => "HOLD_NEAR_POSITIVE",
            Self::HoldNearNegative => "HOLD_NEAR_NEGATIVE",
            Self::Idle => "IDLE",
        }
    }
}

/// Notable transitions, reported to the caller for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RAxisEvent {
    /// A seek started.
    SeekStarted(SeekDirection),
    /// A seek reached its switch.
    SeekCompleted(SeekDirection),
    /// A seek gave up before its switch triggered.
    SeekTimedOut(SeekDirection),
}

/// Inputs for one tick.
#[derive(Debug, Clone, Copy)]
pub struct RAxisInput {
    /// Raw r target (slot 3); its sign selects the initial seek.
    pub target: i32,
    /// Current r encoder count.
    pub pulses: i32,
    /// Current switch snapshot.
    pub switches: SwitchBank,
    /// Current time.
    pub now: Instant,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RAxisOutput {
    /// Motor command for the r channel (duty not yet limited).
    pub drive: OutputPair,
    /// Zero the r encoder before the next read.
    pub reset_encoder: bool,
    /// Transition worth logging.
    pub event: Option<RAxisEvent>,
    /// The first-cycle homing completed during this tick.
    pub homed: bool,
}

/// Tunables for the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RAxisParams {
    /// Duty for seeking and holding.
    pub seek_duty: f64,
    /// Hold drives while `|pulses| <= hold_threshold`.
    pub hold_threshold: u32,
    /// Abort seeks after this long.
    pub seek_timeout: Option<Duration>,
}

impl RAxisParams {
    /// Parameters from the `[r_axis]` config section.
    pub fn from_config(cfg: &RAxisConfig) -> Self {
        Self {
            seek_duty: cfg.seek_duty,
            hold_threshold: cfg.hold_threshold_counts.max(0).unsigned_abs(),
            seek_timeout: cfg.seek_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeekProgress {
    Running,
    Completed,
    TimedOut,
}

/// r-axis state machine.
#[derive(Debug, Clone)]
pub struct RAxisMachine {
    params: RAxisParams,
    state: RAxisState,
    homing_done: bool,
    /// Direction of the last drive, kept on stop.
    direction: bool,
}

impl RAxisMachine {
    /// Machine in `Uninitialized`, homing not done.
    pub fn new(params: RAxisParams) -> Self {
        Self {
            params,
            state: RAxisState::Uninitialized,
            homing_done: false,
            direction: false,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> RAxisState {
        self.state
    }

    /// `true` once the first-cycle homing has completed.
    #[inline]
    pub fn homing_done(&self) -> bool {
        self.homing_done
    }

    /// `true` while a seek is in progress.
    #[inline]
    pub fn is_seeking(&self) -> bool {
        matches!(
            self.state,
            RAxisState::SeekPositive(_) | RAxisState::SeekNegative(_)
        )
    }

    /// Advance the machine by one tick.
    ///
    /// While a seek is active `mode` is ignored. When the initial seek
    /// completes, `mode` is resolved in the same tick; when a commanded seek
    /// completes or any seek times out, the tick ends there.
    pub fn tick(&mut self, mode: RAxisMode, input: &RAxisInput) -> RAxisOutput {
        let mut out = RAxisOutput {
            drive: self.stop(),
            reset_encoder: false,
            event: None,
            homed: false,
        };

        if self.state == RAxisState::Uninitialized {
            match input.target.signum() {
                1 => self.start_seek(SeekDirection::Positive, false, input.now, &mut out),
                -1 => self.start_seek(SeekDirection::Negative, false, input.now, &mut out),
                _ => {
                    self.homing_done = true;
                    self.state = RAxisState::Idle;
                    out.homed = true;
                }
            }
        }

        let (dir, seek) = match self.state {
            RAxisState::SeekPositive(seek) => (SeekDirection::Positive, seek),
            RAxisState::SeekNegative(seek) => (SeekDirection::Negative, seek),
            _ => {
                self.apply_mode(mode, input, &mut out);
                return out;
            }
        };

        match self.advance_seek(dir, seek, input, &mut out) {
            SeekProgress::Completed if !seek.reset_origin => {
                self.homing_done = true;
                out.homed = true;
                let event = out.event;
                self.apply_mode(mode, input, &mut out);
                if out.event.is_none() {
                    out.event = event;
                }
            }
            SeekProgress::Running | SeekProgress::Completed | SeekProgress::TimedOut => {}
        }
        out
    }

    /// Run one tick of an active seek.
    fn advance_seek(
        &mut self,
        dir: SeekDirection,
        seek: Seek,
        input: &RAxisInput,
        out: &mut RAxisOutput,
    ) -> SeekProgress {
        if input.switches.contains(dir.switch()) {
            out.drive = self.stop();
            out.reset_encoder = seek.reset_origin;
            out.event = Some(RAxisEvent::SeekCompleted(dir));
            self.state = RAxisState::Idle;
            return SeekProgress::Completed;
        }

        let expired = match self.params.seek_timeout {
            Some(limit) => input.now.saturating_duration_since(seek.started) >= limit,
            None => false,
        };
        if expired {
            out.drive = self.stop();
            out.event = Some(RAxisEvent::SeekTimedOut(dir));
            self.state = RAxisState::Idle;
            return SeekProgress::TimedOut;
        }

        out.drive = self.drive(dir.forward());
        SeekProgress::Running
    }

    /// Resolve a mode command from `Idle` or a hold state.
    fn apply_mode(&mut self, mode: RAxisMode, input: &RAxisInput, out: &mut RAxisOutput) {
        let dir = match mode {
            RAxisMode::SeekPositive => SeekDirection::Positive,
            RAxisMode::SeekNegative => SeekDirection::Negative,
            RAxisMode::HoldNearPositive => {
                self.state = RAxisState::HoldNearPositive;
                out.drive = self.hold(false, input.pulses);
                return;
            }
            RAxisMode::HoldNearNegative => {
                self.state = RAxisState::HoldNearNegative;
                out.drive = self.hold(true, input.pulses);
                return;
            }
            RAxisMode::Idle => {
                self.state = RAxisState::Idle;
                out.drive = self.stop();
                return;
            }
        };

        self.start_seek(dir, true, input.now, out);
        let seek = Seek {
            reset_origin: true,
            started: input.now,
        };
        // A switch already closed completes the seek on its first tick.
        self.advance_seek(dir, seek, input, out);
    }

    fn start_seek(
        &mut self,
        dir: SeekDirection,
        reset_origin: bool,
        now: Instant,
        out: &mut RAxisOutput,
    ) {
        let seek = Seek {
            reset_origin,
            started: now,
        };
        self.state = match dir {
            SeekDirection::Positive => RAxisState::SeekPositive(seek),
            SeekDirection::Negative => RAxisState::SeekNegative(seek),
        };
        out.event = Some(RAxisEvent::SeekStarted(dir));
    }

    fn hold(&mut self, forward: bool, pulses: i32) -> OutputPair {
        if pulses.unsigned_abs() <= self.params.hold_threshold {
            self.drive(forward)
        } else {
            self.stop()
        }
    }

    #[inline]
    fn drive(&mut self, forward: bool) -> OutputPair {
        self.direction = forward;
        OutputPair::new(forward, self.params.seek_duty)
    }

    #[inline]
    fn stop(&self) -> OutputPair {
        OutputPair::new(self.direction, 0.0)
    }
}
