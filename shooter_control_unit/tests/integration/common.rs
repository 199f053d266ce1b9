//! Shared fixtures: scripted command channel, recording driver, test config.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use shooter_common::control_unit::config::ControlUnitConfig;
use shooter_common::hal::driver::{HalDriver, HalError};
use shooter_common::hal::types::{ActuationFrame, AxisIndex, SwitchBank};
use shooter_control_unit::cycle::CycleRunner;
use shooter_control_unit::timer::FixedStepTimer;
use shooter_control_unit::transport::{CommandChannel, RecvOutcome, TransportError};

/// One scripted receive result.
#[derive(Debug, Clone)]
pub enum Step {
    Packet(Vec<u8>),
    Timeout,
    Error,
}

/// Command channel that replays a script and then reports `Closed`.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    steps: VecDeque<Step>,
    /// Timeouts requested by the runner, in call order.
    pub timeouts: Vec<Option<Duration>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packet(mut self, text: &str) -> Self {
        self.steps.push_back(Step::Packet(text.as_bytes().to_vec()));
        self
    }

    pub fn timeouts(mut self, n: usize) -> Self {
        for _ in 0..n {
            self.steps.push_back(Step::Timeout);
        }
        self
    }

    pub fn error(mut self) -> Self {
        self.steps.push_back(Step::Error);
        self
    }
}

impl CommandChannel for ScriptedChannel {
    fn recv(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<RecvOutcome, TransportError> {
        self.timeouts.push(timeout);
        match self.steps.pop_front() {
            Some(Step::Packet(bytes)) => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok(RecvOutcome::Packet(len))
            }
            Some(Step::Timeout) => Ok(RecvOutcome::TimedOut),
            Some(Step::Error) => Err(TransportError::Receive(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "scripted failure",
            ))),
            None => Err(TransportError::Closed),
        }
    }
}

/// Driver with test-controlled sensors that records every call.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    pub pulses: [i32; 7],
    pub switches: SwitchBank,
    pub frames: Vec<ActuationFrame>,
    pub resets: Vec<AxisIndex>,
    pub fail_init: bool,
    pub shutdowns: usize,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&ActuationFrame> {
        self.frames.last()
    }
}

impl HalDriver for RecordingDriver {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn version(&self) -> &'static str {
        "0.0.0"
    }

    fn init(&mut self) -> Result<(), HalError> {
        if self.fail_init {
            return Err(HalError::InitFailed("scripted".into()));
        }
        Ok(())
    }

    fn read_pulses(&mut self, axis: AxisIndex) -> i32 {
        self.pulses.get(axis).copied().unwrap_or(0)
    }

    fn reset_pulses(&mut self, axis: AxisIndex) {
        if let Some(p) = self.pulses.get_mut(axis) {
            *p = 0;
        }
        self.resets.push(axis);
    }

    fn read_switches(&mut self) -> SwitchBank {
        self.switches
    }

    fn apply(&mut self, frame: &ActuationFrame) {
        self.frames.push(*frame);
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        self.shutdowns += 1;
        self.apply(&ActuationFrame::stopped());
        Ok(())
    }
}

/// Default configuration without the actuation delay.
pub fn test_config() -> ControlUnitConfig {
    let mut cfg = ControlUnitConfig::default();
    cfg.control.actuation_delay_ms = 0;
    cfg
}

pub type TestRunner<D> = CycleRunner<ScriptedChannel, D, FixedStepTimer>;

/// Runner over a recording driver with a fixed 100 ms cycle.
pub fn recording_runner(channel: ScriptedChannel) -> TestRunner<RecordingDriver> {
    CycleRunner::new(
        &test_config(),
        channel,
        RecordingDriver::new(),
        FixedStepTimer::new(Duration::from_millis(100)),
    )
    .unwrap()
}
