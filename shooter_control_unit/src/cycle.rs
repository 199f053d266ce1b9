//! Command-driven control cycle: receive → decode → PID → r axis → actuate.
//!
//! One full cycle runs per received datagram. Between datagrams the loop
//! only wakes to observe the shutdown flag, except while an r-axis seek is
//! active: then receive waits at most `seek_poll_ms` and each timeout runs a
//! *service tick* that advances the seek and re-applies the last frame with
//! the new r-axis drive. PID state is not touched by service ticks.
//!
//! ## RT Setup
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity`: pin to the configured CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`.
//!
//! All four steps are no-ops without the `rt` feature.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use shooter_common::consts::PID_AXES;
use shooter_common::control_unit::command::{JAM_SLOT, R_AXIS_SLOT, THETA_SLOT, TargetFrame};
use shooter_common::control_unit::config::ControlUnitConfig;
use shooter_common::hal::driver::HalDriver;
use shooter_common::hal::types::{ActuationFrame, AxisIndex, DriveChannel, OutputPair};

use crate::command::decoder::{DecodeOutcome, decode_into};
use crate::control::encoder::EncoderSampler;
use crate::control::output::{
    FixedDuties, FrameAssembler, FrameInputs, OutputLimits, fixed_output, limit_output,
};
use crate::control::pid::{ControllerBank, GainTable};
use crate::error::{CycleError, FaultFlags};
use crate::state::r_axis::{RAxisEvent, RAxisInput, RAxisMachine, RAxisParams, RAxisState};
use crate::timer::{CycleTimer, TimeStep};
use crate::transport::{CommandChannel, RecvOutcome, TransportError};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Command cycles executed.
    pub cycle_count: u64,
    /// r-axis service ticks executed.
    pub service_ticks: u64,
    /// Cycles skipped because a receive failed.
    pub skipped: u64,
    /// Packets with at least one malformed token.
    pub malformed_packets: u64,
    /// Cycles whose dt had to be floored or capped.
    pub dt_clamps: u64,
    /// Last cycle duration [ns], actuation delay included.
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
}

impl CycleStats {
    /// Create a new zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            service_ticks: 0,
            skipped: 0,
            malformed_packets: 0,
            dt_clamps: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
        }
    }

    /// Record a command cycle duration.
    #[inline]
    pub fn record(&mut self, duration_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        if duration_ns < self.min_cycle_ns {
            self.min_cycle_ns = duration_ns;
        }
        if duration_ns > self.max_cycle_ns {
            self.max_cycle_ns = duration_ns;
        }
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
    }

    /// Average cycle time [ns] (returns 0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch a block of stack so its pages are resident before the loop starts.
#[cfg(feature = "rt")]
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(not(feature = "rt"))]
fn prefault_stack() {}

/// Pin the current thread to a specific CPU core.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

/// Set SCHED_FIFO with the given RT priority.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Perform the full RT setup sequence.
///
/// Must be called before entering the cycle loop.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// What one cycle produced.
#[derive(Debug, Clone, Copy)]
pub struct CycleReport {
    /// Frame handed to the driver.
    pub frame: ActuationFrame,
    /// dt used by the PID step [s]; 0 for service ticks.
    pub dt: f64,
    /// Theta (axis 1) error after the step [deg].
    pub theta_error: f64,
    /// Theta was inside the dead-band.
    pub dead_band: bool,
    /// Limited output of every PID axis, index 0 is axis 1.
    pub axis_outputs: [OutputPair; PID_AXES],
    /// r-axis state after the step.
    pub r_state: RAxisState,
    /// Decoder result; `None` for service ticks.
    pub decode: Option<DecodeOutcome>,
    /// Non-fatal conditions seen.
    pub faults: FaultFlags,
}

/// Result of one [`CycleRunner::poll_once`].
#[derive(Debug, Clone, Copy)]
pub enum PollOutcome {
    /// A datagram arrived and a full cycle ran.
    Cycle(CycleReport),
    /// A seek was active and only the r axis was advanced.
    Service(CycleReport),
    /// Nothing arrived; nothing ran.
    Idle,
    /// Receive failed; the cycle was skipped.
    Skipped(FaultFlags),
}

/// Owns the channel, the driver, all controller state and the timer.
pub struct CycleRunner<C, D, T> {
    channel: C,
    hal: D,
    timer: T,

    targets: TargetFrame,
    sampler: EncoderSampler,
    gains: GainTable,
    controllers: ControllerBank,
    time_step: TimeStep,
    dead_band_axis: AxisIndex,
    dead_band_deg: f64,
    axis_outputs: [OutputPair; PID_AXES],
    r_axis: RAxisMachine,
    r_encoder: AxisIndex,
    assembler: FrameAssembler,
    last_frame: ActuationFrame,

    recv_buf: Vec<u8>,
    actuation_delay: Duration,
    idle_poll: Duration,
    seek_poll: Duration,
    running: Arc<AtomicBool>,
    stats: CycleStats,
}

impl<C, D, T> CycleRunner<C, D, T>
where
    C: CommandChannel,
    D: HalDriver,
    T: CycleTimer,
{
    /// Build the runner and initialize the driver.
    ///
    /// All runtime state is allocated here; the loop itself does not allocate.
    pub fn new(cfg: &ControlUnitConfig, channel: C, mut hal: D, timer: T) -> Result<Self, CycleError> {
        hal.init()?;
        info!("HAL driver '{}' v{} initialized", hal.name(), hal.version());

        Ok(Self {
            channel,
            hal,
            timer,
            targets: TargetFrame::new(),
            sampler: EncoderSampler::new(cfg.control.counts_per_rev),
            gains: GainTable::from_config(&cfg.gains),
            controllers: ControllerBank::new(),
            time_step: TimeStep::from_config(&cfg.control),
            dead_band_axis: cfg.dead_band.axis,
            dead_band_deg: cfg.dead_band.threshold_deg,
            axis_outputs: [OutputPair::STOPPED; PID_AXES],
            r_axis: RAxisMachine::new(RAxisParams::from_config(&cfg.r_axis)),
            r_encoder: cfg.r_axis.encoder,
            assembler: FrameAssembler::new(
                OutputLimits::from_config(cfg),
                FixedDuties::from_config(cfg),
            ),
            last_frame: ActuationFrame::stopped(),
            recv_buf: vec![0u8; cfg.network.recv_buffer_len],
            actuation_delay: Duration::from_millis(cfg.control.actuation_delay_ms),
            idle_poll: Duration::from_millis(cfg.control.idle_poll_ms),
            seek_poll: Duration::from_millis(cfg.r_axis.seek_poll_ms),
            running: Arc::new(AtomicBool::new(true)),
            stats: CycleStats::new(),
        })
    }

    /// Flag that keeps [`run`](Self::run) looping; clear it to stop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Loop until the running flag is cleared or the channel closes.
    ///
    /// The driver is shut down (all channels stopped) on every exit path.
    pub fn run(&mut self) -> Result<(), CycleError> {
        info!("Entering control loop");
        let result = loop {
            if !self.running.load(Ordering::SeqCst) {
                break Ok(());
            }
            if let Err(e) = self.poll_once() {
                break Err(e);
            }
        };

        let shutdown = self.hal.shutdown();
        info!(
            "Control loop stopped after {} cycles ({} service ticks, {} skipped, avg {} ns)",
            self.stats.cycle_count,
            self.stats.service_ticks,
            self.stats.skipped,
            self.stats.avg_cycle_ns()
        );
        result?;
        shutdown?;
        Ok(())
    }

    /// Wait for one datagram (or a timeout) and act on it.
    pub fn poll_once(&mut self) -> Result<PollOutcome, CycleError> {
        let timeout = if self.r_axis.is_seeking() {
            self.seek_poll
        } else {
            self.idle_poll
        };

        let mut buf = std::mem::take(&mut self.recv_buf);
        let received = self.channel.recv(&mut buf, Some(timeout));
        let outcome = match received {
            Ok(RecvOutcome::Packet(len)) => {
                let len = len.min(buf.len());
                Ok(PollOutcome::Cycle(self.process_packet(&buf[..len])))
            }
            Ok(RecvOutcome::TimedOut) if self.r_axis.is_seeking() => {
                Ok(PollOutcome::Service(self.service_tick()))
            }
            Ok(RecvOutcome::TimedOut) => Ok(PollOutcome::Idle),
            Err(TransportError::Receive(e)) => {
                self.stats.skipped += 1;
                warn!("Receive failed, cycle skipped: {e}");
                Ok(PollOutcome::Skipped(FaultFlags::RECEIVE_ERROR))
            }
            Err(e) => Err(CycleError::Transport(e)),
        };
        self.recv_buf = buf;
        outcome
    }

    /// Run one full command cycle on `packet`.
    pub fn process_packet(&mut self, packet: &[u8]) -> CycleReport {
        let cycle_start = Instant::now();
        let mut faults = FaultFlags::empty();

        // ═══ DECODE ═══
        let decode = decode_into(&mut self.targets, packet);
        if !decode.is_clean() {
            faults |= FaultFlags::MALFORMED_COMMAND;
            self.stats.malformed_packets += 1;
            debug!(
                "Malformed command: {} bad tokens, {} extra fields",
                decode.malformed, decode.overflow
            );
        }

        // ═══ SAMPLE ═══
        let snapshot = self.sampler.sample(&mut self.hal);
        let switches = self.hal.read_switches();

        // ═══ PID ═══
        let (dt, clamped) = self.time_step.seconds(self.timer.elapsed());
        if clamped {
            faults |= FaultFlags::DT_CLAMPED;
            self.stats.dt_clamps += 1;
        }
        for (axis, pid) in self.controllers.iter_mut() {
            let gains = self.gains.gains_for(axis);
            pid.update(
                &gains,
                f64::from(self.targets.get(axis)),
                snapshot.angle(axis),
                dt,
            );
        }

        let mut dead_band = false;
        if let Some(pid) = self.controllers.get_mut(self.dead_band_axis) {
            if pid.error().abs() <= self.dead_band_deg {
                pid.suppress_output();
                dead_band = true;
            }
        }

        let limits = *self.assembler.limits();
        let controllers = &self.controllers;
        self.axis_outputs = std::array::from_fn(|i| {
            controllers
                .get(i + 1)
                .map_or(OutputPair::STOPPED, |pid| limit_output(pid.output(), &limits))
        });
        let theta = self.axis_outputs[THETA_SLOT - 1];
        let theta_error = self.controllers.get(THETA_SLOT).map_or(0.0, |pid| pid.error());

        // ═══ R AXIS ═══
        let r_input = RAxisInput {
            target: self.targets.get(R_AXIS_SLOT),
            pulses: snapshot.pulses(self.r_encoder),
            switches,
            now: self.timer.now(),
        };
        let r_out = self.r_axis.tick(self.targets.r_axis_mode(), &r_input);
        faults |= self.handle_r_axis(r_out.event, r_out.reset_encoder, r_out.homed);

        self.timer.restart();
        if !self.actuation_delay.is_zero() {
            std::thread::sleep(self.actuation_delay);
        }

        // ═══ ACTUATE ═══
        let frame = self.assembler.assemble(&FrameInputs {
            theta,
            r_axis: r_out.drive,
            feed_mode: self.targets.feed_mode(),
            dead_band_hold: dead_band,
            jam_command: self.targets.get(JAM_SLOT),
        });
        self.hal.apply(&frame);
        self.last_frame = frame;

        let duration_ns = i64::try_from(cycle_start.elapsed().as_nanos()).unwrap_or(i64::MAX);
        self.stats.record(duration_ns);

        debug!(
            "cycle {}: dt={dt:.3}s theta_err={theta_error:.2} theta_duty={:.3} r={}",
            self.stats.cycle_count,
            theta.duty,
            self.r_axis.state().name()
        );
        trace!("targets={:?}", self.targets.as_slice());

        CycleReport {
            frame,
            dt,
            theta_error,
            dead_band,
            axis_outputs: self.axis_outputs,
            r_state: self.r_axis.state(),
            decode: Some(decode),
            faults,
        }
    }

    /// Advance only the r-axis state machine and re-apply the last frame.
    pub fn service_tick(&mut self) -> CycleReport {
        let switches = self.hal.read_switches();
        let r_input = RAxisInput {
            target: self.targets.get(R_AXIS_SLOT),
            pulses: self.hal.read_pulses(self.r_encoder),
            switches,
            now: self.timer.now(),
        };
        let r_out = self.r_axis.tick(self.targets.r_axis_mode(), &r_input);
        let faults = self.handle_r_axis(r_out.event, r_out.reset_encoder, r_out.homed);

        let limits = *self.assembler.limits();
        self.last_frame.set(
            DriveChannel::Md5,
            fixed_output(r_out.drive.direction, r_out.drive.duty, &limits),
        );
        self.hal.apply(&self.last_frame);
        self.stats.service_ticks += 1;

        let (theta_error, dead_band) = self
            .controllers
            .get(THETA_SLOT)
            .map(|pid| (pid.error(), pid.error().abs() <= self.dead_band_deg))
            .unwrap_or((0.0, false));

        CycleReport {
            frame: self.last_frame,
            dt: 0.0,
            theta_error,
            dead_band,
            axis_outputs: self.axis_outputs,
            r_state: self.r_axis.state(),
            decode: None,
            faults,
        }
    }

    fn handle_r_axis(
        &mut self,
        event: Option<RAxisEvent>,
        reset_encoder: bool,
        homed: bool,
    ) -> FaultFlags {
        if reset_encoder {
            self.hal.reset_pulses(self.r_encoder);
        }
        if homed {
            info!("r axis: initial homing complete");
        }
        match event {
            Some(RAxisEvent::SeekStarted(dir)) => {
                info!("r axis: seek {dir:?} started");
                FaultFlags::empty()
            }
            Some(RAxisEvent::SeekCompleted(dir)) => {
                info!("r axis: seek {dir:?} reached its limit switch");
                FaultFlags::empty()
            }
            Some(RAxisEvent::SeekTimedOut(dir)) => {
                warn!("r axis: seek {dir:?} timed out, drive stopped");
                FaultFlags::SEEK_TIMED_OUT
            }
            None => FaultFlags::empty(),
        }
    }

    /// Current target frame.
    pub fn targets(&self) -> &TargetFrame {
        &self.targets
    }

    /// Per-axis controllers.
    pub fn controllers(&self) -> &ControllerBank {
        &self.controllers
    }

    /// r-axis state machine.
    pub fn r_axis(&self) -> &RAxisMachine {
        &self.r_axis
    }

    /// Last frame handed to the driver.
    pub fn last_frame(&self) -> &ActuationFrame {
        &self.last_frame
    }

    /// Limited output of every PID axis from the last command cycle.
    pub fn axis_outputs(&self) -> &[OutputPair; PID_AXES] {
        &self.axis_outputs
    }

    /// Theta output pair of the last frame.
    pub fn theta_output(&self) -> OutputPair {
        self.last_frame.get(DriveChannel::Md1)
    }

    /// Cycle statistics.
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// The driver.
    pub fn hal(&self) -> &D {
        &self.hal
    }

    /// The driver, mutably.
    pub fn hal_mut(&mut self) -> &mut D {
        &mut self.hal
    }

    /// The cycle timer, mutably.
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
