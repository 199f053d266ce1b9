//! System-wide constants for the shooter workspace.
//!
//! Single source of truth for slot counts and the firmware defaults that the
//! configuration falls back to.

use static_assertions::const_assert;

/// Number of target slots in a command frame, addressed as slots 1..=9.
pub const AXIS_SLOTS: usize = 9;

/// Number of encoder-equipped axes (1..=6), each with its own PID controller.
pub const PID_AXES: usize = 6;

/// Number of motor driver channels (MD1..MD8).
pub const DRIVE_CHANNELS: usize = 8;

/// Encoder counts per mechanical revolution (2048 PPR, X2 decoding).
pub const COUNTS_PER_REV: f64 = 4096.0;

/// Output normalisation divisor: controller output of this magnitude maps to 100% duty.
pub const DEG_LIMIT: f64 = 360.0;

/// Absolute duty-cycle ceiling imposed by the motor drivers.
pub const PWM_LIMIT: f64 = 0.8;

/// Default proportional gain.
pub const KP_DEFAULT: f64 = 0.1;
/// Default integral gain.
pub const KI_DEFAULT: f64 = 0.01;
/// Default derivative gain.
pub const KD_DEFAULT: f64 = 0.0;

/// Theta error band [deg] inside which the theta output is suppressed.
pub const DEAD_BAND_DEG: f64 = 3.0;
/// Feed duty applied while theta sits inside the dead-band.
pub const DEAD_BAND_HOLD_DUTY: f64 = 0.5;

/// r-axis duty used for limit seeking and proximity holding.
pub const R_SEEK_DUTY: f64 = 0.5;
/// r-axis proximity hold threshold [counts].
pub const R_HOLD_THRESHOLD_COUNTS: i32 = 2048;

/// Feed conveyor duty for feed modes 1 and 2.
pub const FEED_DUTY: f64 = 0.3;
/// Jam-prevention motor duty, applied every cycle.
pub const JAM_DUTY: f64 = 0.2;

/// Size of the receive buffer for one command datagram [bytes].
pub const RECV_BUFFER_LEN: usize = 64;

/// Default receive port for command datagrams.
pub const RECEIVE_PORT: u16 = 5000;

/// Default local address the command socket binds to.
pub const BIND_ADDR: &str = "192.168.8.215";

/// Wait between the PID step and actuation [ms].
pub const ACTUATION_DELAY_MS: u64 = 10;

/// Smallest admissible control time step [ms].
pub const MIN_DT_MS: u64 = 1;

/// Receive timeout while idle, used only to observe shutdown [ms].
pub const IDLE_POLL_MS: u64 = 100;

/// Receive timeout while an r-axis seek is running [ms].
pub const SEEK_POLL_MS: u64 = 5;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/cu.toml";

const_assert!(PID_AXES <= AXIS_SLOTS);
const_assert!(DRIVE_CHANNELS == 8);
const_assert!(RECV_BUFFER_LEN >= 2 * AXIS_SLOTS);
