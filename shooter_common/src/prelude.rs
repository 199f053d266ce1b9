//! Prelude module for common re-exports.
//!
//! ```rust
//! use shooter_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::control_unit::config::ControlUnitConfig;

// ─── Commands ───────────────────────────────────────────────────────
pub use crate::control_unit::command::{FeedMode, RAxisMode, TargetFrame};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{AXIS_SLOTS, DRIVE_CHANNELS, PID_AXES};

// ─── HAL ────────────────────────────────────────────────────────────
pub use crate::hal::driver::{HalDriver, HalError};
pub use crate::hal::types::{ActuationFrame, AxisIndex, DriveChannel, OutputPair, SwitchBank};
