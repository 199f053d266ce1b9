//! HAL driver trait and error types.
//!
//! This module defines:
//! - `HalDriver` trait - Interface for pluggable hardware backends
//! - `HalError` enum - Error types for HAL operations
//! - `DriverFactory` type alias - Factory function type

use crate::hal::types::{ActuationFrame, AxisIndex, SwitchBank};
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Encoder index outside the wired range
    #[error("Encoder {0} is not wired")]
    InvalidEncoder(AxisIndex),
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn HalDriver>;

/// Trait defining the interface for HAL drivers.
///
/// The control unit owns exactly one driver and calls it from its single
/// control thread; drivers need not be `Sync`.
///
/// # Lifecycle
///
/// 1. `init()` - Called once before the control loop starts; failure is fatal
/// 2. `read_pulses()` / `read_switches()` / `apply()` - Called every cycle
/// 3. `shutdown()` - Called when the control unit is stopping
///
/// Sensor reads and actuation have no failure mode at this interface.
pub trait HalDriver: Send {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Bring up the hardware (PWM periods, pin modes, counters).
    ///
    /// # Errors
    /// Return `HalError::InitFailed` if initialization cannot complete.
    fn init(&mut self) -> Result<(), HalError>;

    /// Current signed pulse count of encoder `axis` (1..=6).
    ///
    /// Counts accumulate across revolutions until [`HalDriver::reset_pulses`].
    fn read_pulses(&mut self, axis: AxisIndex) -> i32;

    /// Zero the pulse counter of encoder `axis`.
    fn reset_pulses(&mut self, axis: AxisIndex);

    /// Snapshot of the digital switch inputs.
    fn read_switches(&mut self) -> SwitchBank;

    /// Apply a complete actuation frame to the motor drivers.
    fn apply(&mut self, frame: &ActuationFrame);

    /// Stop all outputs and release the hardware.
    fn shutdown(&mut self) -> Result<(), HalError> {
        self.apply(&ActuationFrame::stopped());
        Ok(())
    }
}

impl<T: HalDriver + ?Sized> HalDriver for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn version(&self) -> &'static str {
        (**self).version()
    }

    fn init(&mut self) -> Result<(), HalError> {
        (**self).init()
    }

    fn read_pulses(&mut self, axis: AxisIndex) -> i32 {
        (**self).read_pulses(axis)
    }

    fn reset_pulses(&mut self, axis: AxisIndex) {
        (**self).reset_pulses(axis)
    }

    fn read_switches(&mut self) -> SwitchBank {
        (**self).read_switches()
    }

    fn apply(&mut self, frame: &ActuationFrame) {
        (**self).apply(frame)
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        (**self).shutdown()
    }
}
