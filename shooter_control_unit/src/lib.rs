//! # Shooter Control Unit Library
//!
//! Real-time control core for the shooting conveyor: a rotary theta axis, a
//! linear r axis homed against limit switches, and auxiliary conveyor motors.
//!
//! One cycle runs per received command datagram:
//!
//! 1. **Decode**: comma-separated integers into the 9-slot [`TargetFrame`]
//! 2. **Sample**: encoder pulse counts into angles
//! 3. **PID**: incremental PID per encoder axis, dt from the cycle timer
//! 4. **r axis**: limit-switch seek / proximity hold state machine
//! 5. **Limit**: signed output into {direction, duty ≤ pwm_limit}
//! 6. **Actuate**: one [`ActuationFrame`] handed to the HAL driver
//!
//! All state lives in the [`cycle::CycleRunner`] and is touched only from
//! the control thread.
//!
//! [`TargetFrame`]: shooter_common::control_unit::command::TargetFrame
//! [`ActuationFrame`]: shooter_common::hal::types::ActuationFrame

pub mod command;
pub mod config;
pub mod control;
pub mod cycle;
pub mod error;
pub mod state;
pub mod timer;
pub mod transport;
