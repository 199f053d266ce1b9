//! # Shooter HAL Library
//!
//! Pluggable hardware backends for the shooter control unit. Drivers
//! implement the `HalDriver` trait defined in `shooter_common::hal::driver`.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - HAL driver implementations

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::register_all_drivers;
