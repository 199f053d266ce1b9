//! Shooter Common Library
//!
//! Shared constants, configuration loading and hardware-facing types for the
//! shooter control workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Axis slots, channel counts and firmware defaults
//! - [`config`] - Configuration loading traits and types
//! - [`control_unit`] - Control unit configuration and command types
//! - [`hal`] - HAL driver trait, actuation frame and sensor types
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod control_unit;
pub mod hal;
pub mod prelude;
